//! Project operations that carry role changes.
//!
//! The parent write and each role change are separate store transactions, run strictly in sequence.
//! When a role change fails after the parent was written, the parent stays written and the caller gets
//! a [`PartialCreationError`] describing what committed and what did not.

use tracing::{debug, error, info};

use crate::create::create_project;
use crate::error::{CompositeError, CreationError, PartialCreationError, Step, UpdateError};
use crate::model::{AlterProject, EntityKind, NewProject, PartialUpdate, ProjectId, RoleDelta, Validate};
use crate::reconcile::reconcile_membership;
use crate::storage::Store;
use crate::update::apply_partial_update;

/// Creates the project, then grants the initial roles.
///
/// Only pure grants are applied: a brand-new project has no members to remove, so deltas with removals
/// (or with no additions) are skipped.
pub async fn create_project_with_roles(store: &dyn Store, project: &NewProject, roles: &[RoleDelta]) -> Result<ProjectId, CompositeError> {
    for role in roles {
        role.validate().map_err(|err| CreationError::invalid(EntityKind::Project, err))?;
    }

    let project_id = create_project(store, project).await?;

    let grants: Vec<&RoleDelta> = roles
        .iter()
        .filter(|role| {
            if !role.delta.is_pure_grant() {
                debug!("create_project_with_roles({project_id}): skipping non-grant delta for {}", role.role_id);
            }
            role.delta.is_pure_grant()
        })
        .collect();

    apply_roles(store, project_id, vec![Step::ProjectCreated { project_id }], &grants).await?;
    Ok(project_id)
}

/// Applies the field changes, then every non-empty role delta.
///
/// With no field changes the first role delta is the first write, so its failure (a missing project
/// included) is returned as [`CompositeError::Reconcile`] rather than a partial outcome.
pub async fn update_project_with_roles(store: &dyn Store, alter: &AlterProject, roles: &[RoleDelta]) -> Result<(), CompositeError> {
    let mask = alter.field_mask().map_err(UpdateError::from)?;
    for role in roles {
        role.validate().map_err(UpdateError::from)?;
    }

    // An empty mask never reaches the store, so there is no parent step to report.
    let mut committed = Vec::new();
    if !mask.is_empty() {
        apply_partial_update(store, alter.target(), &mask).await?;
        committed.push(Step::ProjectUpdated { project_id: alter.project_id });
    }

    let changes: Vec<&RoleDelta> = roles.iter().filter(|role| !role.delta.is_empty()).collect();
    apply_roles(store, alter.project_id, committed, &changes).await
}

/// Reconciles `roles` in order after the steps in `committed`. A failure with nothing committed yet is
/// reported as the plain reconcile error; after that it is a partial outcome.
async fn apply_roles(store: &dyn Store, project_id: ProjectId, mut committed: Vec<Step>, roles: &[&RoleDelta]) -> Result<(), CompositeError> {
    for (index, role) in roles.iter().enumerate() {
        let change = role.bind(project_id);
        if let Err(source) = reconcile_membership(store, change.key(), &change.delta).await {
            if committed.is_empty() {
                return Err(CompositeError::Reconcile(source));
            }
            let pending = roles[index + 1..].iter().map(|role| role.role_id).collect();
            error!("{project_id}: {} failed after {:?}: {source}", role.role_id, committed);
            return Err(PartialCreationError { project_id, committed, failed: role.role_id, pending, source }.into());
        }
        committed.push(Step::RoleReconciled { role_id: role.role_id });
    }

    info!("{project_id}: {} step(s) committed", committed.len());
    Ok(())
}
