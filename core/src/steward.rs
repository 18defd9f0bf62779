use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CompositeError, CreationError, QueryError, ReconcileError, UpdateError, ValidationError};
use crate::model::{
    require_id, AlterBacklog, AlterProject, AlterWork, BacklogId, Credentials, EntityRef, MembershipDelta, NewBacklog, NewProject,
    NewWork, ProjectId, RelationKey, RoleDelta, RoleId, UserId, UserRoleChange, UserWorkChange, Validate, WorkId,
};
use crate::patch::FieldMask;
use crate::storage::{Listing, RawJson, Store};
use crate::{create, orchestrator, reconcile, update};

/// Entry point for every operation. Holds the one store handle created at startup; cloning is cheap
/// and clones share the handle.
///
/// Requests are independent: nothing here locks or orders work across calls, and each call runs its
/// steps to completion in sequence.
#[derive(Clone)]
pub struct Steward {
    store: Arc<dyn Store>,
}

impl Steward {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub fn store(&self) -> &Arc<dyn Store> { &self.store }

    pub async fn login(&self, credentials: &Credentials) -> Result<RawJson, QueryError> {
        credentials.validate()?;
        info!("login attempt for user: {}", credentials.user_name);
        Ok(self.store.lookup_credentials(credentials).await?)
    }

    // Projects

    pub async fn create_project(&self, project: &NewProject) -> Result<ProjectId, CreationError> {
        create::create_project(self.store.as_ref(), project).await
    }

    pub async fn create_project_with_roles(&self, project: &NewProject, roles: &[RoleDelta]) -> Result<ProjectId, CompositeError> {
        orchestrator::create_project_with_roles(self.store.as_ref(), project, roles).await
    }

    pub async fn list_projects(&self) -> Result<RawJson, QueryError> { self.list(Listing::Projects).await }

    pub async fn update_project(&self, alter: &AlterProject) -> Result<(), UpdateError> { update::update(self.store.as_ref(), alter).await }

    pub async fn update_project_with_roles(&self, alter: &AlterProject, roles: &[RoleDelta]) -> Result<(), CompositeError> {
        orchestrator::update_project_with_roles(self.store.as_ref(), alter, roles).await
    }

    pub async fn list_user_roles(&self, project_id: ProjectId) -> Result<RawJson, QueryError> { self.list(Listing::UserRoles(project_id)).await }

    pub async fn set_user_role(&self, change: &UserRoleChange) -> Result<(), ReconcileError> {
        change.validate()?;
        self.reconcile_membership(change.key(), &change.delta).await
    }

    pub async fn list_project_assignees(&self, project_id: ProjectId, role_id: Option<RoleId>) -> Result<RawJson, QueryError> {
        self.list(Listing::ProjectAssignees { project: project_id, role: role_id }).await
    }

    // Backlogs

    pub async fn list_backlogs(&self, project_id: ProjectId) -> Result<RawJson, QueryError> { self.list(Listing::Backlogs(project_id)).await }

    pub async fn create_backlog(&self, backlog: &NewBacklog) -> Result<BacklogId, CreationError> {
        create::create_backlog(self.store.as_ref(), backlog).await
    }

    pub async fn update_backlog(&self, alter: &AlterBacklog) -> Result<(), UpdateError> { update::update(self.store.as_ref(), alter).await }

    // Works

    pub async fn create_work(&self, work: &NewWork) -> Result<WorkId, CreationError> { create::create_work(self.store.as_ref(), work).await }

    pub async fn list_works(&self, backlog_id: BacklogId) -> Result<RawJson, QueryError> { self.list(Listing::Works(backlog_id)).await }

    pub async fn update_work(&self, alter: &AlterWork) -> Result<(), UpdateError> { update::update(self.store.as_ref(), alter).await }

    pub async fn list_user_todos(&self, user_id: UserId) -> Result<RawJson, QueryError> { self.list(Listing::UserTodos(user_id)).await }

    pub async fn list_work_assignees(&self, work_id: WorkId) -> Result<RawJson, QueryError> { self.list(Listing::WorkAssignees(work_id)).await }

    pub async fn set_work_assignment(&self, change: &UserWorkChange) -> Result<(), ReconcileError> {
        change.validate()?;
        self.reconcile_membership(change.key(), &change.delta).await
    }

    // Users and reference data

    pub async fn list_usernames(&self) -> Result<RawJson, QueryError> { self.list(Listing::Usernames).await }

    pub async fn list_reference_data(&self) -> Result<RawJson, QueryError> { self.list(Listing::ReferenceData).await }

    // Engines

    pub async fn reconcile_membership(&self, key: RelationKey, delta: &MembershipDelta) -> Result<(), ReconcileError> {
        reconcile::reconcile_membership(self.store.as_ref(), key, delta).await
    }

    pub async fn apply_partial_update(&self, target: EntityRef, mask: &FieldMask) -> Result<(), UpdateError> {
        update::apply_partial_update(self.store.as_ref(), target, mask).await
    }

    async fn list(&self, listing: Listing) -> Result<RawJson, QueryError> {
        validate_listing(listing)?;
        debug!("Steward.list({listing})");
        Ok(self.store.list(listing).await?)
    }
}

fn validate_listing(listing: Listing) -> Result<(), ValidationError> {
    match listing {
        Listing::Projects | Listing::Usernames | Listing::ReferenceData => Ok(()),
        Listing::UserRoles(project) | Listing::Backlogs(project) => require_id("projectId", project),
        Listing::Works(backlog) => require_id("backlogId", backlog),
        Listing::UserTodos(user) => require_id("userId", user),
        Listing::WorkAssignees(work) => require_id("workId", work),
        Listing::ProjectAssignees { project, role } => {
            require_id("projectId", project)?;
            match role {
                Some(role) => require_id("roleId", role),
                None => Ok(()),
            }
        }
    }
}
