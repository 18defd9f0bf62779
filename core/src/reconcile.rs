//! Applies membership deltas to a project-role or work-assignment relation.

use tracing::{debug, warn};

use crate::error::{ReconcileError, ValidationError};
use crate::model::{require_id, MembershipDelta, RelationKey, Validate};
use crate::storage::Store;

/// Removes every user in `delta.users_removed`, then adds every user in `delta.users_added`, as one
/// store call. An empty delta succeeds without reaching the store.
pub async fn reconcile_membership(store: &dyn Store, key: RelationKey, delta: &MembershipDelta) -> Result<(), ReconcileError> {
    validate_key(key)?;
    delta.validate()?;

    if delta.is_empty() {
        debug!("reconcile_membership({key}): empty delta");
        return Ok(());
    }

    debug!("reconcile_membership({key}): removing {:?}, adding {:?}", delta.users_removed, delta.users_added);
    store.reconcile(key, &delta.users_removed, &delta.users_added).await.map_err(|source| {
        warn!("reconcile_membership({key}) rejected by store: {source}");
        ReconcileError::Rejected { key, source }
    })
}

fn validate_key(key: RelationKey) -> Result<(), ValidationError> {
    match key {
        RelationKey::ProjectRole { project, role } => {
            require_id("projectId", project)?;
            require_id("roleId", role)
        }
        RelationKey::Work { work } => require_id("workId", work),
    }
}
