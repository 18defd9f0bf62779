//! Sparse field updates for projects, backlogs and works.

use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::model::{require_id, EntityRef, PartialUpdate};
use crate::patch::FieldMask;
use crate::storage::Store;

/// Writes the columns in `mask` and nothing else. An empty mask succeeds without reaching the store.
pub async fn apply_partial_update(store: &dyn Store, target: EntityRef, mask: &FieldMask) -> Result<(), UpdateError> {
    require_id(id_field(target), target.id())?;

    if mask.is_empty() {
        debug!("apply_partial_update({target}): no fields present");
        return Ok(());
    }

    debug!("apply_partial_update({target}): {:?}", mask.columns().collect::<Vec<_>>());
    store.update(target, mask).await.map_err(|source| {
        warn!("apply_partial_update({target}) rejected by store: {source}");
        UpdateError::Rejected { target, source }
    })
}

/// Validates an `Alter*` payload, derives its mask and applies it.
pub async fn update<P: PartialUpdate + ?Sized>(store: &dyn Store, payload: &P) -> Result<(), UpdateError> {
    let mask = payload.field_mask()?;
    apply_partial_update(store, payload.target(), &mask).await
}

fn id_field(target: EntityRef) -> &'static str {
    match target {
        EntityRef::Project(_) => "projectId",
        EntityRef::Backlog(_) => "backlogId",
        EntityRef::Work(_) => "workId",
    }
}
