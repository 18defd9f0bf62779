//! Single-entity creation.

use tracing::{info, warn};

use crate::error::CreationError;
use crate::model::{BacklogId, EntityKind, NewBacklog, NewProject, NewWork, ProjectId, Validate, WorkId};
use crate::storage::Store;

pub async fn create_project(store: &dyn Store, project: &NewProject) -> Result<ProjectId, CreationError> {
    project.validate().map_err(|err| CreationError::invalid(EntityKind::Project, err))?;
    let id = store.insert_project(project).await.map_err(|source| rejected(EntityKind::Project, source))?;
    info!("created {id} ({})", project.name);
    Ok(id)
}

pub async fn create_backlog(store: &dyn Store, backlog: &NewBacklog) -> Result<BacklogId, CreationError> {
    backlog.validate().map_err(|err| CreationError::invalid(EntityKind::Backlog, err))?;
    let id = store.insert_backlog(backlog).await.map_err(|source| rejected(EntityKind::Backlog, source))?;
    info!("created {id} in {}", backlog.project_id);
    Ok(id)
}

pub async fn create_work(store: &dyn Store, work: &NewWork) -> Result<WorkId, CreationError> {
    work.validate().map_err(|err| CreationError::invalid(EntityKind::Work, err))?;
    let id = store.insert_work(work).await.map_err(|source| rejected(EntityKind::Work, source))?;
    info!("created {id} in {}", work.backlog_id);
    Ok(id)
}

fn rejected(entity: EntityKind, source: crate::error::StoreError) -> CreationError {
    warn!("creating {entity} rejected by store: {source}");
    CreationError::Rejected { entity, source }
}
