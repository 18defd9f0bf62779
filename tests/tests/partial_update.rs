mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use common::*;
use steward_core::error::{Missing, StoreError, UpdateError};
use steward_core::model::{AlterBacklog, AlterProject, AlterWork, EntityRef, PriorityId, ProjectId, StateId, UserId, WorkId};
use steward_core::patch::Patch;
use steward_core::{Classify, ErrorKind, FieldMask, Store};

#[tokio::test]
async fn only_masked_fields_change() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project_id = steward.create_project(&new_project("Gudang")).await?;
    let before = store.project(project_id).await?;

    let mut alter = AlterProject::new(project_id);
    alter.description = Patch::Clear;
    alter.pic_id = Patch::Set(UserId(5));
    steward.update_project(&alter).await?;

    let after = store.project(project_id).await?;
    assert_eq!(after.description, None);
    assert_eq!(after.pic_id, UserId(5));
    assert_eq!(after.name, before.name);
    assert_eq!(after.created_by, before.created_by);
    assert_eq!(after.start_date, before.start_date);
    assert_eq!(after.target_date, before.target_date);
    Ok(())
}

#[tokio::test]
async fn empty_alteration_does_not_reach_the_store() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project_id = steward.create_project(&new_project("Gudang")).await?;
    let before = store.project(project_id).await?;

    steward.update_project(&AlterProject::new(project_id)).await?;
    steward.apply_partial_update(EntityRef::Project(project_id), &FieldMask::new()).await?;

    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    assert_eq!(store.project(project_id).await?, before);
    Ok(())
}

#[tokio::test]
async fn required_fields_cannot_be_cleared() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project_id = steward.create_project(&new_project("Gudang")).await?;
    let backlog_id = steward.create_backlog(&new_backlog(project_id)).await?;

    let mut alter = AlterBacklog::new(backlog_id);
    alter.name = Patch::Set("Renamed".to_owned());
    alter.priority_id = Patch::Clear;
    let err = steward.update_backlog(&alter).await.unwrap_err();

    assert!(matches!(&err, UpdateError::Invalid(invalid) if invalid.field == "priorityId"));
    assert_eq!(err.kind(), ErrorKind::Validation);
    // rejected as a whole: the valid name change was not applied either
    assert_eq!(store.backlog(backlog_id).await?.name, "Inbound");
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn invalid_values_are_rejected_before_the_store() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);

    let mut alter = AlterWork::new(WorkId(1));
    alter.estimated_hours = Patch::Set(-2.0);
    assert_eq!(steward.update_work(&alter).await.unwrap_err().kind(), ErrorKind::Validation);

    let mut alter = AlterProject::new(ProjectId(0));
    alter.name = Patch::Set("x".to_owned());
    assert_eq!(steward.update_project(&alter).await.unwrap_err().kind(), ErrorKind::Validation);

    assert_eq!(store.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn work_pic_can_be_unassigned() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project_id = steward.create_project(&new_project("Gudang")).await?;
    let backlog_id = steward.create_backlog(&new_backlog(project_id)).await?;
    let work_id = steward.create_work(&new_work(backlog_id)).await?;

    let mut alter = AlterWork::new(work_id);
    alter.pic_id = Patch::Clear;
    alter.current_state = Patch::Set(StateId(2));
    alter.estimated_hours = Patch::Set(0.0);
    steward.update_work(&alter).await?;

    let work = store.work(work_id).await?;
    assert_eq!(work.pic_id, None);
    assert_eq!(work.current_state, StateId(2));
    assert_eq!(work.estimated_hours, 0.0);
    assert_eq!(work.priority_id, PriorityId(2));
    Ok(())
}

#[tokio::test]
async fn missing_target_is_not_found() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);

    let mut alter = AlterProject::new(ProjectId(404));
    alter.name = Patch::Set("Ghost".to_owned());
    let err = steward.update_project(&alter).await.unwrap_err();

    assert!(matches!(err, UpdateError::Rejected { source: StoreError::NotFound(Missing::Project(ProjectId(404))), .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.user_message(), "project 404 not found");
    Ok(())
}
