mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use anyhow::Result;
use common::*;
use steward_core::error::{Missing, ReconcileError, StoreError};
use steward_core::model::{MembershipDelta, ProjectId, RelationKey, RoleId, UserId, UserRoleChange, UserWorkChange, WorkId};
use steward_core::{Classify, ErrorKind, Store};

fn users(ids: &[i32]) -> Vec<UserId> { ids.iter().copied().map(UserId).collect() }

fn set(ids: &[i32]) -> BTreeSet<UserId> { users(ids).into_iter().collect() }

#[tokio::test]
async fn result_is_current_minus_removed_plus_added() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let key = RelationKey::ProjectRole { project, role: RoleId(2) };

    steward.reconcile_membership(key, &MembershipDelta::grant(users(&[1, 2, 3]))).await?;
    assert_eq!(store.members(key).await?, set(&[1, 2, 3]));

    steward.reconcile_membership(key, &MembershipDelta::new(users(&[4, 5]), users(&[2]))).await?;
    assert_eq!(store.members(key).await?, set(&[1, 3, 4, 5]));

    // the other roles of the project are untouched
    assert!(store.members(RelationKey::ProjectRole { project, role: RoleId(1) }).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn replaying_a_delta_changes_nothing() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let change = UserRoleChange { role_id: RoleId(1), project_id: project, delta: MembershipDelta::new(users(&[6, 7]), users(&[8])) };

    steward.set_user_role(&change).await?;
    steward.set_user_role(&change).await?;

    assert_eq!(store.members(change.key()).await?, set(&[6, 7]));
    Ok(())
}

#[tokio::test]
async fn empty_delta_does_not_reach_the_store() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);

    // the key is never resolved, so even a missing project succeeds
    steward.reconcile_membership(RelationKey::ProjectRole { project: ProjectId(77), role: RoleId(1) }, &MembershipDelta::default()).await?;
    steward.set_work_assignment(&UserWorkChange { work_id: WorkId(77), delta: MembershipDelta::default() }).await?;

    assert_eq!(store.reconciles.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn overlapping_delta_is_rejected_up_front() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let key = RelationKey::ProjectRole { project, role: RoleId(1) };
    steward.reconcile_membership(key, &MembershipDelta::grant(users(&[3]))).await?;

    let err = steward.reconcile_membership(key, &MembershipDelta::new(users(&[3, 4]), users(&[3]))).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Invalid(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.reconciles.load(Ordering::SeqCst), 1);
    assert_eq!(store.members(key).await?, set(&[3]));
    Ok(())
}

#[tokio::test]
async fn removing_a_non_member_and_duplicate_grants_are_harmless() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let key = RelationKey::ProjectRole { project, role: RoleId(3) };

    steward.reconcile_membership(key, &MembershipDelta::new(users(&[2, 2, 9]), users(&[5]))).await?;
    assert_eq!(store.members(key).await?, set(&[2, 9]));

    steward.reconcile_membership(key, &MembershipDelta::revoke(users(&[1, 9, 9]))).await?;
    assert_eq!(store.members(key).await?, set(&[2]));
    Ok(())
}

#[tokio::test]
async fn work_assignments_follow_the_same_rules() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let backlog = steward.create_backlog(&new_backlog(project)).await?;
    let work = steward.create_work(&new_work(backlog)).await?;

    let change = UserWorkChange { work_id: work, delta: MembershipDelta::grant(users(&[4, 5])) };
    steward.set_work_assignment(&change).await?;
    let change = UserWorkChange { work_id: work, delta: MembershipDelta::new(users(&[6]), users(&[4])) };
    steward.set_work_assignment(&change).await?;

    assert_eq!(store.members(change.key()).await?, set(&[5, 6]));
    let assignees = steward.list_work_assignees(work).await?.to_value()?;
    assert_eq!(assignees.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn missing_parent_is_not_found() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);

    let err = steward.set_work_assignment(&UserWorkChange { work_id: WorkId(31), delta: MembershipDelta::grant(users(&[1])) }).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Rejected { source: StoreError::NotFound(Missing::Work(WorkId(31))), .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.user_message(), "work 31 not found");
    Ok(())
}

#[tokio::test]
async fn unknown_user_is_a_constraint_violation() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let key = RelationKey::ProjectRole { project, role: RoleId(1) };
    steward.reconcile_membership(key, &MembershipDelta::grant(users(&[1]))).await?;

    let err = steward.reconcile_membership(key, &MembershipDelta::new(users(&[42]), users(&[1]))).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Constraint);
    // the removal in the same delta was not applied
    assert_eq!(store.members(key).await?, set(&[1]));
    Ok(())
}
