mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use common::*;
use steward_core::model::{AlterProject, MembershipDelta, ProjectId, RelationKey, RoleId, UserId};
use steward_core::patch::Patch;
use steward_core::{Steward, Store};
use tokio::time::timeout;

const PATIENCE: Duration = Duration::from_secs(2);

// The memory store numbers the first project 1.
const STALLED: RelationKey = RelationKey::ProjectRole { project: ProjectId(1), role: RoleId(1) };

fn stalled_request(steward: &Steward) -> tokio::task::JoinHandle<Result<(), steward_core::error::ReconcileError>> {
    let steward = steward.clone();
    tokio::spawn(async move { steward.reconcile_membership(STALLED, &MembershipDelta::grant([UserId(2)])).await })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_relation_does_not_block_other_requests() -> Result<()> {
    let store = ProbeStore::gated(seeded_store(), STALLED);
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    assert_eq!(project, ProjectId(1));

    let stalled = stalled_request(&steward);
    while store.reconciles.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let other = RelationKey::ProjectRole { project, role: RoleId(2) };
    timeout(PATIENCE, steward.reconcile_membership(other, &MembershipDelta::grant([UserId(3)]))).await??;

    let mut alter = AlterProject::new(project);
    alter.name = Patch::Set("Gudang Barat".to_owned());
    timeout(PATIENCE, steward.update_project(&alter)).await??;
    timeout(PATIENCE, steward.list_user_roles(project)).await??;

    assert!(!stalled.is_finished());
    assert!(store.members(STALLED).await?.is_empty());

    store.release();
    timeout(PATIENCE, stalled).await???;
    assert_eq!(store.members(STALLED).await?.into_iter().collect::<Vec<_>>(), vec![UserId(2)]);
    assert_eq!(store.members(other).await?.into_iter().collect::<Vec<_>>(), vec![UserId(3)]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_on_one_relation_all_land() -> Result<()> {
    let store = ProbeStore::new(seeded_store());
    let steward = steward(&store);
    let project = steward.create_project(&new_project("Gudang")).await?;
    let key = RelationKey::ProjectRole { project, role: RoleId(3) };

    let tasks: Vec<_> = (1..=9)
        .map(|user| {
            let steward = steward.clone();
            tokio::spawn(async move { steward.reconcile_membership(key, &MembershipDelta::grant([UserId(user)])).await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    assert_eq!(store.members(key).await?.len(), 9);
    Ok(())
}
