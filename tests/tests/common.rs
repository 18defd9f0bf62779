#![allow(unused)]

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use steward_core::error::StoreError;
use steward_core::model::{
    ActivityId, Backlog, BacklogId, Credentials, EntityRef, NewBacklog, NewProject, NewWork, PriorityId, Project, ProjectId, RelationKey,
    StateId, TrackerId, UserId, Work, WorkId,
};
use steward_core::{FieldMask, Listing, RawJson, Steward, Store};
use steward_storage_memory::MemoryStore;
use tokio::sync::Semaphore;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Users 1..=9 (`user1` .. `user9`), roles 1..=3 and two rows in each lookup table.
pub fn seeded_store() -> MemoryStore {
    let mut builder = MemoryStore::builder();
    for n in 1..=9 {
        builder = builder.user(format!("user{n}"), format!("secret{n}"));
    }
    builder
        .role("owner")
        .role("maintainer")
        .role("viewer")
        .tracker("feature")
        .tracker("bug")
        .activity("design")
        .activity("development")
        .priority("normal")
        .priority("high")
        .state("new")
        .state("done")
        .build()
}

pub fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_owned(),
        description: Some(format!("{name} description")),
        created_by: UserId(1),
        start_date: Some(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()),
        target_date: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
        pic_id: UserId(2),
    }
}

pub fn new_backlog(project_id: ProjectId) -> NewBacklog {
    NewBacklog {
        project_id,
        name: "Inbound".to_owned(),
        description: None,
        start_date: None,
        target_date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        created_by: UserId(1),
        pic_id: UserId(1),
        priority_id: PriorityId(1),
    }
}

pub fn new_work(backlog_id: BacklogId) -> NewWork {
    NewWork {
        backlog_id,
        name: "Count pallets".to_owned(),
        description: None,
        start_date: None,
        target_date: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        pic_id: Some(UserId(3)),
        current_state: StateId(1),
        created_by: UserId(1),
        priority_id: PriorityId(2),
        estimated_hours: 4.0,
        tracker_id: TrackerId(1),
        activity_id: ActivityId(1),
    }
}

/// Wraps a store, counting the calls that reach it. Reconciliations of `gated` wait for a permit
/// from [`ProbeStore::release`] before they reach the inner store.
pub struct ProbeStore {
    inner: MemoryStore,
    pub updates: AtomicUsize,
    pub reconciles: AtomicUsize,
    pub inserts: AtomicUsize,
    gated: Option<RelationKey>,
    gate: Semaphore,
}

impl ProbeStore {
    pub fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            updates: AtomicUsize::new(0),
            reconciles: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            gated: None,
            gate: Semaphore::new(0),
        })
    }

    pub fn gated(inner: MemoryStore, key: RelationKey) -> Arc<Self> {
        Arc::new(Self {
            inner,
            updates: AtomicUsize::new(0),
            reconciles: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            gated: Some(key),
            gate: Semaphore::new(0),
        })
    }

    pub fn release(&self) { self.gate.add_permits(1) }

    pub fn calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst) + self.reconciles.load(Ordering::SeqCst) + self.inserts.load(Ordering::SeqCst)
    }
}

pub fn steward(store: &Arc<ProbeStore>) -> Steward { Steward::new(store.clone()) }

#[async_trait]
impl Store for ProbeStore {
    async fn lookup_credentials(&self, credentials: &Credentials) -> Result<RawJson, StoreError> { self.inner.lookup_credentials(credentials).await }

    async fn insert_project(&self, project: &NewProject) -> Result<ProjectId, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_project(project).await
    }

    async fn insert_backlog(&self, backlog: &NewBacklog) -> Result<BacklogId, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_backlog(backlog).await
    }

    async fn insert_work(&self, work: &NewWork) -> Result<WorkId, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_work(work).await
    }

    async fn update(&self, target: EntityRef, mask: &FieldMask) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(target, mask).await
    }

    async fn reconcile(&self, key: RelationKey, removed: &[UserId], added: &[UserId]) -> Result<(), StoreError> {
        self.reconciles.fetch_add(1, Ordering::SeqCst);
        if self.gated == Some(key) {
            let permit = self.gate.acquire().await.map_err(StoreError::backend)?;
            permit.forget();
        }
        self.inner.reconcile(key, removed, added).await
    }

    async fn project(&self, id: ProjectId) -> Result<Project, StoreError> { self.inner.project(id).await }

    async fn backlog(&self, id: BacklogId) -> Result<Backlog, StoreError> { self.inner.backlog(id).await }

    async fn work(&self, id: WorkId) -> Result<Work, StoreError> { self.inner.work(id).await }

    async fn members(&self, key: RelationKey) -> Result<BTreeSet<UserId>, StoreError> { self.inner.members(key).await }

    async fn list(&self, listing: Listing) -> Result<RawJson, StoreError> { self.inner.list(listing).await }
}
