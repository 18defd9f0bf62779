use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::{
    Backlog, BacklogId, Credentials, EntityRef, NewBacklog, NewProject, NewWork, Project, ProjectId, RelationKey, RoleId, UserId, Work,
    WorkId,
};
use crate::patch::FieldMask;

/// A JSON document produced by the store and relayed to the caller without being re-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson(String);

impl RawJson {
    /// Wraps text the store already produced as JSON.
    pub fn new(json: impl Into<String>) -> Self { RawJson(json.into()) }

    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> { Ok(RawJson(serde_json::to_string(value)?)) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn into_string(self) -> String { self.0 }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> { serde_json::from_str(&self.0) }
}

impl std::fmt::Display for RawJson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// The aggregate read models the store precomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Projects,
    UserRoles(ProjectId),
    Backlogs(ProjectId),
    Works(BacklogId),
    UserTodos(UserId),
    WorkAssignees(WorkId),
    Usernames,
    /// Usernames holding any role in the project, or only `role` when given.
    ProjectAssignees { project: ProjectId, role: Option<RoleId> },
    /// `{trackers, activities, priorities, states}`.
    ReferenceData,
}

impl std::fmt::Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listing::Projects => f.write_str("projects"),
            Listing::UserRoles(project) => write!(f, "user roles of {project}"),
            Listing::Backlogs(project) => write!(f, "backlogs of {project}"),
            Listing::Works(backlog) => write!(f, "works of {backlog}"),
            Listing::UserTodos(user) => write!(f, "todos of {user}"),
            Listing::WorkAssignees(work) => write!(f, "assignees of {work}"),
            Listing::Usernames => f.write_str("usernames"),
            Listing::ProjectAssignees { project, role: Some(role) } => write!(f, "assignees of {project} with {role}"),
            Listing::ProjectAssignees { project, role: None } => write!(f, "assignees of {project}"),
            Listing::ReferenceData => f.write_str("reference data"),
        }
    }
}

/// The persistent store. Authoritative for referential integrity and uniqueness; each call is its own
/// transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Resolves credentials to the store's user document, or `NotFound(Missing::Credentials)`.
    async fn lookup_credentials(&self, credentials: &Credentials) -> Result<RawJson, StoreError>;

    async fn insert_project(&self, project: &NewProject) -> Result<ProjectId, StoreError>;
    async fn insert_backlog(&self, backlog: &NewBacklog) -> Result<BacklogId, StoreError>;
    async fn insert_work(&self, work: &NewWork) -> Result<WorkId, StoreError>;

    /// Writes exactly the columns in `mask`. `NotFound` when `target` does not exist.
    async fn update(&self, target: EntityRef, mask: &FieldMask) -> Result<(), StoreError>;

    /// Removes `removed` then adds `added` for the relation, atomically. `NotFound` when the key does
    /// not resolve to an existing project or work.
    async fn reconcile(&self, key: RelationKey, removed: &[UserId], added: &[UserId]) -> Result<(), StoreError>;

    async fn project(&self, id: ProjectId) -> Result<Project, StoreError>;
    async fn backlog(&self, id: BacklogId) -> Result<Backlog, StoreError>;
    async fn work(&self, id: WorkId) -> Result<Work, StoreError>;

    /// Current members of a relation.
    async fn members(&self, key: RelationKey) -> Result<BTreeSet<UserId>, StoreError>;

    async fn list(&self, listing: Listing) -> Result<RawJson, StoreError>;
}
