//! Error types.
//!
//! Every error that leaves the crate can be classified with [`Classify`]: a machine-distinguishable
//! [`ErrorKind`] plus a single human-readable message. Store-internal detail (driver messages,
//! constraint names) stays in the `Debug`/`Display` chain for operators and is never part of
//! [`Classify::user_message`].

use serde::Serialize;
use thiserror::Error;

use crate::model::{BacklogId, EntityKind, EntityRef, ProjectId, RelationKey, RoleId, WorkId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Constraint,
    PartialCreation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Constraint => "constraint",
            ErrorKind::PartialCreation => "partial_creation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;
    fn user_message(&self) -> String;
}

/// Malformed or missing input, detected before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self { Self { field: field.into(), reason: reason.into() } }
}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind { ErrorKind::Validation }

    fn user_message(&self) -> String { self.to_string() }
}

/// What a store could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Missing {
    Project(ProjectId),
    Backlog(BacklogId),
    Work(WorkId),
    Credentials,
}

impl From<EntityRef> for Missing {
    fn from(entity: EntityRef) -> Self {
        match entity {
            EntityRef::Project(id) => Missing::Project(id),
            EntityRef::Backlog(id) => Missing::Backlog(id),
            EntityRef::Work(id) => Missing::Work(id),
        }
    }
}

impl From<RelationKey> for Missing {
    fn from(key: RelationKey) -> Self {
        match key {
            RelationKey::ProjectRole { project, .. } => Missing::Project(project),
            RelationKey::Work { work } => Missing::Work(work),
        }
    }
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Project(id) => write!(f, "{id}"),
            Missing::Backlog(id) => write!(f, "{id}"),
            Missing::Work(id) => write!(f, "{id}"),
            Missing::Credentials => f.write_str("user with these credentials"),
        }
    }
}

/// Returned by [`Store`](crate::storage::Store) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Missing),

    /// Referential or uniqueness violation reported by the store.
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self { StoreError::Backend(Box::new(err)) }

    fn error_kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Constraint(_) => ErrorKind::Constraint,
            StoreError::Backend(_) => ErrorKind::Internal,
        }
    }

    /// `subject` names what was being written, for the constraint and backend cases.
    fn describe(&self, subject: impl std::fmt::Display) -> String {
        match self {
            StoreError::NotFound(missing) => format!("{missing} not found"),
            StoreError::Constraint(_) => format!("{subject} references a record that does not exist or conflicts with existing data"),
            StoreError::Backend(_) => format!("{subject} could not be completed, try again later"),
        }
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind { self.error_kind() }

    fn user_message(&self) -> String { self.describe("the request") }
}

/// Failure of a read-only operation: credential lookup or a listing.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for QueryError {
    fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Invalid(_) => ErrorKind::Validation,
            QueryError::Store(err) => err.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            QueryError::Invalid(err) => err.user_message(),
            QueryError::Store(err) => err.user_message(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid membership change: {0}")]
    Invalid(#[from] ValidationError),

    #[error("membership ({key}) was not reconciled: {source}")]
    Rejected {
        key: RelationKey,
        #[source]
        source: StoreError,
    },
}

impl Classify for ReconcileError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Invalid(_) => ErrorKind::Validation,
            ReconcileError::Rejected { source, .. } => source.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            ReconcileError::Invalid(err) => err.user_message(),
            ReconcileError::Rejected { key, source } => source.describe(format_args!("membership change for {key}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("invalid update: {0}")]
    Invalid(#[from] ValidationError),

    #[error("update of {target} was rejected: {source}")]
    Rejected {
        target: EntityRef,
        #[source]
        source: StoreError,
    },
}

impl Classify for UpdateError {
    fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::Invalid(_) => ErrorKind::Validation,
            UpdateError::Rejected { source, .. } => source.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            UpdateError::Invalid(err) => err.user_message(),
            UpdateError::Rejected { target, source } => source.describe(format_args!("update of {target}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum CreationError {
    #[error("invalid {entity}: {source}")]
    Invalid {
        entity: EntityKind,
        #[source]
        source: ValidationError,
    },

    #[error("creating {entity} was rejected: {source}")]
    Rejected {
        entity: EntityKind,
        #[source]
        source: StoreError,
    },
}

impl CreationError {
    pub fn invalid(entity: EntityKind, source: ValidationError) -> Self { CreationError::Invalid { entity, source } }
}

impl Classify for CreationError {
    fn kind(&self) -> ErrorKind {
        match self {
            CreationError::Invalid { .. } => ErrorKind::Validation,
            CreationError::Rejected { source, .. } => source.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            CreationError::Invalid { source, .. } => source.user_message(),
            CreationError::Rejected { entity, source } => source.describe(format_args!("new {entity}")),
        }
    }
}

/// A step of a composite operation that reached the store and was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "step", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    ProjectCreated { project_id: ProjectId },
    ProjectUpdated { project_id: ProjectId },
    RoleReconciled { role_id: RoleId },
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::ProjectCreated { project_id } => write!(f, "created {project_id}"),
            Step::ProjectUpdated { project_id } => write!(f, "updated {project_id}"),
            Step::RoleReconciled { role_id } => write!(f, "applied {role_id}"),
        }
    }
}

/// The parent project was written but a dependent role change failed. Nothing is rolled back: the
/// steps in `committed` stay in effect and `pending` were never attempted.
#[derive(Debug, Error)]
#[error("{project_id} was persisted but {failed} could not be applied: {source}")]
pub struct PartialCreationError {
    pub project_id: ProjectId,
    pub committed: Vec<Step>,
    pub failed: RoleId,
    pub pending: Vec<RoleId>,
    #[source]
    pub source: ReconcileError,
}

impl Classify for PartialCreationError {
    fn kind(&self) -> ErrorKind { ErrorKind::PartialCreation }

    fn user_message(&self) -> String {
        let parent = match self.committed.first() {
            Some(Step::ProjectCreated { .. }) => "created",
            _ => "updated",
        };
        format!("{} was {parent} but {} could not be applied: {}", self.project_id, self.failed, self.source.user_message())
    }
}

/// Outcome of a project creation or alteration that carries role changes.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error(transparent)]
    Creation(#[from] CreationError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    /// The first role change of an alteration without field changes failed; nothing was written.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Partial(#[from] PartialCreationError),
}

impl CompositeError {
    pub fn partial(&self) -> Option<&PartialCreationError> {
        match self {
            CompositeError::Partial(partial) => Some(partial),
            _ => None,
        }
    }
}

impl Classify for CompositeError {
    fn kind(&self) -> ErrorKind {
        match self {
            CompositeError::Creation(err) => err.kind(),
            CompositeError::Update(err) => err.kind(),
            CompositeError::Reconcile(err) => err.kind(),
            CompositeError::Partial(err) => err.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            CompositeError::Creation(err) => err.user_message(),
            CompositeError::Update(err) => err.user_message(),
            CompositeError::Reconcile(err) => err.user_message(),
            CompositeError::Partial(err) => err.user_message(),
        }
    }
}
