//! Canonical shapes of the domain entities and the payloads that create, alter or relate them.

mod backlog;
mod credentials;
mod ids;
mod membership;
mod project;
mod work;

pub use backlog::{AlterBacklog, Backlog, NewBacklog};
pub use credentials::Credentials;
pub use ids::{ActivityId, BacklogId, PriorityId, ProjectId, RoleId, StateId, TrackerId, UserId, WorkId};
pub use membership::{MembershipDelta, RelationKey, RoleDelta, UserRoleChange, UserWorkChange};
pub use project::{AlterProject, NewProject, Project};
pub use work::{AlterWork, NewWork, Work};

use crate::error::ValidationError;
use crate::patch::{FieldMask, Patch};

/// Structural checks that can be made without asking the store.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// An `Alter*` payload: a target plus a sparse set of field changes.
pub trait PartialUpdate: Validate {
    fn target(&self) -> EntityRef;

    /// The columns this payload writes. Validates as it goes, so a mask is only produced for a valid
    /// payload.
    fn field_mask(&self) -> Result<FieldMask, ValidationError>;
}

/// Which kind of entity a creation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Backlog,
    Work,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Project => "project",
            EntityKind::Backlog => "backlog",
            EntityKind::Work => "work",
        })
    }
}

/// A stored entity, by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Project(ProjectId),
    Backlog(BacklogId),
    Work(WorkId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Project(_) => EntityKind::Project,
            EntityRef::Backlog(_) => EntityKind::Backlog,
            EntityRef::Work(_) => EntityKind::Work,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            EntityRef::Project(id) => id.get(),
            EntityRef::Backlog(id) => id.get(),
            EntityRef::Work(id) => id.get(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{} {}", self.kind(), self.id()) }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

pub(crate) fn require_id(field: &'static str, id: impl Into<i32>) -> Result<(), ValidationError> {
    if id.into() <= 0 {
        return Err(ValidationError::new(field, "must reference an existing record"));
    }
    Ok(())
}

pub(crate) fn require_hours(field: &'static str, hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ValidationError::new(field, "must be a non-negative number"));
    }
    Ok(())
}

/// Runs `check` against the value of a `Set` patch; `Keep` and `Clear` pass through.
pub(crate) fn check_set<T>(patch: &Patch<T>, check: impl FnOnce(&T) -> Result<(), ValidationError>) -> Result<(), ValidationError> {
    match patch.as_set() {
        Some(value) => check(value),
        None => Ok(()),
    }
}
