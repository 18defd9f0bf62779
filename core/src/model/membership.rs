use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{require_id, ProjectId, RoleId, UserId, Validate, WorkId};
use crate::error::ValidationError;

/// Users to add to and remove from one membership relation.
///
/// Neither list is deduplicated here; stores treat both sides as set operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDelta {
    #[serde(default)]
    pub users_added: Vec<UserId>,
    #[serde(default)]
    pub users_removed: Vec<UserId>,
}

impl MembershipDelta {
    pub fn new(users_added: impl IntoIterator<Item = UserId>, users_removed: impl IntoIterator<Item = UserId>) -> Self {
        Self { users_added: users_added.into_iter().collect(), users_removed: users_removed.into_iter().collect() }
    }

    pub fn grant(users: impl IntoIterator<Item = UserId>) -> Self { Self::new(users, []) }

    pub fn revoke(users: impl IntoIterator<Item = UserId>) -> Self { Self::new([], users) }

    pub fn is_empty(&self) -> bool { self.users_added.is_empty() && self.users_removed.is_empty() }

    /// Only adds users. The one shape that makes sense against a relation with no prior members.
    pub fn is_pure_grant(&self) -> bool { !self.users_added.is_empty() && self.users_removed.is_empty() }
}

impl Validate for MembershipDelta {
    fn validate(&self) -> Result<(), ValidationError> {
        for user in self.users_added.iter().chain(&self.users_removed) {
            require_id("userId", *user)?;
        }
        let removed: HashSet<UserId> = self.users_removed.iter().copied().collect();
        if let Some(user) = self.users_added.iter().find(|user| removed.contains(user)) {
            return Err(ValidationError::new("usersAdded", format!("{user} is also listed in usersRemoved")));
        }
        Ok(())
    }
}

/// Identifies one membership relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKey {
    /// Users holding `role` in `project`.
    ProjectRole { project: ProjectId, role: RoleId },
    /// Users assigned to `work`.
    Work { work: WorkId },
}

impl std::fmt::Display for RelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKey::ProjectRole { project, role } => write!(f, "{role} in {project}"),
            RelationKey::Work { work } => write!(f, "assignees of {work}"),
        }
    }
}

/// A role delta before it is bound to a project, as submitted alongside a project creation or
/// alteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDelta {
    pub role_id: RoleId,
    #[serde(flatten)]
    pub delta: MembershipDelta,
}

impl RoleDelta {
    pub fn new(role_id: RoleId, delta: MembershipDelta) -> Self { Self { role_id, delta } }

    pub fn bind(&self, project_id: ProjectId) -> UserRoleChange {
        UserRoleChange { role_id: self.role_id, project_id, delta: self.delta.clone() }
    }
}

impl Validate for RoleDelta {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("roleId", self.role_id)?;
        self.delta.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleChange {
    pub role_id: RoleId,
    pub project_id: ProjectId,
    #[serde(flatten)]
    pub delta: MembershipDelta,
}

impl UserRoleChange {
    pub fn key(&self) -> RelationKey { RelationKey::ProjectRole { project: self.project_id, role: self.role_id } }
}

impl Validate for UserRoleChange {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("projectId", self.project_id)?;
        require_id("roleId", self.role_id)?;
        self.delta.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkChange {
    pub work_id: WorkId,
    #[serde(flatten)]
    pub delta: MembershipDelta,
}

impl UserWorkChange {
    pub fn key(&self) -> RelationKey { RelationKey::Work { work: self.work_id } }
}

impl Validate for UserWorkChange {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("workId", self.work_id)?;
        self.delta.validate()
    }
}
