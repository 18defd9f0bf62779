use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_set, require_id, require_text, BacklogId, EntityRef, PartialUpdate, PriorityId, ProjectId, UserId, Validate};
use crate::error::ValidationError;
use crate::patch::{Column, FieldMask, Patch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backlog {
    pub id: BacklogId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    pub created_by: UserId,
    pub pic_id: UserId,
    pub priority_id: PriorityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBacklog {
    pub project_id: ProjectId,
    #[serde(alias = "backlogName")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: DateTime<Utc>,
    #[serde(alias = "creatorId")]
    pub created_by: UserId,
    pub pic_id: UserId,
    pub priority_id: PriorityId,
}

impl Validate for NewBacklog {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("projectId", self.project_id)?;
        require_text("name", &self.name)?;
        require_id("createdBy", self.created_by)?;
        require_id("picId", self.pic_id)?;
        require_id("priorityId", self.priority_id)
    }
}

/// The owning project is fixed at creation and cannot be altered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterBacklog {
    pub backlog_id: BacklogId,
    #[serde(default, skip_serializing_if = "Patch::is_keep", alias = "backlogName")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub start_date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub target_date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub pic_id: Patch<UserId>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub priority_id: Patch<PriorityId>,
}

impl AlterBacklog {
    pub fn new(backlog_id: BacklogId) -> Self {
        Self {
            backlog_id,
            name: Patch::Keep,
            description: Patch::Keep,
            start_date: Patch::Keep,
            target_date: Patch::Keep,
            pic_id: Patch::Keep,
            priority_id: Patch::Keep,
        }
    }
}

impl Validate for AlterBacklog {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("backlogId", self.backlog_id)?;
        check_set(&self.name, |name| require_text("name", name))?;
        check_set(&self.pic_id, |pic| require_id("picId", *pic))?;
        check_set(&self.priority_id, |priority| require_id("priorityId", *priority))
    }
}

impl PartialUpdate for AlterBacklog {
    fn target(&self) -> EntityRef { EntityRef::Backlog(self.backlog_id) }

    fn field_mask(&self) -> Result<FieldMask, ValidationError> {
        self.validate()?;
        let mut mask = FieldMask::new();
        mask.required(Column::Name, &self.name)?;
        mask.nullable(Column::Description, &self.description);
        mask.required(Column::StartDate, &self.start_date)?;
        mask.required(Column::TargetDate, &self.target_date)?;
        mask.required(Column::PicId, &self.pic_id)?;
        mask.required(Column::PriorityId, &self.priority_id)?;
        Ok(mask)
    }
}
