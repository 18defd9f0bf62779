use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_set, require_id, require_text, EntityRef, PartialUpdate, ProjectId, UserId, Validate};
use crate::error::ValidationError;
use crate::patch::{Column, FieldMask, Patch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub start_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    pub pic_id: UserId,
}

/// Payload for creating a project. `projectName` and `creatorId` are accepted for older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(alias = "projectName")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "creatorId")]
    pub created_by: UserId,
    /// Defaults to the moment of creation when omitted.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: DateTime<Utc>,
    pub pic_id: UserId,
}

impl Validate for NewProject {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_id("createdBy", self.created_by)?;
        require_id("picId", self.pic_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterProject {
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Patch::is_keep", alias = "projectName")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub start_date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub target_date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub pic_id: Patch<UserId>,
}

impl AlterProject {
    /// An update that changes nothing yet.
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            name: Patch::Keep,
            description: Patch::Keep,
            start_date: Patch::Keep,
            target_date: Patch::Keep,
            pic_id: Patch::Keep,
        }
    }
}

impl Validate for AlterProject {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("projectId", self.project_id)?;
        check_set(&self.name, |name| require_text("name", name))?;
        check_set(&self.pic_id, |pic| require_id("picId", *pic))
    }
}

impl PartialUpdate for AlterProject {
    fn target(&self) -> EntityRef { EntityRef::Project(self.project_id) }

    fn field_mask(&self) -> Result<FieldMask, ValidationError> {
        self.validate()?;
        let mut mask = FieldMask::new();
        mask.required(Column::Name, &self.name)?;
        mask.nullable(Column::Description, &self.description);
        mask.required(Column::StartDate, &self.start_date)?;
        mask.required(Column::TargetDate, &self.target_date)?;
        mask.required(Column::PicId, &self.pic_id)?;
        Ok(mask)
    }
}
