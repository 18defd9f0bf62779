use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check_set, require_hours, require_id, require_text, ActivityId, BacklogId, EntityRef, PartialUpdate, PriorityId, StateId,
    TrackerId, UserId, Validate, WorkId,
};
use crate::error::ValidationError;
use crate::patch::{Column, FieldMask, Patch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: WorkId,
    pub backlog_id: BacklogId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    /// Work items may be unassigned.
    pub pic_id: Option<UserId>,
    pub current_state: StateId,
    pub created_by: UserId,
    pub priority_id: PriorityId,
    pub estimated_hours: f64,
    pub tracker_id: TrackerId,
    pub activity_id: ActivityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWork {
    pub backlog_id: BacklogId,
    #[serde(alias = "workName")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: DateTime<Utc>,
    #[serde(default)]
    pub pic_id: Option<UserId>,
    pub current_state: StateId,
    #[serde(alias = "creatorId")]
    pub created_by: UserId,
    pub priority_id: PriorityId,
    pub estimated_hours: f64,
    pub tracker_id: TrackerId,
    pub activity_id: ActivityId,
}

impl Validate for NewWork {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("backlogId", self.backlog_id)?;
        require_text("name", &self.name)?;
        if let Some(pic) = self.pic_id {
            require_id("picId", pic)?;
        }
        require_id("currentState", self.current_state)?;
        require_id("createdBy", self.created_by)?;
        require_id("priorityId", self.priority_id)?;
        require_hours("estimatedHours", self.estimated_hours)?;
        require_id("trackerId", self.tracker_id)?;
        require_id("activityId", self.activity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterWork {
    pub work_id: WorkId,
    #[serde(default, skip_serializing_if = "Patch::is_keep", alias = "workName")]
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
    pub current_state: Patch<StateId>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub priority_id: Patch<PriorityId>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub estimated_hours: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub tracker_id: Patch<TrackerId>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub activity_id: Patch<ActivityId>,
}

impl AlterWork {
    pub fn new(work_id: WorkId) -> Self {
        Self {
            work_id,
            name: Patch::Keep,
            description: Patch::Keep,
            start_date: Patch::Keep,
            target_date: Patch::Keep,
            pic_id: Patch::Keep,
            current_state: Patch::Keep,
            priority_id: Patch::Keep,
            estimated_hours: Patch::Keep,
            tracker_id: Patch::Keep,
            activity_id: Patch::Keep,
        }
    }
}

impl Validate for AlterWork {
    fn validate(&self) -> Result<(), ValidationError> {
        require_id("workId", self.work_id)?;
        check_set(&self.name, |name| require_text("name", name))?;
        check_set(&self.pic_id, |pic| require_id("picId", *pic))?;
        check_set(&self.current_state, |state| require_id("currentState", *state))?;
        check_set(&self.priority_id, |priority| require_id("priorityId", *priority))?;
        check_set(&self.estimated_hours, |hours| require_hours("estimatedHours", *hours))?;
        check_set(&self.tracker_id, |tracker| require_id("trackerId", *tracker))?;
        check_set(&self.activity_id, |activity| require_id("activityId", *activity))
    }
}

impl PartialUpdate for AlterWork {
    fn target(&self) -> EntityRef { EntityRef::Work(self.work_id) }

    fn field_mask(&self) -> Result<FieldMask, ValidationError> {
        self.validate()?;
        let mut mask = FieldMask::new();
        mask.required(Column::Name, &self.name)?;
        mask.nullable(Column::Description, &self.description);
        mask.required(Column::StartDate, &self.start_date)?;
        mask.required(Column::TargetDate, &self.target_date)?;
        mask.nullable(Column::PicId, &self.pic_id);
        mask.required(Column::CurrentState, &self.current_state)?;
        mask.required(Column::PriorityId, &self.priority_id)?;
        mask.required(Column::EstimatedHours, &self.estimated_hours)?;
        mask.required(Column::TrackerId, &self.tracker_id)?;
        mask.required(Column::ActivityId, &self.activity_id)?;
        Ok(mask)
    }
}
