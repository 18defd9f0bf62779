//! Sparse updates.
//!
//! A [`Patch`] is the per-field instruction carried by `Alter*` payloads. It keeps three states apart
//! that a bare `Option` would collapse: the field was not mentioned, the field was explicitly set to
//! `null`, or the field was given a value. A [`FieldMask`] is the flattened form handed to the store:
//! only mentioned fields appear in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::model::{ActivityId, PriorityId, StateId, TrackerId, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Absent from the payload: the stored value is left alone.
    Keep,
    /// Present as `null`: the stored value is cleared.
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self { Patch::Keep }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool { matches!(self, Patch::Keep) }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Resolves the patch against the currently stored value.
    pub fn apply_to(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self { Patch::Set(value) }
}

// Absence is handled by `#[serde(default)]` on the containing struct, so by the time we get here the
// key was present and `null` means Clear.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

// Callers pair this with `skip_serializing_if = "Patch::is_keep"`.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}

/// An updatable attribute of Project, Backlog or Work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Description,
    StartDate,
    TargetDate,
    PicId,
    PriorityId,
    CurrentState,
    EstimatedHours,
    TrackerId,
    ActivityId,
}

impl Column {
    /// Column name in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Description => "description",
            Column::StartDate => "start_date",
            Column::TargetDate => "target_date",
            Column::PicId => "pic_id",
            Column::PriorityId => "priority_id",
            Column::CurrentState => "current_state",
            Column::EstimatedHours => "estimated_hours",
            Column::TrackerId => "tracker_id",
            Column::ActivityId => "activity_id",
        }
    }

    /// Attribute name as it appears in request payloads.
    pub fn field(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Description => "description",
            Column::StartDate => "startDate",
            Column::TargetDate => "targetDate",
            Column::PicId => "picId",
            Column::PriorityId => "priorityId",
            Column::CurrentState => "currentState",
            Column::EstimatedHours => "estimatedHours",
            Column::TrackerId => "trackerId",
            Column::ActivityId => "activityId",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Int(i32),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool { matches!(self, FieldValue::Null) }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self { FieldValue::Text(value) }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self { FieldValue::Float(value) }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self { FieldValue::Timestamp(value) }
}

macro_rules! int_field_value {
    ($($id:ty),*) => {
        $(impl From<$id> for FieldValue {
            fn from(value: $id) -> Self { FieldValue::Int(value.0) }
        })*
    };
}

int_field_value!(UserId, PriorityId, StateId, TrackerId, ActivityId);

/// The columns to write, in the order they were recorded. A column appears at most once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMask {
    entries: Vec<(Column, FieldValue)>,
}

impl FieldMask {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn iter(&self) -> impl Iterator<Item = &(Column, FieldValue)> { self.entries.iter() }

    pub fn get(&self, column: Column) -> Option<&FieldValue> {
        self.entries.iter().find(|(c, _)| *c == column).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ { self.entries.iter().map(|(column, _)| *column) }

    /// Records a patch for a column that may hold null.
    pub fn nullable<T: Clone + Into<FieldValue>>(&mut self, column: Column, patch: &Patch<T>) {
        match patch {
            Patch::Keep => {}
            Patch::Clear => self.insert(column, FieldValue::Null),
            Patch::Set(value) => self.insert(column, value.clone().into()),
        }
    }

    /// Records a patch for a column that must always hold a value.
    pub fn required<T: Clone + Into<FieldValue>>(&mut self, column: Column, patch: &Patch<T>) -> Result<(), ValidationError> {
        match patch {
            Patch::Keep => Ok(()),
            Patch::Clear => Err(ValidationError::new(column.field(), "cannot be cleared")),
            Patch::Set(value) => {
                self.insert(column, value.clone().into());
                Ok(())
            }
        }
    }

    fn insert(&mut self, column: Column, value: FieldValue) {
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }
}

impl<'a> IntoIterator for &'a FieldMask {
    type Item = &'a (Column, FieldValue);
    type IntoIter = std::slice::Iter<'a, (Column, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}
