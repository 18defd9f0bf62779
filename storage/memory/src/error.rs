use steward_core::error::StoreError;
use steward_core::model::EntityKind;
use steward_core::patch::{Column, FieldValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("{entity} has no column {column}")]
    UnknownColumn { entity: EntityKind, column: Column },

    #[error("column {column} cannot hold {value:?}")]
    Mismatch { column: Column, value: FieldValue },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<MemoryError> for StoreError {
    fn from(err: MemoryError) -> Self { StoreError::backend(err) }
}
