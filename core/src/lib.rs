pub mod create;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod patch;
#[cfg(feature = "postgres")]
mod postgres;
pub mod reconcile;
pub mod steward;
pub mod storage;
pub mod update;

pub use error::{Classify, ErrorKind};
pub use patch::{FieldMask, Patch};
pub use steward::Steward;
pub use storage::{Listing, RawJson, Store};
