//! In-process store for steward
//!
//! Holds every table in memory behind one lock, so each call observes and produces a consistent
//! state. Enforces the same references the Postgres schema does (users, roles and lookup tables,
//! parent project/backlog/work) and reports violations as `StoreError::Constraint`.
//!
//! Passwords are kept and compared in plain text; this store is meant for tests and local runs.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = MemoryStore::builder().user("ayu", "secret").role("owner").priority("normal").build();
//! let steward = Steward::new(Arc::new(store));
//! ```

mod error;
mod memory;

pub use error::MemoryError;
pub use memory::{MemoryStore, MemoryStoreBuilder};
