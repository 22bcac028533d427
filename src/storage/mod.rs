//! Row storage subsystem for schemadelta
//!
//! Holds the catalog and every entity's rows, and persists them as one
//! checksummed state file.
//!
//! # Design Principles
//!
//! - Whole-state replacement via temp file and rename
//! - Checksum-verified on every load
//! - Corruption halts the process
//! - Structural changes validate before they mutate

mod checksum;
mod database;
mod errors;
mod store;

pub use database::{Database, Row};
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use store::StateStore;
