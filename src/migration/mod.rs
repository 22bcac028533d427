//! Migration subsystem for schemadelta
//!
//! A migration is a versioned schema delta: a set of prerequisite
//! migrations and an ordered list of operations. The full set of known
//! migrations forms the `MigrationHistory`, an explicit value built at
//! startup rather than a process-wide registry.
//!
//! # Design Principles
//!
//! - Closed operation set, interpreted explicitly
//! - History is validated once and immutable afterwards
//! - Deterministic ordering everywhere
//! - Migrations are never edited once deployed

mod errors;
mod graph;
mod operation;
mod types;

pub use errors::{MigrationError, MigrationErrorCode, MigrationResult};
pub use graph::MigrationHistory;
pub use operation::Operation;
pub use types::{Migration, MigrationId};
