//! # Executor Errors
//!
//! Wraps the errors of the layers the executor drives, plus the failure of
//! a single operation inside a migration.

use thiserror::Error;

use crate::migration::{MigrationError, MigrationId};
use crate::recorder::RecorderError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Errors raised while planning or running migrations
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Unknown target, unknown app, or irreversible step
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Ledger refused the change or could not be persisted
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    /// State file could not be written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An operation of `migration` was rejected; nothing of it was kept
    #[error("Migration {migration} failed at operation {index}: {source}")]
    OperationFailed {
        migration: MigrationId,
        index: usize,
        #[source]
        source: SchemaError,
    },
}

impl ExecutorError {
    /// Returns the error code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Migration(e) => e.code().code(),
            ExecutorError::Recorder(e) => e.code(),
            ExecutorError::Storage(e) => e.code().code(),
            ExecutorError::OperationFailed { source, .. } => source.code().code(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            ExecutorError::Migration(e) => e.is_fatal(),
            ExecutorError::Recorder(e) => e.is_fatal(),
            ExecutorError::Storage(e) => e.is_fatal(),
            ExecutorError::OperationFailed { source, .. } => source.is_fatal(),
        }
    }

    /// The schema error behind an operation failure, if that is what this is
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            ExecutorError::OperationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
