//! # Recorder Errors
//!
//! Error types for the applied-migration ledger.

use std::io;

use thiserror::Error;

use crate::migration::MigrationId;

/// Result type for ledger operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Ledger errors
#[derive(Debug, Error)]
pub enum RecorderError {
    // ==================
    // Persistence Errors
    // ==================

    /// Ledger file could not be read
    #[error("Failed to read ledger {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Ledger file could not be written
    #[error("Failed to write ledger {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Ledger file exists but does not decode
    #[error("Malformed ledger {path}: {reason}")]
    Malformed { path: String, reason: String },

    // ==================
    // Consistency Errors
    // ==================

    /// A migration would be (or is) recorded before one of its dependencies
    #[error("Migration {migration} is applied before its dependency {dependency}")]
    InconsistentHistory {
        migration: MigrationId,
        dependency: MigrationId,
    },

    /// A migration cannot be unrecorded while a dependent is still applied
    #[error("Cannot unapply {migration}: applied migration {dependent} depends on it")]
    DependentApplied {
        migration: MigrationId,
        dependent: MigrationId,
    },

    /// The ledger names a migration the history does not know
    #[error("Ledger records unknown migration {0}")]
    UnknownApplied(MigrationId),
}

impl RecorderError {
    /// Returns the error code
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::Read { .. } => "DELTA_LEDGER_READ_FAILED",
            RecorderError::Write { .. } => "DELTA_LEDGER_WRITE_FAILED",
            RecorderError::Malformed { .. } => "DELTA_LEDGER_MALFORMED",
            RecorderError::InconsistentHistory { .. } => "DELTA_INCONSISTENT_HISTORY",
            RecorderError::DependentApplied { .. } => "DELTA_DEPENDENT_APPLIED",
            RecorderError::UnknownApplied(_) => "DELTA_UNKNOWN_APPLIED",
        }
    }

    /// Whether the ledger on disk can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecorderError::Malformed { .. }
                | RecorderError::InconsistentHistory { .. }
                | RecorderError::UnknownApplied(_)
        )
    }
}
