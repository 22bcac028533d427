//! Migration error types
//!
//! Error codes:
//! - DELTA_DUPLICATE_MIGRATION (FATAL)
//! - DELTA_UNKNOWN_DEPENDENCY (FATAL)
//! - DELTA_SELF_DEPENDENCY (FATAL)
//! - DELTA_CIRCULAR_DEPENDENCY (FATAL)
//! - DELTA_UNKNOWN_MIGRATION (REJECT)
//! - DELTA_UNKNOWN_APP (REJECT)
//! - DELTA_IRREVERSIBLE_OPERATION (REJECT)
//!
//! History errors are authoring errors: the process cannot run any plan
//! against a malformed graph, so they are fatal.

use std::fmt;

use crate::schema::Severity;

use super::types::MigrationId;

/// Migration-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorCode {
    DuplicateMigration,
    UnknownDependency,
    SelfDependency,
    CircularDependency,
    UnknownMigration,
    UnknownApp,
    IrreversibleOperation,
}

impl MigrationErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            MigrationErrorCode::DuplicateMigration => "DELTA_DUPLICATE_MIGRATION",
            MigrationErrorCode::UnknownDependency => "DELTA_UNKNOWN_DEPENDENCY",
            MigrationErrorCode::SelfDependency => "DELTA_SELF_DEPENDENCY",
            MigrationErrorCode::CircularDependency => "DELTA_CIRCULAR_DEPENDENCY",
            MigrationErrorCode::UnknownMigration => "DELTA_UNKNOWN_MIGRATION",
            MigrationErrorCode::UnknownApp => "DELTA_UNKNOWN_APP",
            MigrationErrorCode::IrreversibleOperation => "DELTA_IRREVERSIBLE_OPERATION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            MigrationErrorCode::DuplicateMigration
            | MigrationErrorCode::UnknownDependency
            | MigrationErrorCode::SelfDependency
            | MigrationErrorCode::CircularDependency => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for MigrationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Migration error with the migration it concerns
#[derive(Debug, Clone)]
pub struct MigrationError {
    code: MigrationErrorCode,
    message: String,
    migration: Option<MigrationId>,
}

impl MigrationError {
    pub fn duplicate(id: &MigrationId) -> Self {
        Self {
            code: MigrationErrorCode::DuplicateMigration,
            message: format!("Migration '{}' is declared more than once", id),
            migration: Some(id.clone()),
        }
    }

    pub fn unknown_dependency(id: &MigrationId, dependency: &MigrationId) -> Self {
        Self {
            code: MigrationErrorCode::UnknownDependency,
            message: format!("Migration '{}' depends on unknown '{}'", id, dependency),
            migration: Some(id.clone()),
        }
    }

    pub fn self_dependency(id: &MigrationId) -> Self {
        Self {
            code: MigrationErrorCode::SelfDependency,
            message: format!("Migration '{}' depends on itself", id),
            migration: Some(id.clone()),
        }
    }

    /// `cycle` lists the migrations on the cycle, first repeated at the end.
    pub fn circular(cycle: &[MigrationId]) -> Self {
        let path = cycle
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self {
            code: MigrationErrorCode::CircularDependency,
            message: format!("Circular dependency: {}", path),
            migration: cycle.first().cloned(),
        }
    }

    pub fn unknown_migration(id: &MigrationId) -> Self {
        Self {
            code: MigrationErrorCode::UnknownMigration,
            message: format!("Migration '{}' is not in the history", id),
            migration: Some(id.clone()),
        }
    }

    pub fn unknown_app(app: &str) -> Self {
        Self {
            code: MigrationErrorCode::UnknownApp,
            message: format!("App '{}' has no migrations", app),
            migration: None,
        }
    }

    pub fn irreversible(id: &MigrationId, operation: &str) -> Self {
        Self {
            code: MigrationErrorCode::IrreversibleOperation,
            message: format!("Migration '{}' cannot be unapplied: {}", id, operation),
            migration: Some(id.clone()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> MigrationErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the migration concerned, if any
    pub fn migration(&self) -> Option<&MigrationId> {
        self.migration.as_ref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for MigrationError {}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_errors_are_fatal() {
        let id = MigrationId::new("video", "0001_initial");
        assert!(MigrationError::duplicate(&id).is_fatal());
        assert!(MigrationError::self_dependency(&id).is_fatal());
        assert!(!MigrationError::unknown_migration(&id).is_fatal());
    }

    #[test]
    fn test_circular_message_lists_path() {
        let a = MigrationId::new("video", "a");
        let b = MigrationId::new("video", "b");
        let err = MigrationError::circular(&[a.clone(), b, a]);
        assert!(err.message().contains("video.a -> video.b -> video.a"));
        assert_eq!(err.code().code(), "DELTA_CIRCULAR_DEPENDENCY");
    }
}
