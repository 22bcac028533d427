//! CLI-specific error types
//!
//! Every failure reaching the CLI is mapped to one `DELTA_CLI_*` code. The
//! message keeps the inner error, including its own code.

use std::fmt;
use std::io;

use crate::executor::ExecutorError;
use crate::migration::MigrationError;
use crate::recorder::RecorderError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// Bad command argument or stdin payload
    InvalidArgument,
    /// Migration history failed validation
    HistoryError,
    /// State file or ledger unreadable or unwritable
    StateError,
    /// A migrate run halted
    MigrationFailed,
    /// Row rejected or entity unknown
    DataError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DELTA_CLI_CONFIG_ERROR",
            Self::IoError => "DELTA_CLI_IO_ERROR",
            Self::AlreadyInitialized => "DELTA_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "DELTA_CLI_NOT_INITIALIZED",
            Self::InvalidArgument => "DELTA_CLI_INVALID_ARGUMENT",
            Self::HistoryError => "DELTA_CLI_HISTORY_ERROR",
            Self::StateError => "DELTA_CLI_STATE_ERROR",
            Self::MigrationFailed => "DELTA_CLI_MIGRATION_FAILED",
            Self::DataError => "DELTA_CLI_DATA_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'schemadelta init' first.",
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<MigrationError> for CliError {
    fn from(e: MigrationError) -> Self {
        Self::new(CliErrorCode::HistoryError, e.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::new(CliErrorCode::StateError, e.to_string())
    }
}

impl From<RecorderError> for CliError {
    fn from(e: RecorderError) -> Self {
        Self::new(CliErrorCode::StateError, format!("{}: {}", e.code(), e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::DataError, e.to_string())
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        Self::new(CliErrorCode::MigrationFailed, format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
