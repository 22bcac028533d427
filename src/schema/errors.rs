//! Schema error types
//!
//! Error codes:
//! - DELTA_SCHEMA_MISMATCH (REJECT)
//! - DELTA_ENTITY_EXISTS (REJECT)
//! - DELTA_FIELD_EXISTS (REJECT)
//! - DELTA_FIELD_MISSING (REJECT)
//! - DELTA_FIELD_DEFAULT_REQUIRED (REJECT)
//! - DELTA_INVALID_VALUE (REJECT)
//! - DELTA_INVALID_DEFINITION (REJECT)
//! - DELTA_IRREVERSIBLE_OPERATION (REJECT)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation or write is rejected, nothing is changed
    Reject,
    /// The process must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Target entity does not exist in the live schema
    SchemaMismatch,
    /// Entity is already defined
    EntityExists,
    /// Field is already defined on the entity
    FieldExists,
    /// Field is not defined on the entity
    FieldMissing,
    /// Non-nullable field added to populated table without a default
    FieldDefaultRequired,
    /// Stored or inserted value does not match the field definition
    InvalidValue,
    /// Field or entity definition is malformed
    InvalidDefinition,
    /// Operation has no inverse
    IrreversibleOperation,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::SchemaMismatch => "DELTA_SCHEMA_MISMATCH",
            SchemaErrorCode::EntityExists => "DELTA_ENTITY_EXISTS",
            SchemaErrorCode::FieldExists => "DELTA_FIELD_EXISTS",
            SchemaErrorCode::FieldMissing => "DELTA_FIELD_MISSING",
            SchemaErrorCode::FieldDefaultRequired => "DELTA_FIELD_DEFAULT_REQUIRED",
            SchemaErrorCode::InvalidValue => "DELTA_INVALID_VALUE",
            SchemaErrorCode::InvalidDefinition => "DELTA_INVALID_DEFINITION",
            SchemaErrorCode::IrreversibleOperation => "DELTA_IRREVERSIBLE_OPERATION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    entity: Option<String>,
    field: Option<String>,
}

impl SchemaError {
    /// Target entity is absent from the schema
    pub fn schema_mismatch(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: SchemaErrorCode::SchemaMismatch,
            message: format!("Entity '{}' does not exist in the schema", entity),
            entity: Some(entity),
            field: None,
        }
    }

    /// Entity is already defined
    pub fn entity_exists(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: SchemaErrorCode::EntityExists,
            message: format!("Entity '{}' already exists", entity),
            entity: Some(entity),
            field: None,
        }
    }

    /// Field is already defined
    pub fn field_exists(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self {
            code: SchemaErrorCode::FieldExists,
            message: format!("Field '{}' already exists on '{}'", field, entity),
            entity: Some(entity),
            field: Some(field),
        }
    }

    /// Field is not defined
    pub fn field_missing(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self {
            code: SchemaErrorCode::FieldMissing,
            message: format!("Field '{}' does not exist on '{}'", field, entity),
            entity: Some(entity),
            field: Some(field),
        }
    }

    /// Non-nullable field needs a default to fill existing rows
    pub fn default_required(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self {
            code: SchemaErrorCode::FieldDefaultRequired,
            message: format!(
                "Field '{}' on '{}' is not nullable and has no default for existing rows",
                field, entity
            ),
            entity: Some(entity),
            field: Some(field),
        }
    }

    /// Value rejected by a field definition
    pub fn invalid_value(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self {
            code: SchemaErrorCode::InvalidValue,
            message: format!("Invalid value for '{}.{}': {}", entity, field, reason.into()),
            entity: Some(entity),
            field: Some(field),
        }
    }

    /// Malformed definition
    pub fn invalid_definition(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: SchemaErrorCode::InvalidDefinition,
            message: format!("Invalid definition for '{}': {}", entity, reason.into()),
            entity: Some(entity),
            field: None,
        }
    }

    /// Operation cannot be undone
    pub fn irreversible(entity: impl Into<String>, operation: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: SchemaErrorCode::IrreversibleOperation,
            message: format!("'{}' cannot be reversed", operation.into()),
            entity: Some(entity),
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
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

    /// Returns the entity name if applicable
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
