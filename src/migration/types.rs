//! Migration identity and declaration

use std::fmt;

use serde::{Deserialize, Serialize};

use super::operation::Operation;

/// Identity of a migration: `(app, name)`.
///
/// Ordering is by app, then name, which for zero-padded names such as
/// `0004_project_uuid` is also authoring order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MigrationId {
    pub app: String,
    pub name: String,
}

impl MigrationId {
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app, self.name)
    }
}

/// A schema delta: prerequisites plus an ordered list of operations.
///
/// Never mutated once part of a deployed history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub id: MigrationId,
    #[serde(default)]
    pub dependencies: Vec<MigrationId>,
    pub operations: Vec<Operation>,
}

impl Migration {
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MigrationId::new(app, name),
            dependencies: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Adds a prerequisite.
    pub fn depends_on(mut self, app: impl Into<String>, name: impl Into<String>) -> Self {
        self.dependencies.push(MigrationId::new(app, name));
        self
    }

    /// Appends an operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn app(&self) -> &str {
        &self.id.app
    }

    pub fn dependencies(&self) -> &[MigrationId] {
        &self.dependencies
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Human-readable summary, one line per operation.
    pub fn describe(&self) -> Vec<String> {
        self.operations.iter().map(Operation::describe).collect()
    }
}
