//! Schema operations and their interpreter
//!
//! Operations form a closed set. `apply` dispatches each variant to the
//! matching structural change on `Database`. Model names are local to the
//! migration's app and resolved to `app.model` at apply time.

use serde::{Deserialize, Serialize};

use crate::schema::{qualified_name, EntitySchema, Field, FieldDef, SchemaError, SchemaResult};
use crate::storage::Database;

/// One atomic schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create an entity with the given fields
    CreateEntity { model: String, fields: Vec<Field> },
    /// Drop an entity and its rows
    DeleteEntity { model: String },
    /// Add a field, back-filling existing rows from its default
    AddField {
        model: String,
        name: String,
        field: FieldDef,
    },
    /// Drop a field and its values
    RemoveField { model: String, name: String },
    /// Replace a field definition, re-validating stored values
    AlterField {
        model: String,
        name: String,
        field: FieldDef,
    },
    /// Rename a field, keeping its values
    RenameField {
        model: String,
        old_name: String,
        new_name: String,
    },
}

impl Operation {
    pub fn create_entity(model: impl Into<String>, fields: Vec<Field>) -> Self {
        Operation::CreateEntity {
            model: model.into(),
            fields,
        }
    }

    pub fn add_field(model: impl Into<String>, name: impl Into<String>, field: FieldDef) -> Self {
        Operation::AddField {
            model: model.into(),
            name: name.into(),
            field,
        }
    }

    pub fn alter_field(
        model: impl Into<String>,
        name: impl Into<String>,
        field: FieldDef,
    ) -> Self {
        Operation::AlterField {
            model: model.into(),
            name: name.into(),
            field,
        }
    }

    pub fn remove_field(model: impl Into<String>, name: impl Into<String>) -> Self {
        Operation::RemoveField {
            model: model.into(),
            name: name.into(),
        }
    }

    pub fn rename_field(
        model: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Operation::RenameField {
            model: model.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Name of the target entity, unqualified
    pub fn target_entity(&self) -> &str {
        match self {
            Operation::CreateEntity { model, .. }
            | Operation::DeleteEntity { model }
            | Operation::AddField { model, .. }
            | Operation::RemoveField { model, .. }
            | Operation::AlterField { model, .. }
            | Operation::RenameField { model, .. } => model,
        }
    }

    /// Applies the operation to `db` for the given app.
    ///
    /// # Errors
    ///
    /// `DELTA_SCHEMA_MISMATCH` when the target entity is absent (for every
    /// variant except `CreateEntity`), plus the field-level errors of the
    /// underlying change. On error `db` is unchanged.
    pub fn apply(&self, app: &str, db: &mut Database) -> SchemaResult<()> {
        let entity = qualified_name(app, self.target_entity());

        match self {
            Operation::CreateEntity { fields, .. } => {
                db.create_entity(EntitySchema::new(entity, fields.clone()))
            }
            Operation::DeleteEntity { .. } => db.drop_entity(&entity).map(|_| ()),
            Operation::AddField { name, field, .. } => {
                db.add_column(&entity, Field::new(name.clone(), field.clone()))
            }
            Operation::RemoveField { name, .. } => db.drop_column(&entity, name).map(|_| ()),
            Operation::AlterField { name, field, .. } => {
                db.alter_column(&entity, name, field.clone()).map(|_| ())
            }
            Operation::RenameField {
                old_name, new_name, ..
            } => db.rename_column(&entity, old_name, new_name),
        }
    }

    /// Operation that undoes this one, if it can be derived from the
    /// operation alone. Destructive operations have no inverse.
    pub fn reverse(&self) -> Option<Operation> {
        match self {
            Operation::CreateEntity { model, .. } => Some(Operation::DeleteEntity {
                model: model.clone(),
            }),
            Operation::AddField { model, name, .. } => {
                Some(Operation::remove_field(model.clone(), name.clone()))
            }
            Operation::RenameField {
                model,
                old_name,
                new_name,
            } => Some(Operation::rename_field(
                model.clone(),
                new_name.clone(),
                old_name.clone(),
            )),
            Operation::DeleteEntity { .. }
            | Operation::RemoveField { .. }
            | Operation::AlterField { .. } => None,
        }
    }

    /// Undoes the operation on `db`.
    ///
    /// An irreversible operation is rejected with
    /// `DELTA_IRREVERSIBLE_OPERATION` and `db` is unchanged.
    pub fn unapply(&self, app: &str, db: &mut Database) -> SchemaResult<()> {
        match self.reverse() {
            Some(inverse) => inverse.apply(app, db),
            None => Err(SchemaError::irreversible(
                qualified_name(app, self.target_entity()),
                self.describe(),
            )),
        }
    }

    pub fn is_reversible(&self) -> bool {
        self.reverse().is_some()
    }

    /// One-line description
    pub fn describe(&self) -> String {
        match self {
            Operation::CreateEntity { model, .. } => format!("Create model {}", model),
            Operation::DeleteEntity { model } => format!("Delete model {}", model),
            Operation::AddField { model, name, .. } => {
                format!("Add field {} to {}", name, model)
            }
            Operation::RemoveField { model, name } => {
                format!("Remove field {} from {}", name, model)
            }
            Operation::AlterField { model, name, .. } => {
                format!("Alter field {} on {}", name, model)
            }
            Operation::RenameField {
                model,
                old_name,
                new_name,
            } => format!("Rename field {} on {} to {}", old_name, model, new_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaErrorCode, ValueGenerator};
    use serde_json::json;

    fn create_project() -> Operation {
        Operation::create_entity(
            "project",
            vec![
                Field::new("id", FieldDef::auto_id()),
                Field::new("name", FieldDef::string(255)),
            ],
        )
    }

    #[test]
    fn test_apply_create_then_add() {
        let mut db = Database::new();
        create_project().apply("video", &mut db).unwrap();
        Operation::add_field(
            "project",
            "uuid",
            FieldDef::new(FieldType::Uuid)
                .non_editable()
                .generated_by(ValueGenerator::Uuid4),
        )
        .apply("video", &mut db)
        .unwrap();

        let entity = db.entity("video.project").unwrap();
        assert!(!entity.field("uuid").unwrap().editable);
    }

    #[test]
    fn test_model_name_is_case_insensitive() {
        let mut db = Database::new();
        create_project().apply("video", &mut db).unwrap();
        Operation::add_field("Project", "views", FieldDef::new(FieldType::Int).with_default(json!(0)))
            .apply("video", &mut db)
            .unwrap();
        assert!(db.entity("video.project").unwrap().has_field("views"));
    }

    #[test]
    fn test_add_field_to_missing_entity() {
        let mut db = Database::new();
        let err = Operation::add_field("project", "uuid", FieldDef::new(FieldType::Uuid).nullable())
            .apply("video", &mut db)
            .unwrap_err();
        assert_eq!(err.code().code(), "DELTA_SCHEMA_MISMATCH");
        assert_eq!(db, Database::new());
    }

    #[test]
    fn test_reverse_round_trips_state() {
        let mut db = Database::new();
        create_project().apply("video", &mut db).unwrap();
        let before = db.clone();

        let rename = Operation::rename_field("project", "name", "title");
        rename.apply("video", &mut db).unwrap();
        rename.unapply("video", &mut db).unwrap();
        assert_eq!(db, before);
    }

    #[test]
    fn test_unapply_irreversible_leaves_db() {
        let mut db = Database::new();
        create_project().apply("video", &mut db).unwrap();
        let before = db.clone();

        let err = Operation::remove_field("project", "name")
            .unapply("video", &mut db)
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::IrreversibleOperation);
        assert_eq!(err.code().code(), "DELTA_IRREVERSIBLE_OPERATION");
        assert_eq!(db, before);
    }

    #[test]
    fn test_destructive_operations_are_irreversible() {
        assert!(!Operation::remove_field("project", "name").is_reversible());
        assert!(!Operation::DeleteEntity {
            model: "project".into()
        }
        .is_reversible());
        assert!(create_project().is_reversible());
    }

    #[test]
    fn test_describe() {
        let op = Operation::add_field("project", "uuid", FieldDef::new(FieldType::Uuid));
        assert_eq!(op.describe(), "Add field uuid to project");
    }

    #[test]
    fn test_serde_tag() {
        let op = Operation::remove_field("project", "name");
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], "remove_field");
        assert_eq!(value["model"], "project");
    }
}
