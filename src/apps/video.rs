//! Migrations of the `video` app
//!
//! `project` holds one video-overlay editing project: a title, the source
//! video path and the overlay layers as a JSON document.

use serde_json::json;

use crate::migration::{Migration, Operation};
use crate::schema::{Field, FieldDef, FieldType, ValueGenerator};

pub const APP: &str = "video";

/// All migrations of the app, in authoring order
pub fn migrations() -> Vec<Migration> {
    vec![
        initial(),
        project_created_at(),
        alter_project_layers(),
        project_uuid(),
    ]
}

fn initial() -> Migration {
    Migration::new(APP, "0001_initial").operation(Operation::create_entity(
        "project",
        vec![
            Field::new("id", FieldDef::auto_id()),
            Field::new("name", FieldDef::string(255)),
            Field::new("video", FieldDef::string(255).nullable()),
            Field::new("layers", FieldDef::new(FieldType::Json).nullable()),
        ],
    ))
}

fn project_created_at() -> Migration {
    Migration::new(APP, "0002_project_created_at")
        .depends_on(APP, "0001_initial")
        .operation(Operation::add_field(
            "project",
            "created_at",
            FieldDef::new(FieldType::DateTime)
                .non_editable()
                .generated_by(ValueGenerator::Now),
        ))
}

/// Layers become required; existing null layers are replaced by `{}`.
fn alter_project_layers() -> Migration {
    Migration::new(APP, "0003_alter_project_layers")
        .depends_on(APP, "0002_project_created_at")
        .operation(Operation::alter_field(
            "project",
            "layers",
            FieldDef::new(FieldType::Json).with_default(json!({})),
        ))
}

/// Gives every project a stable public identifier, generated per row and
/// hidden from edit forms.
fn project_uuid() -> Migration {
    Migration::new(APP, "0004_project_uuid")
        .depends_on(APP, "0003_alter_project_layers")
        .operation(Operation::add_field(
            "project",
            "uuid",
            FieldDef::new(FieldType::Uuid)
                .non_editable()
                .generated_by(ValueGenerator::Uuid4),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_uuid_declaration() {
        let migration = project_uuid();

        assert_eq!(migration.id.to_string(), "video.0004_project_uuid");
        assert_eq!(
            migration.dependencies()[0].to_string(),
            "video.0003_alter_project_layers"
        );
        assert_eq!(migration.operations().len(), 1);

        match &migration.operations()[0] {
            Operation::AddField { model, name, field } => {
                assert_eq!(model, "project");
                assert_eq!(name, "uuid");
                assert_eq!(field.field_type, FieldType::Uuid);
                assert!(!field.editable);
                assert!(!field.nullable);
                assert!(field.has_default());
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_every_migration_is_structurally_valid() {
        for migration in migrations() {
            for op in migration.operations() {
                if let Operation::AddField { field, .. } | Operation::AlterField { field, .. } = op {
                    field.validate_structure().unwrap();
                }
            }
        }
    }
}
