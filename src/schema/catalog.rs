//! Schema catalog: the live set of entity definitions
//!
//! Entities are keyed by their qualified, lower-cased name (`app.model`).
//! The catalog is owned by the `Database` it describes and is mutated only by
//! migration operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::types::EntitySchema;

/// Builds the catalog key for a model of an app.
pub fn qualified_name(app: &str, model: &str) -> String {
    format!("{}.{}", app.to_lowercase(), model.to_lowercase())
}

/// In-memory registry of entity schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    entities: BTreeMap<String, EntitySchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an entity by qualified name.
    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// Gets an entity, failing with `DELTA_SCHEMA_MISMATCH` when absent.
    pub fn require(&self, name: &str) -> SchemaResult<&EntitySchema> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::schema_mismatch(name))
    }

    pub(crate) fn require_mut(&mut self, name: &str) -> SchemaResult<&mut EntitySchema> {
        self.entities
            .get_mut(name)
            .ok_or_else(|| SchemaError::schema_mismatch(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Registers a new entity after validating its structure.
    pub fn register(&mut self, entity: EntitySchema) -> SchemaResult<()> {
        entity
            .validate_structure()
            .map_err(|e| SchemaError::invalid_definition(&entity.name, e))?;

        if self.entities.contains_key(&entity.name) {
            return Err(SchemaError::entity_exists(&entity.name));
        }

        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Removes an entity.
    pub fn remove(&mut self, name: &str) -> SchemaResult<EntitySchema> {
        self.entities
            .remove(name)
            .ok_or_else(|| SchemaError::schema_mismatch(name))
    }

    /// Returns all entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldDef};

    fn project() -> EntitySchema {
        EntitySchema::new(
            "video.project",
            vec![
                Field::new("id", FieldDef::auto_id()),
                Field::new("name", FieldDef::string(255)),
            ],
        )
    }

    #[test]
    fn test_qualified_name_is_lowercase() {
        assert_eq!(qualified_name("video", "Project"), "video.project");
    }

    #[test]
    fn test_register_and_require() {
        let mut catalog = SchemaCatalog::new();
        catalog.register(project()).unwrap();

        assert!(catalog.contains("video.project"));
        assert_eq!(catalog.require("video.project").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_require_missing_is_schema_mismatch() {
        let catalog = SchemaCatalog::new();
        let err = catalog.require("video.project").unwrap_err();
        assert_eq!(err.code().code(), "DELTA_SCHEMA_MISMATCH");
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut catalog = SchemaCatalog::new();
        catalog.register(project()).unwrap();
        let err = catalog.register(project()).unwrap_err();
        assert_eq!(err.code().code(), "DELTA_ENTITY_EXISTS");
    }

    #[test]
    fn test_register_invalid_structure_rejected() {
        let mut catalog = SchemaCatalog::new();
        let err = catalog
            .register(EntitySchema::new("video.empty", Vec::new()))
            .unwrap_err();
        assert_eq!(err.code().code(), "DELTA_INVALID_DEFINITION");
        assert_eq!(catalog.entity_count(), 0);
    }
}
