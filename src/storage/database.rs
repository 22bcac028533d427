//! In-memory database: schema catalog plus one table per entity
//!
//! Rows are JSON objects keyed by field name. Every row carries a value for
//! every declared field; absent values are stored as `null` only when the
//! field is nullable.
//!
//! Structural changes (`create_entity`, `add_column`, ...) are invoked by the
//! migration interpreter. Each validates fully before mutating anything, so a
//! failed change leaves the database as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{
    EntitySchema, Field, FieldDef, FieldType, SchemaCatalog, SchemaError, SchemaResult,
};

/// A stored row
pub type Row = Map<String, Value>;

/// Rows of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Table {
    rows: Vec<Row>,
    /// Next value handed out for `auto` fields
    next_id: u64,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Catalog and tables, persisted as a unit by `StateStore`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    catalog: SchemaCatalog,
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Returns the schema of an entity.
    pub fn entity(&self, name: &str) -> SchemaResult<&EntitySchema> {
        self.catalog.require(name)
    }

    /// Returns the rows of an entity in insertion order.
    pub fn rows(&self, entity: &str) -> SchemaResult<&[Row]> {
        self.catalog.require(entity)?;
        Ok(self.tables.get(entity).map_or(&[][..], |t| t.rows()))
    }

    /// Inserts a row, filling omitted fields from their defaults.
    ///
    /// Generated defaults are evaluated once for this row. `auto` fields
    /// receive the next free id unless one is supplied.
    pub fn insert(&mut self, entity: &str, values: Row) -> SchemaResult<Row> {
        let schema = self.catalog.require(entity)?;

        if let Some(unknown) = values.keys().find(|k| !schema.has_field(k)) {
            return Err(SchemaError::field_missing(entity, unknown.as_str()));
        }

        let table = self.tables.entry(entity.to_string()).or_insert_with(Table::new);
        let mut row = Row::new();
        let mut next_id = table.next_id;

        for field in &schema.fields {
            let value = match values.get(&field.name) {
                Some(value) => value.clone(),
                None if field.def.field_type == FieldType::Auto => Value::from(next_id),
                None => match field.def.default_value() {
                    Some(value) => value,
                    None if field.def.nullable => Value::Null,
                    None => {
                        return Err(SchemaError::invalid_value(
                            entity,
                            &field.name,
                            "no value supplied and field has no default",
                        ))
                    }
                },
            };

            field
                .def
                .check_value(&value)
                .map_err(|e| SchemaError::invalid_value(entity, &field.name, e))?;

            if field.def.field_type == FieldType::Auto {
                let id = value.as_u64().unwrap_or_default();
                if table.rows.iter().any(|r| r.get(&field.name) == Some(&value)) {
                    return Err(SchemaError::invalid_value(
                        entity,
                        &field.name,
                        format!("id {} already in use", id),
                    ));
                }
                let after = id.checked_add(1).ok_or_else(|| {
                    SchemaError::invalid_value(entity, &field.name, "id out of range")
                })?;
                next_id = next_id.max(after);
            }

            row.insert(field.name.clone(), value);
        }

        table.next_id = next_id;
        table.rows.push(row.clone());
        Ok(row)
    }

    /// Registers a new entity with an empty table.
    pub(crate) fn create_entity(&mut self, schema: EntitySchema) -> SchemaResult<()> {
        let name = schema.name.clone();
        self.catalog.register(schema)?;
        self.tables.insert(name, Table::new());
        Ok(())
    }

    /// Removes an entity and all of its rows.
    pub(crate) fn drop_entity(&mut self, name: &str) -> SchemaResult<EntitySchema> {
        let schema = self.catalog.remove(name)?;
        self.tables.remove(name);
        Ok(schema)
    }

    /// Adds a column and back-fills existing rows.
    ///
    /// Each existing row gets its own call to the default, so generated
    /// values are independent per row.
    pub(crate) fn add_column(&mut self, entity: &str, field: Field) -> SchemaResult<()> {
        let schema = self.catalog.require(entity)?;
        if schema.has_field(&field.name) {
            return Err(SchemaError::field_exists(entity, &field.name));
        }
        field.def.validate_structure().map_err(|e| {
            SchemaError::invalid_definition(entity, format!("field '{}': {}", field.name, e))
        })?;

        let table = self.tables.entry(entity.to_string()).or_insert_with(Table::new);
        let is_auto = field.def.field_type == FieldType::Auto;

        if !table.is_empty() && !is_auto && !field.def.nullable && !field.def.has_default() {
            return Err(SchemaError::default_required(entity, &field.name));
        }

        for (i, row) in table.rows.iter_mut().enumerate() {
            let value = if is_auto {
                Value::from(i as u64 + 1)
            } else {
                field.def.default_value().unwrap_or(Value::Null)
            };
            row.insert(field.name.clone(), value);
        }
        if is_auto {
            table.next_id = table.rows.len() as u64 + 1;
        }

        self.catalog.require_mut(entity)?.push_field(field);
        Ok(())
    }

    /// Drops a column from the schema and every row.
    pub(crate) fn drop_column(&mut self, entity: &str, name: &str) -> SchemaResult<Field> {
        let removed = self
            .catalog
            .require_mut(entity)?
            .remove_field(name)
            .ok_or_else(|| SchemaError::field_missing(entity, name))?;

        if let Some(table) = self.tables.get_mut(entity) {
            for row in &mut table.rows {
                row.remove(name);
            }
        }
        Ok(removed)
    }

    /// Replaces a column definition, re-validating every stored value.
    ///
    /// Nulls in a field that becomes non-nullable are filled from the new
    /// default; without one the change is rejected.
    pub(crate) fn alter_column(
        &mut self,
        entity: &str,
        name: &str,
        def: FieldDef,
    ) -> SchemaResult<FieldDef> {
        let schema = self.catalog.require(entity)?;
        let current = schema
            .field(name)
            .ok_or_else(|| SchemaError::field_missing(entity, name))?;

        if def.field_type == FieldType::Auto && current.field_type != FieldType::Auto {
            return Err(SchemaError::invalid_definition(
                entity,
                format!("field '{}' cannot be converted to auto", name),
            ));
        }
        def.validate_structure().map_err(|e| {
            SchemaError::invalid_definition(entity, format!("field '{}': {}", name, e))
        })?;

        let rows = self.tables.get(entity).map_or(&[][..], |t| t.rows());
        let mut converted = Vec::with_capacity(rows.len());
        for row in rows {
            let value = match row.get(name) {
                Some(Value::Null) | None if !def.nullable => def
                    .default_value()
                    .ok_or_else(|| SchemaError::default_required(entity, name))?,
                Some(value) => value.clone(),
                None => Value::Null,
            };
            def.check_value(&value)
                .map_err(|e| SchemaError::invalid_value(entity, name, e))?;
            converted.push(value);
        }

        if let Some(table) = self.tables.get_mut(entity) {
            for (row, value) in table.rows.iter_mut().zip(converted) {
                row.insert(name.to_string(), value);
            }
        }

        self.catalog
            .require_mut(entity)?
            .replace_field(name, def)
            .ok_or_else(|| SchemaError::field_missing(entity, name))
    }

    /// Renames a column in the schema and every row.
    pub(crate) fn rename_column(&mut self, entity: &str, old: &str, new: &str) -> SchemaResult<()> {
        let schema = self.catalog.require(entity)?;
        if !schema.has_field(old) {
            return Err(SchemaError::field_missing(entity, old));
        }
        if schema.has_field(new) {
            return Err(SchemaError::field_exists(entity, new));
        }

        self.catalog.require_mut(entity)?.rename_field(old, new);
        if let Some(table) = self.tables.get_mut(entity) {
            for row in &mut table.rows {
                if let Some(value) = row.remove(old) {
                    row.insert(new.to_string(), value);
                }
            }
        }
        Ok(())
    }
}
