//! Editable-field listing derived from an entity schema
//!
//! This is what a form layer would render. Fields marked non-editable and
//! store-assigned `auto` ids never appear.

use serde::Serialize;

use super::types::{EntitySchema, FieldType};

/// Input widget kind for an editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Checkbox,
    DateTime,
    Uuid,
    Json,
}

impl InputKind {
    fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => InputKind::Text,
            FieldType::Int | FieldType::Float | FieldType::Auto => InputKind::Number,
            FieldType::Bool => InputKind::Checkbox,
            FieldType::DateTime => InputKind::DateTime,
            FieldType::Uuid => InputKind::Uuid,
            FieldType::Json => InputKind::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub input: InputKind,
    /// The user must supply a value (non-nullable and no default)
    pub required: bool,
}

/// Ordered list of editable fields for an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormDescriptor {
    pub entity: String,
    pub fields: Vec<FormField>,
}

impl FormDescriptor {
    /// Derives the listing in declaration order.
    pub fn derive(entity: &EntitySchema) -> Self {
        let fields = entity
            .fields
            .iter()
            .filter(|f| f.def.editable && f.def.field_type != FieldType::Auto)
            .map(|f| FormField {
                name: f.name.clone(),
                input: InputKind::for_type(f.def.field_type),
                required: !f.def.nullable && !f.def.has_default(),
            })
            .collect();

        Self {
            entity: entity.name.clone(),
            fields,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}
