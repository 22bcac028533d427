//! Schema type definitions
//!
//! Supported field types:
//! - auto: auto-incrementing integer primary key
//! - string: UTF-8 string, optionally length-bounded
//! - int: 64-bit signed integer
//! - bool: Boolean
//! - float: 64-bit floating point
//! - datetime: RFC 3339 timestamp string
//! - uuid: hyphenated 128-bit UUID string
//! - json: any JSON value

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Auto-incrementing integer id, assigned by the store
    Auto,
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit floating point
    Float,
    /// RFC 3339 timestamp
    DateTime,
    /// 128-bit universally unique identifier
    Uuid,
    /// Arbitrary JSON document
    Json,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Auto => "auto",
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
        }
    }

    /// Checks a non-null value against this type.
    fn accepts(&self, value: &Value) -> Result<(), String> {
        let ok = match self {
            FieldType::Auto => value.is_u64(),
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Float => value.is_number(),
            FieldType::DateTime => value
                .as_str()
                .map_or(false, |s| DateTime::parse_from_rfc3339(s).is_ok()),
            FieldType::Uuid => value.as_str().map_or(false, |s| Uuid::parse_str(s).is_ok()),
            FieldType::Json => true,
        };

        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self.type_name(), json_type_name(value)))
        }
    }
}

/// Source of a default value, invoked once per row that needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGenerator {
    /// Random version-4 UUID
    Uuid4,
    /// Current UTC time
    Now,
}

impl ValueGenerator {
    /// Produces a fresh value.
    pub fn generate(&self) -> Value {
        match self {
            ValueGenerator::Uuid4 => Value::String(Uuid::new_v4().hyphenated().to_string()),
            ValueGenerator::Now => {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            }
        }
    }

    /// Field type of the values this generator produces
    pub fn produces(&self) -> FieldType {
        match self {
            ValueGenerator::Uuid4 => FieldType::Uuid,
            ValueGenerator::Now => FieldType::DateTime,
        }
    }
}

/// Default applied when no explicit value is supplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDefault {
    /// Same literal for every row
    Constant { value: Value },
    /// Fresh value per row
    Generated { generator: ValueGenerator },
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether null is a legal stored value
    #[serde(default)]
    pub nullable: bool,
    /// Whether generated input surfaces may expose the field
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Whether the field is the entity's primary key
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Maximum length, strings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Value used when none is supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
}

fn default_editable() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldDef {
    /// Create a non-null, editable field of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: false,
            editable: true,
            primary_key: false,
            max_length: None,
            default: None,
        }
    }

    /// Auto-incrementing primary key
    pub fn auto_id() -> Self {
        Self {
            editable: false,
            primary_key: true,
            ..Self::new(FieldType::Auto)
        }
    }

    pub fn string(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::new(FieldType::String)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn non_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Constant { value });
        self
    }

    pub fn generated_by(mut self, generator: ValueGenerator) -> Self {
        self.default = Some(FieldDefault::Generated { generator });
        self
    }

    /// Resolves the default for one row. Generators run on every call.
    pub fn default_value(&self) -> Option<Value> {
        match &self.default {
            Some(FieldDefault::Constant { value }) => Some(value.clone()),
            Some(FieldDefault::Generated { generator }) => Some(generator.generate()),
            None => None,
        }
    }

    /// Whether the field has a default
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Checks a stored or inserted value against this definition.
    pub fn check_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("null value for non-nullable field".into())
            };
        }

        self.field_type.accepts(value)?;

        if let (Some(max), Some(s)) = (self.max_length, value.as_str()) {
            let len = s.chars().count();
            if len > max {
                return Err(format!("length {} exceeds max_length {}", len, max));
            }
        }

        Ok(())
    }

    /// Validates the definition itself
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.max_length.is_some() && self.field_type != FieldType::String {
            return Err("max_length is only valid for string fields".into());
        }
        if self.field_type == FieldType::Auto && self.nullable {
            return Err("auto fields cannot be nullable".into());
        }
        match &self.default {
            Some(FieldDefault::Constant { value }) => self
                .check_value(value)
                .map_err(|e| format!("default does not match field: {}", e))?,
            Some(FieldDefault::Generated { generator }) => {
                if generator.produces() != self.field_type && self.field_type != FieldType::Json {
                    return Err(format!(
                        "generator produces {}, field is {}",
                        generator.produces().type_name(),
                        self.field_type.type_name()
                    ));
                }
            }
            None => {}
        }
        Ok(())
    }
}

/// A named field within an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub def: FieldDef,
}

impl Field {
    pub fn new(name: impl Into<String>, def: FieldDef) -> Self {
        Self {
            name: name.into(),
            def,
        }
    }
}

/// Entity (table) definition. Field order is declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Qualified entity name, `app.model`
    pub name: String,
    pub fields: Vec<Field>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.def)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Appends a field. Callers check for duplicates first.
    pub(crate) fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub(crate) fn remove_field(&mut self, name: &str) -> Option<Field> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    pub(crate) fn replace_field(&mut self, name: &str, def: FieldDef) -> Option<FieldDef> {
        let field = self.fields.iter_mut().find(|f| f.name == name)?;
        Some(std::mem::replace(&mut field.def, def))
    }

    pub(crate) fn rename_field(&mut self, old: &str, new: &str) -> bool {
        match self.fields.iter_mut().find(|f| f.name == old) {
            Some(field) => {
                field.name = new.to_string();
                true
            }
            None => false,
        }
    }

    /// Validates the entity structure
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("entity must declare at least one field".into());
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err("field names must not be empty".into());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate field '{}'", field.name));
            }
            field
                .def
                .validate_structure()
                .map_err(|e| format!("field '{}': {}", field.name, e))?;
        }

        let keys = self.fields.iter().filter(|f| f.def.primary_key).count();
        if keys > 1 {
            return Err("entity declares more than one primary key".into());
        }

        Ok(())
    }
}

/// Returns the JSON type name of a value
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uuid_generator_produces_distinct_v4_values() {
        let a = ValueGenerator::Uuid4.generate();
        let b = ValueGenerator::Uuid4.generate();
        assert_ne!(a, b);

        let parsed = Uuid::parse_str(a.as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_now_generator_is_rfc3339() {
        let value = ValueGenerator::Now.generate();
        assert!(FieldDef::new(FieldType::DateTime).check_value(&value).is_ok());
    }

    #[test]
    fn test_check_value_types() {
        let uuid = FieldDef::new(FieldType::Uuid);
        assert!(uuid.check_value(&json!("not-a-uuid")).is_err());
        assert!(uuid
            .check_value(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8"))
            .is_ok());

        let int = FieldDef::new(FieldType::Int);
        assert!(int.check_value(&json!(3)).is_ok());
        assert!(int.check_value(&json!(3.5)).is_err());
        assert!(int.check_value(&Value::Null).is_err());
        assert!(int.clone().nullable().check_value(&Value::Null).is_ok());
    }

    #[test]
    fn test_max_length() {
        let name = FieldDef::string(3);
        assert!(name.check_value(&json!("abc")).is_ok());
        assert!(name.check_value(&json!("abcd")).is_err());
    }

    #[test]
    fn test_generator_must_match_field_type() {
        let bad = FieldDef::new(FieldType::Int).generated_by(ValueGenerator::Uuid4);
        assert!(bad.validate_structure().is_err());

        let good = FieldDef::new(FieldType::Uuid).generated_by(ValueGenerator::Uuid4);
        assert!(good.validate_structure().is_ok());
    }

    #[test]
    fn test_constant_default_must_match_field() {
        let bad = FieldDef::new(FieldType::Bool).with_default(json!("yes"));
        assert!(bad.validate_structure().is_err());
    }

    #[test]
    fn test_entity_rejects_duplicate_fields() {
        let entity = EntitySchema::new(
            "video.project",
            vec![
                Field::new("name", FieldDef::string(10)),
                Field::new("name", FieldDef::string(10)),
            ],
        );
        assert!(entity.validate_structure().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_field_def_serde_shape() {
        let def = FieldDef::new(FieldType::Uuid)
            .non_editable()
            .generated_by(ValueGenerator::Uuid4);
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "uuid");
        assert_eq!(value["editable"], false);
        assert_eq!(value["default"]["kind"], "generated");
        assert_eq!(value["default"]["generator"], "uuid4");

        let back: FieldDef = serde_json::from_value(value).unwrap();
        assert_eq!(back, def);
    }
}
