//! Schema subsystem for schemadelta
//!
//! The catalog is the single source of truth for entity structure. It is
//! changed only by migration operations and persisted together with the rows
//! it describes.
//!
//! # Design Principles
//!
//! - Entities are addressed by qualified name (`app.model`)
//! - Field order is declaration order
//! - Defaults are either constants or generators, resolved per row
//! - Non-editable fields never reach generated input surfaces

mod catalog;
mod errors;
mod forms;
mod types;

pub use catalog::{qualified_name, SchemaCatalog};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use forms::{FormDescriptor, FormField, InputKind};
pub use types::{EntitySchema, Field, FieldDef, FieldDefault, FieldType, ValueGenerator};
