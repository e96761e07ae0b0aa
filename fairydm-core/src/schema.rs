//! Field descriptors, schemas and recursive validation.
//!
//! A [`Schema`] is an ordered set of named [`Field`] descriptors. Validation
//! walks the descriptor tree, fills defaults, and collects every problem it
//! finds rather than stopping at the first one.
//!
//! # Example
//!
//! ```ignore
//! use fairydm::schema::{Field, Schema};
//!
//! let address = Schema::builder()
//!     .field("street", Field::string().required())
//!     .field("city", Field::string().required())
//!     .build();
//!
//! let user = Schema::builder()
//!     .field("name", Field::string().required())
//!     .field("role", Field::string().default_value("user"))
//!     .field("tags", Field::array(FieldKind::String))
//!     .field("address", Field::schema(address).required())
//!     .build();
//!
//! let result = user.validate(&doc! { "name": "Alice" });
//! assert!(!result.valid);
//! ```

use bson::Bson;
use indexmap::IndexMap;
use std::sync::Arc;

/// The declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// Any numeric value (32/64-bit integer or double).
    Number,
    /// Boolean.
    Boolean,
    /// BSON UTC datetime.
    Date,
    /// A sub-document validated by its own schema.
    Schema(Arc<Schema>),
    /// An ordered sequence whose elements all have the given kind.
    Array(Box<FieldKind>),
}

impl FieldKind {
    /// Returns the type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Schema(_) => "Object",
            FieldKind::Array(_) => "Array",
        }
    }

    fn matches(&self, value: &Bson) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, Bson::String(_))
                | (FieldKind::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
                | (FieldKind::Boolean, Bson::Boolean(_))
                | (FieldKind::Date, Bson::DateTime(_))
                | (FieldKind::Schema(_), Bson::Document(_))
                | (FieldKind::Array(_), Bson::Array(_))
        )
    }
}

impl From<Schema> for FieldKind {
    fn from(schema: Schema) -> Self {
        FieldKind::Schema(Arc::new(schema))
    }
}

/// Returns the runtime type name of a BSON value, in the vocabulary of [`FieldKind::type_name`].
pub fn value_type_name(value: &Bson) -> String {
    match value {
        Bson::String(_) => "String".to_string(),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "Number".to_string(),
        Bson::Boolean(_) => "Boolean".to_string(),
        Bson::DateTime(_) => "Date".to_string(),
        Bson::Document(_) => "Object".to_string(),
        Bson::Array(_) => "Array".to_string(),
        Bson::Null | Bson::Undefined => "Null".to_string(),
        other => format!("{:?}", other.element_type()),
    }
}

/// Declaration of a single schema field.
#[derive(Debug, Clone)]
pub struct Field {
    /// The declared type.
    pub kind: FieldKind,
    /// Whether the field must be present and non-null after defaults are applied.
    pub required: bool,
    /// Value substituted when the field is absent.
    pub default: Option<Bson>,
}

impl Field {
    /// Creates an optional field of the given kind with no default.
    pub fn new(kind: impl Into<FieldKind>) -> Self {
        Self { kind: kind.into(), required: false, default: None }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    /// A nested sub-document field.
    pub fn schema(schema: Schema) -> Self {
        Self::new(FieldKind::Schema(Arc::new(schema)))
    }

    /// An array field whose elements have kind `of`.
    pub fn array(of: impl Into<FieldKind>) -> Self {
        Self::new(FieldKind::Array(Box::new(of.into())))
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value used when the field is absent from the input.
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Outcome of validating a raw document against a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// `true` when no errors were recorded.
    pub valid: bool,
    /// Every problem found, in schema declaration order.
    pub errors: Vec<String>,
    /// The input with defaults filled in and nested values normalized.
    pub validated: bson::Document,
}

/// An ordered mapping of field name to [`Field`] descriptor.
///
/// Field names are unique; declaring a name twice keeps the first position
/// and the last descriptor.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: IndexMap<String, Field>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the descriptor for `name`, if declared.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterates the declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates `raw`, returning all errors and the normalized document.
    ///
    /// Fields not declared in the schema are passed through untouched.
    pub fn validate(&self, raw: &bson::Document) -> ValidationResult {
        let mut errors = Vec::new();
        let validated = self.validate_into(raw, "", &mut errors);

        ValidationResult { valid: errors.is_empty(), errors, validated }
    }

    fn validate_into(&self, raw: &bson::Document, prefix: &str, errors: &mut Vec<String>) -> bson::Document {
        let mut validated = raw.clone();

        for (name, field) in &self.fields {
            let path = format!("{prefix}{name}");
            if !validated.contains_key(name) {
                if let Some(default) = &field.default {
                    validated.insert(name.clone(), default.clone());
                }
            }

            let value = match validated.get(name) {
                Some(value) if !is_absent(Some(value)) => value,
                _ => {
                    if field.required {
                        errors.push(format!("{path} is required."));
                    }
                    continue;
                }
            };

            if let Some(normalized) = validate_value(value, &field.kind, &path, errors) {
                validated.insert(name.clone(), normalized);
            }
        }

        validated
    }
}

// Null fails a required check and skips the type check. Only a missing key
// receives the default.
fn is_absent(value: Option<&Bson>) -> bool {
    matches!(value, None | Some(Bson::Null) | Some(Bson::Undefined))
}

/// Checks `value` against `kind`, recording errors under `path`.
///
/// Returns the replacement value when validation rebuilt it (nested documents
/// and arrays), or `None` when the original should be kept.
fn validate_value(value: &Bson, kind: &FieldKind, path: &str, errors: &mut Vec<String>) -> Option<Bson> {
    match (kind, value) {
        (FieldKind::Schema(schema), Bson::Document(sub)) => Some(Bson::Document(
            schema.validate_into(sub, &format!("{path}."), errors),
        )),
        (FieldKind::Array(element), Bson::Array(items)) => Some(Bson::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    validate_value(item, element, &format!("{path}[{i}]"), errors)
                        .unwrap_or_else(|| item.clone())
                })
                .collect(),
        )),
        _ => {
            if !kind.matches(value) {
                errors.push(format!(
                    "Invalid type for {path}. Expected {}, got {}.",
                    kind.type_name(),
                    value_type_name(value),
                ));
            }
            None
        }
    }
}

/// Fluent builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: IndexMap<String, Field>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self { fields: IndexMap::new() }
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn build(self) -> Schema {
        Schema { fields: self.fields }
    }
}
