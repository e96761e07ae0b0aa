//! Core traits and types for entity representation and serialization.
//!
//! This module provides the [`Entity`] trait that every mapped type satisfies,
//! the conversion helpers between entities and BSON documents, and the raw
//! [`DocumentSnapshot`] a store hands back from reads.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Marker trait for types that can be mapped onto a stored document.
///
/// Any serde round-trippable type qualifies, so application structs only need
/// `#[derive(Serialize, Deserialize, Clone)]`. `bson::Document` is itself an
/// entity, which gives an untyped model for free.
///
/// # Example
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub name: String,
///     pub email: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     pub age: Option<i32>,
/// }
/// ```
pub trait Entity: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {}

impl<T> Entity for T where T: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {}

/// Extension trait providing serialization/deserialization utilities for entities.
///
/// This trait is automatically implemented for all types that implement [`Entity`].
pub trait EntityExt: Entity {
    /// Converts this entity to a BSON document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the entity does not serialize to a map.
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document>;

    /// Creates an entity from a stored BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the entity's shape.
    fn from_bson_document(document: bson::Document) -> DocumentStoreResult<Self>;

    /// Converts this entity to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates an entity from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<E: Entity> EntityExt for E {
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document> {
        into_document(serialize_to_bson(self)?)
    }

    fn from_bson_document(document: bson::Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Serializes any value into a BSON document.
///
/// Used for partial inputs that are not full entities, such as the argument to
/// `Model::create`.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<bson::Document> {
    into_document(serialize_to_bson(value)?)
}

fn into_document(bson: Bson) -> DocumentStoreResult<bson::Document> {
    match bson {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// A raw document read back from a store together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// The store-assigned identifier.
    pub id: Uuid,
    /// The stored fields, without the identifier.
    pub data: bson::Document,
}

impl DocumentSnapshot {
    pub fn new(id: Uuid, data: bson::Document) -> Self {
        Self { id, data }
    }
}
