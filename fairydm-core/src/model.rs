//! Models: a collection and a schema bound to an entity type.
//!
//! A [`Model`] validates input with its [`Schema`], persists through the
//! shared [`DocumentStore`] session, and hydrates stored documents back into
//! [`Document`] instances.
//!
//! Error handling follows one rule per category:
//!
//! - validation and connection errors are returned to the caller;
//! - reads (`find`, `find_one`, `find_by_id`, and the read half of batch
//!   operations) propagate store errors unmodified;
//! - commit failures in `find_by_id_and_delete`, `delete_many`, `update_one`
//!   and `update_many` are logged and reported as `acknowledged = false`.
//!
//! # Example
//!
//! ```ignore
//! let users: Model<User> = registry.register("User", user_schema);
//!
//! let mut alice = users.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//! alice.data.age = Some(31);
//! alice.save().await?;
//!
//! let adults = users.find(doc! { "age": { "$gte": 18 } }).await?;
//! ```

use bson::Uuid;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    backend::WriteBatch,
    document::{DocumentSnapshot, Entity, EntityExt, to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    filter::{Filter, translate},
    query::Query,
    schema::{Schema, ValidationResult},
    store::{DocumentStore, SessionRef},
    write_result::{DeleteResult, UpdateResult},
};

/// The untyped part of a model: its name, collection and schema.
#[derive(Debug)]
pub struct ModelDefinition {
    name: String,
    collection_name: String,
    schema: Schema,
}

impl ModelDefinition {
    /// Binds `schema` to `name`. The collection name is the lower-cased name plus `s`.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        let collection_name = format!("{}s", name.to_lowercase());

        Self { name, collection_name, schema }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A typed handle for one collection.
///
/// Cloning is cheap; clones share the definition and the store session.
pub struct Model<E: Entity> {
    definition: Arc<ModelDefinition>,
    store: DocumentStore,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.definition.name)
            .field("collection_name", &self.definition.collection_name)
            .finish()
    }
}

impl<E: Entity> Model<E> {
    pub fn new(definition: Arc<ModelDefinition>, store: DocumentStore) -> Self {
        Self { definition, store, _entity: PhantomData }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn collection_name(&self) -> &str {
        self.definition.collection_name()
    }

    pub fn schema(&self) -> &Schema {
        self.definition.schema()
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    fn session(&self) -> DocumentStoreResult<SessionRef> {
        self.store.session()
    }

    fn hydrate(&self, snapshot: DocumentSnapshot) -> DocumentStoreResult<Document<E>> {
        Ok(Document {
            data: E::from_bson_document(snapshot.data)?,
            id: Some(snapshot.id),
            model: self.clone(),
        })
    }

    /// Validates `raw` against the model's schema without touching the store.
    pub fn validate(&self, raw: &bson::Document) -> ValidationResult {
        self.schema().validate(raw)
    }

    /// Wraps `data` in an unsaved instance. Call [`Document::save`] to persist it.
    pub fn new_document(&self, data: E) -> Document<E> {
        Document { data, id: None, model: self.clone() }
    }

    /// Validates `partial`, fills defaults, inserts it and returns the stored instance.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::Validation`] with every message when the input is invalid.
    /// Nothing is written in that case.
    pub async fn create<P: Serialize>(&self, partial: P) -> DocumentStoreResult<Document<E>> {
        let ValidationResult { valid, errors, validated } = self.validate(&to_document(&partial)?);

        if !valid {
            return Err(DocumentStoreError::Validation(errors));
        }

        let mut document = self.new_document(E::from_bson_document(validated)?);
        document.save().await?;

        Ok(document)
    }

    /// Returns the first document matching `filter`, or `None`.
    pub async fn find_one(&self, filter: impl Into<Filter>) -> DocumentStoreResult<Option<Document<E>>> {
        let query = translate(self.collection_name(), &filter.into()).limit(1);

        self.session()?
            .query_documents(&query)
            .await?
            .into_iter()
            .next()
            .map(|snapshot| self.hydrate(snapshot))
            .transpose()
    }

    /// Returns every document matching `filter`, in store order.
    pub async fn find(&self, filter: impl Into<Filter>) -> DocumentStoreResult<Vec<Document<E>>> {
        let query = translate(self.collection_name(), &filter.into());

        self.session()?
            .query_documents(&query)
            .await?
            .into_iter()
            .map(|snapshot| self.hydrate(snapshot))
            .collect()
    }

    /// Reads a document directly by identifier.
    pub async fn find_by_id(&self, id: Uuid) -> DocumentStoreResult<Option<Document<E>>> {
        self.session()?
            .get_document(self.collection_name(), id)
            .await?
            .map(|data| self.hydrate(DocumentSnapshot::new(id, data)))
            .transpose()
    }

    /// Deletes the document with identifier `id`.
    ///
    /// A missing document yields `deleted_count = 0`. Store failures are
    /// logged and reported as an unacknowledged result.
    pub async fn find_by_id_and_delete(&self, id: Uuid) -> DocumentStoreResult<DeleteResult> {
        let session = self.session()?;

        match session.delete_document(self.collection_name(), id).await {
            Ok(removed) => Ok(DeleteResult::acknowledged(usize::from(removed))),
            Err(err) => {
                log::error!("error deleting document {id} from {}: {err}", self.collection_name());
                Ok(DeleteResult::failed())
            }
        }
    }

    /// Deletes every document matching `filter` in one atomic batch.
    ///
    /// `deleted_count` is the size of the matched set.
    pub async fn delete_many(&self, filter: impl Into<Filter>) -> DocumentStoreResult<DeleteResult> {
        let session = self.session()?;
        let query = translate(self.collection_name(), &filter.into());
        let matched = session.query_documents(&query).await?;

        if matched.is_empty() {
            return Ok(DeleteResult::acknowledged(0));
        }

        let mut batch = WriteBatch::new();
        for snapshot in &matched {
            batch.delete(snapshot.id);
        }

        match session.commit_batch(self.collection_name(), batch).await {
            Ok(()) => Ok(DeleteResult::acknowledged(matched.len())),
            Err(err) => {
                log::error!("error deleting documents in batch from {}: {err}", self.collection_name());
                Ok(DeleteResult::failed())
            }
        }
    }

    /// Applies `update` to the first document matching `filter`.
    pub async fn update_one(
        &self,
        filter: impl Into<Filter>,
        update: impl Into<Update>,
    ) -> DocumentStoreResult<UpdateResult> {
        let query = translate(self.collection_name(), &filter.into()).limit(1);
        self.apply_update(&query, update.into()).await
    }

    /// Applies `update` to every document matching `filter` in one atomic batch.
    pub async fn update_many(
        &self,
        filter: impl Into<Filter>,
        update: impl Into<Update>,
    ) -> DocumentStoreResult<UpdateResult> {
        let query = translate(self.collection_name(), &filter.into());
        self.apply_update(&query, update.into()).await
    }

    async fn apply_update(&self, query: &Query, update: Update) -> DocumentStoreResult<UpdateResult> {
        let session = self.session()?;
        let matched = session.query_documents(query).await?;

        if matched.is_empty() {
            return Ok(UpdateResult::acknowledged(0));
        }

        let mut batch = WriteBatch::new();
        for snapshot in &matched {
            batch.update(snapshot.id, update.fields.clone());
        }

        match session.commit_batch(self.collection_name(), batch).await {
            Ok(()) => Ok(UpdateResult::acknowledged(matched.len())),
            Err(err) => {
                log::error!("error updating documents in batch in {}: {err}", self.collection_name());
                Ok(UpdateResult::failed(matched.len()))
            }
        }
    }
}

/// A field-level update applied to every matched document.
///
/// Nested documents are not merged; `{ "address": { "city": "X" } }` replaces
/// the whole `address` value, while `{ "address.city": "X" }` sets only the
/// nested `city` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    fields: bson::Document,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<bson::Bson>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Builds an update from any serializable map-like value.
    pub fn from_serialize<T: Serialize>(value: &T) -> DocumentStoreResult<Self> {
        Ok(Self { fields: to_document(value)? })
    }

    pub fn fields(&self) -> &bson::Document {
        &self.fields
    }
}

impl From<bson::Document> for Update {
    fn from(fields: bson::Document) -> Self {
        Self { fields }
    }
}

/// An entity instance bound to its model.
///
/// The identifier is `None` until the first [`Document::save`] and never
/// changes afterwards.
pub struct Document<E: Entity> {
    /// The entity's fields. Mutate freely, then call [`Document::save`].
    pub data: E,
    id: Option<Uuid>,
    model: Model<E>,
}

impl<E: Entity + fmt::Debug> fmt::Debug for Document<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("data", &self.data)
            .finish()
    }
}

impl<E: Entity> Clone for Document<E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            id: self.id,
            model: self.model.clone(),
        }
    }
}

impl<E: Entity> Document<E> {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn model(&self) -> &Model<E> {
        &self.model
    }

    pub fn into_data(self) -> E {
        self.data
    }

    /// Persists the instance.
    ///
    /// With an identifier the stored document is overwritten in full;
    /// without one a new document is inserted and its identifier captured.
    /// The data is not validated here.
    pub async fn save(&mut self) -> DocumentStoreResult<&mut Self> {
        let session = self.model.session()?;
        let collection = self.model.collection_name();
        let fields = self.data.to_bson_document()?;

        match self.id {
            Some(id) => session.set_document(collection, id, fields).await?,
            None => self.id = Some(session.insert_document(collection, fields).await?),
        }

        Ok(self)
    }

    /// Renders the instance as JSON with its identifier under `id`.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        let mut value = self.data.to_json()?;

        if let (Value::Object(map), Some(id)) = (&mut value, self.id) {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::doc;

    #[test]
    fn collection_name_is_pluralized_lowercase() {
        let definition = ModelDefinition::new("QueryUser", Schema::default());

        assert_eq!(definition.name(), "QueryUser");
        assert_eq!(definition.collection_name(), "queryusers");
    }

    #[tokio::test]
    async fn operations_fail_without_a_session() {
        let schema = Schema::builder().field("name", Field::string().required()).build();
        let users: Model<bson::Document> = Model::new(Arc::new(ModelDefinition::new("User", schema)), DocumentStore::new());

        assert!(matches!(users.find(doc! {}).await, Err(DocumentStoreError::NotConnected)));
        assert!(matches!(
            users.find_by_id_and_delete(Uuid::new()).await,
            Err(DocumentStoreError::NotConnected)
        ));
        assert!(matches!(
            users.new_document(doc! { "name": "A" }).save().await,
            Err(DocumentStoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_the_store() {
        let schema = Schema::builder().field("name", Field::string().required()).build();
        let users: Model<bson::Document> = Model::new(Arc::new(ModelDefinition::new("User", schema)), DocumentStore::new());

        let err = users.create(doc! { "email": "x" }).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: name is required.");
    }

    #[test]
    fn unsaved_documents_render_without_id() {
        let users: Model<bson::Document> = Model::new(Arc::new(ModelDefinition::new("User", Schema::default())), DocumentStore::new());
        let json = users.new_document(doc! { "name": "A" }).to_json().unwrap();

        assert_eq!(json, serde_json::json!({ "name": "A" }));
        assert_eq!(Update::new().set("age", 40).fields(), &doc! { "age": 40 });
    }
}
