//! In-memory storage implementation for document stores.
//!
//! Documents live in per-collection ordered maps behind one async-aware
//! read-write lock. Queries scan a collection in insertion order.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use fairydm_core::{
    backend::{BatchWrite, StoreBackend, StoreBackendBuilder, WriteBatch},
    document::DocumentSnapshot,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::evaluator::DocumentEvaluator;

type CollectionMap = IndexMap<Uuid, bson::Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state.
/// Multiple clones of the same instance share the same underlying data.
///
/// Queries scan every document in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use fairydm_memory::InMemoryStore;
/// use fairydm::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_document("users", doc! { "name": "Alice", "age": 30 }).await?;
/// assert!(store.get_document("users", id).await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, IndexMap::len)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_document(&self, collection: &str, document: bson::Document) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, document);

        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: Uuid, document: bson::Document) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, document);

        Ok(())
    }

    async fn get_document(&self, collection: &str, id: Uuid) -> DocumentStoreResult<Option<bson::Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|collection_map| collection_map.get(&id))
            .cloned())
    }

    async fn delete_document(&self, collection: &str, id: Uuid) -> DocumentStoreResult<bool> {
        Ok(self
            .store
            .write()
            .await
            .get_mut(collection)
            .is_some_and(|collection_map| collection_map.shift_remove(&id).is_some()))
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let store = self.store.read().await;
        let collection_map = match store.get(&query.collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        DocumentEvaluator::filter_documents(collection_map.iter(), query)
    }

    async fn commit_batch(&self, collection: &str, batch: WriteBatch) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        // Final state per touched id; `None` means deleted. Nothing is written
        // until every write in the batch has been staged.
        let mut staged: HashMap<Uuid, Option<bson::Document>> = HashMap::new();
        for write in batch {
            match write {
                BatchWrite::Delete(id) => {
                    staged.insert(id, None);
                }
                BatchWrite::Update(id, fields) => {
                    let current = match staged.entry(id) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => entry.insert(collection_map.get(&id).cloned()),
                    };
                    let document = current.as_mut().ok_or_else(|| {
                        DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string())
                    })?;

                    for (path, value) in fields {
                        set_field(document, &path, value)?;
                    }
                }
            }
        }

        for (id, document) in staged {
            match document {
                Some(document) => {
                    collection_map.insert(id, document);
                }
                None => {
                    collection_map.shift_remove(&id);
                }
            }
        }

        Ok(())
    }
}

/// Sets `path` in `document`. A dotted path addresses a nested field and
/// creates missing intermediate documents; a plain key replaces the whole
/// top-level value.
fn set_field(document: &mut bson::Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, bson::Document::new());
    }

    match document.get_mut(head) {
        Some(Bson::Document(inner)) => set_field(inner, rest, value),
        _ => Err(DocumentStoreError::Commit(format!(
            "cannot set {path}: {head} is not a document"
        ))),
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use fairydm_core::query::WhereOp;

    #[tokio::test]
    async fn insert_assigns_fresh_identifiers() {
        let store = InMemoryStore::new();
        let first = store.insert_document("users", doc! { "name": "Alice" }).await.unwrap();
        let second = store.insert_document("users", doc! { "name": "Alice" }).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.count("users").await, 2);
        assert_eq!(
            store.get_document("users", first).await.unwrap(),
            Some(doc! { "name": "Alice" })
        );
    }

    #[tokio::test]
    async fn set_replaces_the_whole_document() {
        let store = InMemoryStore::new();
        let id = store.insert_document("users", doc! { "name": "Alice", "age": 30 }).await.unwrap();

        store.set_document("users", id, doc! { "name": "Alicia" }).await.unwrap();

        assert_eq!(
            store.get_document("users", id).await.unwrap(),
            Some(doc! { "name": "Alicia" })
        );
    }

    #[tokio::test]
    async fn deleting_a_missing_document_is_a_no_op() {
        let store = InMemoryStore::new();

        assert!(!store.delete_document("users", Uuid::new()).await.unwrap());
    }

    #[tokio::test]
    async fn queries_respect_limit_and_insertion_order() {
        let store = InMemoryStore::new();
        for age in [25, 30, 35] {
            store.insert_document("users", doc! { "age": age }).await.unwrap();
        }

        let query = Query::collection("users").and_where("age", WhereOp::Gte, 30);
        let all = store.query_documents(&query).await.unwrap();
        let first = store.query_documents(&query.limit(1)).await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].data, doc! { "age": 30 });
    }

    #[tokio::test]
    async fn batches_merge_updates_shallowly() {
        let store = InMemoryStore::new();
        let id = store
            .insert_document("users", doc! { "name": "Alice", "address": { "city": "A", "zip": "1" } })
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update(id, doc! { "address": { "city": "B" }, "age": 40 });
        store.commit_batch("users", batch).await.unwrap();

        assert_eq!(
            store.get_document("users", id).await.unwrap(),
            Some(doc! { "name": "Alice", "address": { "city": "B" }, "age": 40 })
        );
    }

    #[tokio::test]
    async fn dotted_update_keys_address_nested_fields() {
        let store = InMemoryStore::new();
        let id = store
            .insert_document("users", doc! { "name": "Alice", "address": { "city": "A", "zip": "1" } })
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update(id, doc! { "address.city": "B", "geo.lat": 1.5 });
        store.commit_batch("users", batch).await.unwrap();

        assert_eq!(
            store.get_document("users", id).await.unwrap(),
            Some(doc! { "name": "Alice", "address": { "city": "B", "zip": "1" }, "geo": { "lat": 1.5 } })
        );
    }

    #[tokio::test]
    async fn dotted_paths_through_scalars_fail_the_batch() {
        let store = InMemoryStore::new();
        let first = store.insert_document("users", doc! { "name": "Alice" }).await.unwrap();
        let second = store.insert_document("users", doc! { "name": "Bob" }).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .update(first, doc! { "age": 30 })
            .update(second, doc! { "name.first": "Bob" });
        let result = store.commit_batch("users", batch).await;

        assert!(matches!(result, Err(DocumentStoreError::Commit(_))));
        assert_eq!(store.get_document("users", first).await.unwrap(), Some(doc! { "name": "Alice" }));
    }

    #[tokio::test]
    async fn failed_batches_write_nothing() {
        let store = InMemoryStore::new();
        let id = store.insert_document("users", doc! { "name": "Alice" }).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(id).update(Uuid::new(), doc! { "name": "Ghost" });
        let result = store.commit_batch("users", batch).await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentNotFound(..))));
        assert!(store.get_document("users", id).await.unwrap().is_some());
    }
}
