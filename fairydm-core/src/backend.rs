//! Storage backend abstraction for the document mapper.
//!
//! This module defines the traits a schemaless document store implements so
//! that models can persist and query through it. The mapper never talks to a
//! database directly; it only calls [`StoreBackend`].
//!
//! # Overview
//!
//! - [`StoreBackend`]: single-document writes, reads, queries and atomic batches
//! - [`StoreBackendBuilder`]: factory used by [`crate::store::DocumentStore::connect`]
//! - [`WriteBatch`]: a group of writes committed all-or-nothing
//!
//! # Examples
//!
//! ```ignore
//! use fairydm::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let id = backend.insert_document("users", doc! { "name": "Alice" }).await?;
//! let stored = backend.get_document("users", id).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Uuid;
use std::fmt::Debug;

use crate::{document::DocumentSnapshot, error::DocumentStoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations are shared by every model through one handle and must
/// support concurrent calls from multiple async tasks.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Read failures are surfaced to callers as-is. Failures from
/// [`StoreBackend::commit_batch`] are caught by the model layer.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a new document and returns the identifier the store assigned to it.
    ///
    /// Not idempotent: each successful call creates a new document.
    async fn insert_document(
        &self,
        collection: &str,
        document: bson::Document,
    ) -> DocumentStoreResult<Uuid>;

    /// Writes `document` at `id`, replacing whatever was stored there.
    ///
    /// Creates the document if it does not exist. Concurrent writers to the
    /// same id are last-writer-wins.
    async fn set_document(
        &self,
        collection: &str,
        id: Uuid,
        document: bson::Document,
    ) -> DocumentStoreResult<()>;

    /// Reads a single document by identifier. `Ok(None)` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        id: Uuid,
    ) -> DocumentStoreResult<Option<bson::Document>>;

    /// Deletes a single document by identifier.
    ///
    /// Deleting a missing document is a no-op. Returns whether a document was removed.
    async fn delete_document(&self, collection: &str, id: Uuid) -> DocumentStoreResult<bool>;

    /// Runs a query and returns every matching document with its identifier.
    ///
    /// Result order is backend-defined.
    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>>;

    /// Applies every write in `batch` atomically.
    ///
    /// Either all writes are applied or none are. An update targeting a
    /// document that does not exist fails the whole batch.
    async fn commit_batch(&self, collection: &str, batch: WriteBatch) -> DocumentStoreResult<()>;

    /// Releases connections and other resources held by the backend.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Factory trait for constructing store backends.
///
/// Builders carry the connection configuration; building them is the
/// `connect` step of a store's lifecycle.
#[async_trait]
pub trait StoreBackendBuilder: Send {
    type Backend: StoreBackend + 'static;

    /// Builds and returns a new backend instance.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`](crate::error::DocumentStoreError::Initialization)
    /// if the backend cannot be reached or configured.
    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Remove the document. Missing documents are skipped.
    Delete(Uuid),
    /// Set each given field on the existing document. A dotted key such as
    /// `address.city` addresses a nested field; a plain key replaces the
    /// whole top-level value.
    Update(Uuid, bson::Document),
}

/// An ordered group of writes committed as one indivisible unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    pub fn delete(&mut self, id: Uuid) -> &mut Self {
        self.writes.push(BatchWrite::Delete(id));
        self
    }

    pub fn update(&mut self, id: Uuid, fields: bson::Document) -> &mut Self {
        self.writes.push(BatchWrite::Update(id, fields));
        self
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchWrite;
    type IntoIter = std::vec::IntoIter<BatchWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}
