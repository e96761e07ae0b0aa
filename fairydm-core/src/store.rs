//! The shared store session handle.
//!
//! A [`DocumentStore`] is created once at startup, connected to a backend,
//! and cloned into every model. Clones share the same session, so
//! disconnecting through one clone disconnects all of them.
//!
//! # Example
//!
//! ```ignore
//! use fairydm::{store::DocumentStore, memory::InMemoryStore};
//!
//! let store = DocumentStore::new();
//! store.connect(InMemoryStore::builder()).await?;
//! let registry = ModelRegistry::new(store.clone());
//! // ...
//! store.disconnect().await?;
//! ```

use parking_lot::RwLock;
use std::sync::Arc;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
};

pub type SessionRef = Arc<dyn StoreBackend>;

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    session: Arc<RwLock<Option<SessionRef>>>,
}

impl DocumentStore {
    /// Creates a handle with no session. Every operation fails with
    /// [`DocumentStoreError::NotConnected`] until [`DocumentStore::connect`] is called.
    pub fn new() -> Self {
        Self { session: Arc::new(RwLock::new(None)) }
    }

    /// Creates a handle already connected to `backend`.
    pub fn with_backend<B: StoreBackend + 'static>(backend: B) -> Self {
        Self { session: Arc::new(RwLock::new(Some(Arc::new(backend)))) }
    }

    /// Builds a backend and installs it as the session.
    ///
    /// If a session is already open it is kept and the builder is not used.
    /// When two connects race, the first to finish wins and the other
    /// backend is shut down.
    pub async fn connect<B: StoreBackendBuilder>(&self, builder: B) -> DocumentStoreResult<()> {
        if self.is_connected() {
            log::debug!("document store already connected");
            return Ok(());
        }

        let backend = builder.build().await?;

        let surplus = {
            let mut session = self.session.write();
            if session.is_some() {
                Some(backend)
            } else {
                let backend: SessionRef = Arc::new(backend);
                *session = Some(backend);
                None
            }
        };

        if let Some(backend) = surplus {
            backend.shutdown().await?;
            log::debug!("document store connected concurrently, discarded extra backend");
            return Ok(());
        }

        log::info!("connected to document store");
        Ok(())
    }

    /// Closes the session and shuts the backend down. A no-op when not connected.
    pub async fn disconnect(&self) -> DocumentStoreResult<()> {
        let backend = self.session.write().take();

        if let Some(backend) = backend {
            backend.shutdown().await?;
            log::info!("disconnected from document store");
        }

        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.read().is_some()
    }

    /// Returns the open session.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NotConnected`] if no session has been established.
    pub fn session(&self) -> DocumentStoreResult<SessionRef> {
        self.session
            .read()
            .clone()
            .ok_or(DocumentStoreError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::WriteBatch, document::DocumentSnapshot, query::Query};
    use async_trait::async_trait;
    use bson::Uuid;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct NullBackend {
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StoreBackend for NullBackend {
        async fn insert_document(&self, _collection: &str, _document: bson::Document) -> DocumentStoreResult<Uuid> {
            Ok(Uuid::new())
        }

        async fn set_document(&self, _collection: &str, _id: Uuid, _document: bson::Document) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn get_document(&self, _collection: &str, _id: Uuid) -> DocumentStoreResult<Option<bson::Document>> {
            Ok(None)
        }

        async fn delete_document(&self, _collection: &str, _id: Uuid) -> DocumentStoreResult<bool> {
            Ok(false)
        }

        async fn query_documents(&self, _query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
            Ok(Vec::new())
        }

        async fn commit_batch(&self, _collection: &str, _batch: WriteBatch) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> DocumentStoreResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NullBuilder {
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StoreBackendBuilder for NullBuilder {
        type Backend = NullBackend;

        async fn build(self) -> DocumentStoreResult<NullBackend> {
            tokio::task::yield_now().await;
            Ok(NullBackend { shutdowns: self.shutdowns })
        }
    }

    #[test]
    fn unconnected_store_refuses_sessions() {
        let store = DocumentStore::new();

        assert!(!store.is_connected());
        assert!(matches!(store.session(), Err(DocumentStoreError::NotConnected)));
    }

    #[tokio::test]
    async fn concurrent_connects_keep_one_backend() {
        let store = DocumentStore::new();
        let shutdowns = Arc::new(AtomicUsize::new(0));

        let (first, second) = tokio::join!(
            store.connect(NullBuilder { shutdowns: shutdowns.clone() }),
            store.connect(NullBuilder { shutdowns: shutdowns.clone() }),
        );
        first.unwrap();
        second.unwrap();

        assert!(store.is_connected());
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        store.disconnect().await.unwrap();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
    }
}
