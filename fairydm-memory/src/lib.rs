//! In-memory document storage backend for fairydm.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Store-faithful queries** - Every `where` operator, dotted paths and document-id conditions
//! - **Atomic batches** - Preconditions are checked before any write in a batch is applied
//!
//! # Quick Start
//!
//! ```ignore
//! use fairydm::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new();
//!     store.connect(InMemoryStore::builder()).await?;
//!
//!     let registry = ModelRegistry::new(store);
//!     let users: Model<bson::Document> = registry.register("User", Schema::default());
//!     users.create(doc! { "name": "Alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as fairydm_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
