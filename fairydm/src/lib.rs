//! Main fairydm crate providing a unified interface for schema-validated documents.
//!
//! This crate is the primary entry point for users of fairydm. It re-exports
//! the core types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Schemas with defaults** - Declare field types, required fields and default values
//! - **Operator-map filters** - `{ "age": { "$gte": 30 } }` style queries translated to store queries
//! - **Soft-failure batch writes** - Bulk deletes and updates report commit failures in their results
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use fairydm::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//!     pub age: Option<i32>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new();
//!     store.connect(InMemoryStore::builder()).await?;
//!
//!     let registry = ModelRegistry::new(store.clone());
//!     let users: Model<User> = registry.register(
//!         "User",
//!         Schema::builder()
//!             .field("name", Field::string().required())
//!             .field("email", Field::string().required())
//!             .field("age", Field::number())
//!             .build(),
//!     );
//!
//!     let mut alice = users
//!         .create(doc! { "name": "Alice", "email": "alice@example.com", "age": 30 })
//!         .await?;
//!     alice.data.age = Some(31);
//!     alice.save().await?;
//!
//!     let over_thirty = users.find(doc! { "age": { "$gt": 30 } }).await?;
//!     println!("{:?}", over_thirty);
//!
//!     let result = users.update_many(doc! {}, doc! { "verified": true }).await?;
//!     assert!(result.acknowledged);
//!
//!     store.disconnect().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use fairydm_core::{
    backend, document, error, filter, model, query, registry, schema, store, write_result,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use fairydm_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use fairydm_mongodb::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
}
