//! MongoDB backend implementation for fairydm.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Store identifiers are kept in `_id`, queries are translated into MongoDB
//! filter documents, and write batches run inside a multi-document transaction
//! (which requires a replica set or sharded cluster).
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fairydm = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fairydm::{store::DocumentStore, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new();
//!     store.connect(MongoDbStore::builder("mongodb://localhost:27017", "my_database")).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as fairydm_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
