//! A lightweight document mapper that enforces schemas over schemaless document stores.
//!
//! This crate is the core of the fairydm project and provides:
//!
//! - **Schemas** ([`schema`]) - Field descriptors and recursive validation with defaults
//! - **Filter DSL** ([`filter`]) - Operator-map filters and their translation to store queries
//! - **Native queries** ([`query`]) - The `where` chains store backends execute
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Store session** ([`store`]) - The shared connection handle
//! - **Models** ([`model`]) - Typed CRUD over one collection
//! - **Registry** ([`registry`]) - One canonical model per name
//! - **Error handling** ([`error`]) and write outcomes ([`write_result`])
//!
//! # Example
//!
//! ```ignore
//! use fairydm::prelude::*;
//! use bson::doc;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//!     pub role: String,
//! }
//!
//! let schema = Schema::builder()
//!     .field("name", Field::string().required())
//!     .field("email", Field::string().required())
//!     .field("role", Field::string().default_value("user"))
//!     .build();
//!
//! let users: Model<User> = registry.register("User", schema);
//! let alice = users.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//! assert_eq!(alice.data.role, "user");
//! ```

#[allow(unused_extern_crates)]
extern crate self as fairydm_core;

pub mod backend;
pub mod document;
pub mod error;
pub mod filter;
pub mod model;
pub mod query;
pub mod registry;
pub mod schema;
pub mod store;
pub mod write_result;
