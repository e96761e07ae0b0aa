//! Convenient re-exports of commonly used types from fairydm.
//!
//! ```ignore
//! use fairydm::prelude::*;
//! ```

pub use fairydm_core::{
    backend::{BatchWrite, StoreBackend, StoreBackendBuilder, WriteBatch},
    document::{DocumentSnapshot, Entity, EntityExt},
    error::{DocumentStoreError, DocumentStoreResult},
    filter::{Filter, Operator},
    model::{Document, Model, Update},
    query::{FieldPath, Query, QueryVisitor, WhereOp},
    registry::ModelRegistry,
    schema::{Field, FieldKind, Schema, ValidationResult},
    store::DocumentStore,
    write_result::{DeleteResult, UpdateResult},
};
