//! Error types and result types for document mapping operations.
//!
//! Validation and connection errors are fatal to the caller. Batch commit
//! failures are caught by the model layer and reported through
//! [`crate::write_result`] values instead of being returned as errors.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when mapping documents to a store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Input failed schema validation. Holds every message collected in one pass.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    /// An operation was attempted before a store session was established.
    #[error("Not connected to a document store. Call connect() first.")]
    NotConnected,
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The value handed to the store is not a document or has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// An atomic batch of writes could not be committed.
    #[error("Commit error: {0}")]
    Commit(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns the individual validation messages, if this is a validation error.
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            DocumentStoreError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
