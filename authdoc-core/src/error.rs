//! Error types and result types for adapter operations.
//!
//! Every public operation of the adapter and every store backend returns
//! [`AdapterResult<T>`]. Store failures are surfaced unchanged to the caller; the
//! adapter never retries or substitutes a default value.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when the adapter talks to a store.
///
/// A request that matches nothing is not an error: update returns `None` and delete
/// is a no-op. The variants below cover serialization, store setup, malformed
/// predicates and backend failures.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The document has an invalid structure (for example, it is not a mapping).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A predicate, operator or identifier value cannot be executed.
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),
    /// A transaction could not commit because data it read was changed concurrently.
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for adapter and store operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<BsonError> for AdapterError {
    fn from(err: BsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for AdapterError {
    fn from(err: SerdeJsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}
