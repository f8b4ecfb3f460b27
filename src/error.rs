//! Centralized error types for shelfdb
//!
//! Every failure the core can produce is a typed category here. The HTTP
//! layer maps categories to status codes; nothing below the boundary knows
//! about status codes or response bodies.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for shelfdb operations
#[derive(Error, Debug)]
pub enum ShelfDbError {
    /// The addressed library does not exist
    #[error("library {0} not found")]
    LibraryNotFound(Uuid),

    /// The addressed document does not exist in the library
    #[error("document {document_id} not found in library {library_id}")]
    DocumentNotFound {
        library_id: Uuid,
        document_id: Uuid,
    },

    /// The addressed chunk does not exist in the document
    #[error("chunk {chunk_id} not found in document {document_id}")]
    ChunkNotFound { document_id: Uuid, chunk_id: Uuid },

    /// No index metadata stored under this name
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// A search was dispatched to an index name with no live index attached
    #[error("no index named '{0}' is attached to this library")]
    IndexNotReady(String),

    /// Query vector length disagrees with the index's fixed dimension
    #[error("query has dimension {actual} but the index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index configuration rejected by the factory
    #[error("invalid index configuration: {0}")]
    ConfigInvalid(String),

    /// Payload-level validation failure
    #[error("validation error: {0}")]
    Validation(String),

    /// The embedding provider failed
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl ShelfDbError {
    /// Create a config error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }
}

/// Result type alias for shelfdb operations
pub type Result<T> = std::result::Result<T, ShelfDbError>;
