//! Error types for codemem-memory

use thiserror::Error;

/// Errors that can occur in the memory system
#[derive(Debug, Error)]
pub enum MemoryError {
    /// RocksDB error
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    /// Serialization error (bincode)
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UUID parsing error
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Object missing, or outside the requested scope
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Generated identifier already in use
    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    /// Tenant or project missing
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// A write attempted to move an object to another tenant/project
    #[error("Scope is immutable: {0}")]
    ScopeImmutable(String),

    /// Persistence I/O did not complete in time
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Field-level validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Builder error
    #[error("Builder error: {0}")]
    Builder(#[from] crate::node::ObjectBuilderError),

    /// Schema version problem
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl MemoryError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create an identity conflict error
    pub fn identity_conflict(id: impl Into<String>) -> Self {
        Self::IdentityConflict(id.into())
    }

    /// Create an invalid scope error
    pub fn invalid_scope(msg: impl Into<String>) -> Self {
        Self::InvalidScope(msg.into())
    }

    /// Create a store unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a migration error
    pub fn migration(msg: impl Into<String>) -> Self {
        Self::Migration(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the caller may retry the operation.
    ///
    /// Identity conflicts are retried with a fresh identifier; unavailability
    /// with backoff. The store itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::IdentityConflict(_))
    }
}

/// Result type for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
