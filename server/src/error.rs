//! Error types for the CodeMem server.

use codemem_memory::MemoryError;
use thiserror::Error;

use crate::rpc::protocol::JsonRpcError;

/// Errors that can occur in the CodeMem server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid identifier: {0}")]
    Uuid(#[from] uuid::Error),
}

impl ServerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::UnsupportedLanguage(_) => "unsupported_language",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Json(_) => "invalid_json",
            ServerError::Uuid(_) => "invalid_id",
            ServerError::Io(_) => "io",
            ServerError::Watch(_) => "watch",
            ServerError::Memory(err) => match err {
                MemoryError::NotFound(_) => "not_found",
                MemoryError::IdentityConflict(_) => "identity_conflict",
                MemoryError::InvalidScope(_) => "invalid_scope",
                MemoryError::ScopeImmutable(_) => "scope_immutable",
                MemoryError::StoreUnavailable(_) => "store_unavailable",
                MemoryError::Validation(_) | MemoryError::Builder(_) => "validation",
                _ => "internal",
            },
        }
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.code(),
            "unsupported_language"
                | "invalid_request"
                | "invalid_json"
                | "invalid_id"
                | "not_found"
                | "invalid_scope"
                | "scope_immutable"
                | "validation"
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Memory(err) if err.is_retryable())
    }
}

impl From<ServerError> for JsonRpcError {
    fn from(err: ServerError) -> Self {
        let data = serde_json::json!({
            "kind": err.code(),
            "retryable": err.is_retryable(),
        });
        let base = if err.is_caller_error() {
            JsonRpcError::invalid_params(err.to_string())
        } else {
            JsonRpcError::internal_error(err.to_string())
        };
        base.with_data(data)
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
