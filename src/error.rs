//! Error types for the caching engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Mnemo Error Enum ==
/// Unified error type for the caching engine and its admin surface.
///
/// Cache misses and eviction never produce an error. Only malformed
/// configuration or malformed object shapes do, synchronously, at the call
/// that triggered them.
#[derive(Error, Debug)]
pub enum MnemoError {
    /// Invalid or contradictory cache parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A declared id or condition field could not be read from an object
    #[error("Cannot resolve field '{field}': {reason}")]
    FieldResolution { field: String, reason: String },

    /// Update keys drawn from different sources without an explicit order
    #[error("Ambiguous key order: {0}")]
    AmbiguousKeyOrder(String),

    /// Store or pool bookkeeping disagreed with itself
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    /// The underlying computation failed
    #[error("Invocation of '{method}' failed: {source}")]
    Invocation {
        method: String,
        #[source]
        source: anyhow::Error,
    },

    /// Named cache does not exist (admin API only, updates skip silently)
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    /// Invalid admin request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl MnemoError {
    /// Shorthand for a field resolution failure.
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MnemoError::FieldResolution {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MnemoError {
    fn into_response(self) -> Response {
        let status = match &self {
            MnemoError::CacheNotFound(_) => StatusCode::NOT_FOUND,
            MnemoError::Configuration(_)
            | MnemoError::InvalidRequest(_)
            | MnemoError::FieldResolution { .. }
            | MnemoError::AmbiguousKeyOrder(_) => StatusCode::BAD_REQUEST,
            MnemoError::InternalInvariant(_) | MnemoError::Invocation { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, MnemoError>;
