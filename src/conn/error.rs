//! Error types for request-context operations.

use thiserror::Error;

/// Errors surfaced synchronously by [`Conn`](crate::conn::Conn) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A response header name or value contains forbidden characters.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// A response body could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
