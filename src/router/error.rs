//! Error types for routing and handlers.

use thiserror::Error;

use crate::conn::Error as ConnError;
use crate::parser::Method;

/// Errors produced while routing a request or running its handler.
///
/// The dispatcher never propagates these: they become the not-found and
/// server-error responses.
#[derive(Debug, Error)]
pub enum Error {
    /// No registered route matches the request.
    #[error("No route for {method} {path}")]
    NotFound { method: Method, path: String },

    /// A handler gave up on the request.
    #[error("Handler failure: {0}")]
    HandlerFailure(String),

    /// A context operation inside a handler failed.
    #[error(transparent)]
    Conn(#[from] ConnError),

    /// I/O performed by a handler failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
