//! A small tokio transport around the router.
//!
//! One request is read per connection, dispatched, any deferred file is
//! read from disk, and the single committed response is written before the
//! connection closes.

mod config;
mod error;
mod http_server;
mod response;

// Re-export public items
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
pub use response::{HttpResponse, StatusCode};
