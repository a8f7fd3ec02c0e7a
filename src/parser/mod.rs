//! HTTP/1.x request parsing.
//!
//! Just enough of a parser to feed the router: the request line, a
//! multi-valued header section and the raw body bytes that follow it.

mod error;
mod headers;
mod method;
mod request;
mod version;

// Re-export public items
pub use error::Error;
pub use headers::HeaderMap;
pub use method::Method;
pub use request::{find_head_end, parse_request, HttpRequest};
pub use version::HttpVersion;
