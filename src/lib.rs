//! A small HTTP routing and request-lifecycle core.
//!
//! Routes are stored in a trie keyed by HTTP method. Each request gets a
//! [`Conn`] that carries its decoded parameters and the response being
//! built, and is written exactly once.
//!
//! # Features
//!
//! - Route patterns with literal, `#name` and `*name` (rest of path) segments
//! - Query strings and form bodies decoded with bracket nesting (`a[b][]=1`)
//! - Pipelines of pre-handler steps that can halt the chain
//! - `_method` override for POST forms
//! - Static files served from a public directory, with traversal checks
//! - A tokio transport for running it as a standalone server
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use sound_rs::{parse_request, Router, StatusCode};
//!
//! let mut router = Router::new();
//! router.get("/users/#id", |conn, params| {
//!     let id = params["id"].to_string();
//!     conn.text(StatusCode::Ok, format!("user {id}"));
//!     Ok(())
//! });
//!
//! let request = parse_request(b"GET /users/42 HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! let mut conn = router.conn(request);
//! router.dispatch(&mut conn);
//!
//! let response = conn.take_response().unwrap();
//! assert_eq!(response.status, StatusCode::Ok);
//! assert_eq!(response.body.as_deref(), Some(&b"user 42"[..]));
//! ```
//!
//! ## Query decoding
//!
//! ```
//! use sound_rs::{decode, ParamValue};
//!
//! let params = decode("tags[]=a&tags[]=b&user[name]=ann");
//! assert_eq!(params["tags"], ParamValue::Sequence(vec!["a".into(), "b".into()]));
//! assert_eq!(params["user"].get("name").and_then(ParamValue::as_str), Some("ann"));
//! ```
//!
//! ## Error handling
//!
//! ```
//! use sound_rs::{parse_request, ParserError};
//!
//! let invalid_request = b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//!
//! match parse_request(invalid_request) {
//!     Ok(_) => println!("Request parsed successfully"),
//!     Err(ParserError::InvalidMethod(method)) => println!("Invalid method: {}", method),
//!     Err(err) => println!("Other error: {}", err),
//! }
//! ```
//!
//! See the `demos` directory for a complete server.

pub mod conn;
pub mod params;
pub mod parser;
pub mod router;
pub mod server;

// Re-export commonly used items for convenience
pub use conn::{Conn, Error as ConnError, PipelineControl, WriteState};
pub use params::{decode, ParamMap, ParamValue, Params, PathSpec};
pub use parser::{parse_request, Error as ParserError, HeaderMap, HttpRequest, HttpVersion, Method};
pub use router::{pipe, Error as RouterError, HandlerResult, Pipeline, RouteTrie, Router};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
