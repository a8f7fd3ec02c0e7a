//! Route registration, lookup and dispatch.

mod dispatcher;
mod error;
mod handler;
mod trie;
mod tests;

pub use dispatcher::{Pipeline, Router};
pub use error::Error;
pub use handler::{pipe, Handler, HandlerResult, Pipe, Route};
pub use trie::{RouteMatch, RouteTrie};
