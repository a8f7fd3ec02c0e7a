//! Parameter extraction: request paths, and the nested values decoded from
//! query strings and form bodies.

mod path;
mod query;
mod value;
mod tests;

pub use path::{PathSegment, PathSpec};
pub use query::decode;
pub use value::{ParamMap, ParamValue, Params};
