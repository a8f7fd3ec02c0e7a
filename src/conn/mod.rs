//! The per-request context ("conn") and its response lifecycle.

mod context;
mod env;
mod error;
mod files;
mod state;
mod template;

pub use context::Conn;
pub use env::{ConnEnv, Responder, Responders};
pub use error::Error;
pub use files::{mime_type, resolve_file};
pub use state::{PipelineControl, WriteState};
pub use template::{escape_html, Renderer};
