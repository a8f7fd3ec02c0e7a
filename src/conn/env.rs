//! Shared, read-only settings every request context can reach.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conn::context::Conn;
use crate::conn::template::Renderer;
use crate::server::StatusCode;

/// A response producer that fills in the context's response.
pub type Responder = Arc<dyn Fn(&mut Conn) + Send + Sync>;

/// The replaceable fallback responses.
#[derive(Clone)]
pub struct Responders {
    /// Runs when no route matches or a file cannot be served.
    pub not_found: Responder,
    /// Runs when a handler fails or a response has no body.
    pub server_error: Responder,
}

impl Default for Responders {
    fn default() -> Self {
        Self {
            not_found: Arc::new(|conn: &mut Conn| conn.text(StatusCode::NotFound, "404 - Not Found.")),
            server_error: Arc::new(|conn: &mut Conn| {
                conn.text(StatusCode::InternalServerError, "500 - Server Error.")
            }),
        }
    }
}

/// Settings shared by all contexts created from one router.
#[derive(Clone)]
pub struct ConnEnv {
    pub responders: Responders,
    /// Absolute directory that safe file responses must stay inside.
    pub public_dir: PathBuf,
    pub renderer: Option<Arc<dyn Renderer>>,
}

impl ConnEnv {
    /// Settings serving files from `public_dir`.
    ///
    /// A relative directory is anchored at the current working directory.
    pub fn new(public_dir: impl AsRef<Path>) -> Self {
        Self {
            responders: Responders::default(),
            public_dir: absolute(public_dir.as_ref()),
            renderer: None,
        }
    }
}

impl Default for ConnEnv {
    fn default() -> Self {
        Self::new("public")
    }
}

fn absolute(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir.to_path_buf(),
    }
}
