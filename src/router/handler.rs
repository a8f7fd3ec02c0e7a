//! Route handlers and the steps that run before them.

use std::sync::Arc;

use crate::conn::Conn;
use crate::params::Params;
use crate::router::error::Error;

/// What a handler returns. An error turns into the server-error response.
pub type HandlerResult = Result<(), Error>;

/// A route handler. Receives the merged parameter view of the request.
pub type Handler = Arc<dyn Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync>;

/// A pre-handler step. May inspect or change the context and may call
/// [`Conn::halt`] to skip the remaining steps.
pub type Pipe = Arc<dyn Fn(&mut Conn) + Send + Sync>;

/// Box a closure as a [`Pipe`].
pub fn pipe<F>(step: F) -> Pipe
where
    F: Fn(&mut Conn) + Send + Sync + 'static,
{
    Arc::new(step)
}

/// A registered route: its pipeline and its handler.
#[derive(Clone)]
pub struct Route {
    /// Steps run in order before the handler.
    pub pipes: Vec<Pipe>,
    /// The handler function.
    pub handler: Handler,
}
