//! The router: registration API and request dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::conn::{mime_type, Conn, ConnEnv, Renderer};
use crate::params::{ParamValue, Params, PathSpec};
use crate::parser::{HttpRequest, Method};
use crate::router::error::Error;
use crate::router::handler::{HandlerResult, Pipe, Route};
use crate::router::trie::{RouteMatch, RouteTrie};
use crate::server::StatusCode;

/// Routes plus the settings handed to every request context.
///
/// Register everything up front; dispatch only needs `&self`, so a frozen
/// router can be shared across connection tasks.
pub struct Router {
    routes: RouteTrie,
    env: Arc<ConnEnv>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// A router with no routes, serving files from `./public`.
    pub fn new() -> Self {
        Self {
            routes: RouteTrie::new(),
            env: Arc::new(ConnEnv::default()),
        }
    }

    /// A router with the stock file routes: `/static/*file`,
    /// `/favicon.ico` and `/robots.txt`, all read from the public directory.
    pub fn with_defaults() -> Self {
        let mut router = Self::new();

        router.file("/static", Vec::new());
        router.get("/favicon.ico", |conn, _| {
            conn.add_header("Content-Type", "image/x-icon")?;
            conn.send_file(StatusCode::Ok, "favicon.ico", true);
            Ok(())
        });
        router.get("/robots.txt", |conn, _| {
            conn.add_header("Content-Type", "text/plain; charset=utf-8")?;
            conn.send_file(StatusCode::Ok, "robots.txt", true);
            Ok(())
        });

        router
    }

    pub fn get<F>(&mut self, route: &str, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::GET, route, Vec::new(), handler);
    }

    pub fn post<F>(&mut self, route: &str, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::POST, route, Vec::new(), handler);
    }

    pub fn put<F>(&mut self, route: &str, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::PUT, route, Vec::new(), handler);
    }

    pub fn patch<F>(&mut self, route: &str, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::PATCH, route, Vec::new(), handler);
    }

    pub fn delete<F>(&mut self, route: &str, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::DELETE, route, Vec::new(), handler);
    }

    /// Register `handler` for `method` at `route`, behind `pipes`.
    ///
    /// In `route`, a `#name` segment captures one path segment and a
    /// `*name` segment captures the rest of the path.
    pub fn register<F>(&mut self, method: Method, route: &str, pipes: Vec<Pipe>, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(Some(method), route, pipes, handler);
    }

    /// Register on the default trie, used for any method that has no routes
    /// of its own.
    pub fn any<F>(&mut self, route: &str, pipes: Vec<Pipe>, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(None, route, pipes, handler);
    }

    /// Serve the public directory under `route` (as `route/*file`).
    pub fn file(&mut self, route: &str, pipes: Vec<Pipe>) {
        let pattern = format!("{}/*file", route.trim_end_matches('/'));
        self.register(Method::GET, &pattern, pipes, serve_static);
    }

    /// Start a group of routes sharing `pipes`.
    pub fn pipeline(&mut self, pipes: Vec<Pipe>) -> Pipeline<'_> {
        Pipeline { router: self, pipes }
    }

    fn insert<F>(&mut self, method: Option<Method>, route: &str, pipes: Vec<Pipe>, handler: F)
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        let route_entry = Route {
            pipes,
            handler: Arc::new(handler),
        };
        self.routes.insert(method, &PathSpec::parse(route, true), route_entry);
    }

    /// Replace the response used when nothing matches.
    pub fn set_not_found<F>(&mut self, responder: F)
    where
        F: Fn(&mut Conn) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.env).responders.not_found = Arc::new(responder);
    }

    /// Replace the response used when a handler fails.
    pub fn set_server_error<F>(&mut self, responder: F)
    where
        F: Fn(&mut Conn) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.env).responders.server_error = Arc::new(responder);
    }

    pub fn set_public_dir(&mut self, dir: impl AsRef<Path>) {
        let public_dir: PathBuf = ConnEnv::new(dir).public_dir;
        Arc::make_mut(&mut self.env).public_dir = public_dir;
    }

    pub fn set_renderer(&mut self, renderer: impl Renderer + 'static) {
        Arc::make_mut(&mut self.env).renderer = Some(Arc::new(renderer));
    }

    pub fn routes(&self) -> &RouteTrie {
        &self.routes
    }

    /// Build the context for a parsed request.
    pub fn conn(&self, request: HttpRequest) -> Conn {
        Conn::from_request(request, self.env.clone())
    }

    /// Find the route for a method and request path.
    pub fn find(&self, method: Method, path: &PathSpec) -> Result<RouteMatch<'_>, Error> {
        self.routes.lookup(method, path).ok_or_else(|| Error::NotFound {
            method,
            path: path
                .segments()
                .iter()
                .map(|segment| segment.text())
                .collect::<Vec<_>>()
                .join("/"),
        })
    }

    /// Route one request to a single response write.
    ///
    /// On a match the path parameters are installed, the pipeline runs until
    /// a step halts, and the handler runs regardless. Handler errors become
    /// the server-error response and a miss becomes the not-found response.
    /// Responders, the public directory and the renderer come from this
    /// router, whichever router built `conn`. The write is always attempted
    /// exactly once; a context left busy by a file response is completed
    /// later by the transport.
    pub fn dispatch(&self, conn: &mut Conn) {
        conn.set_env(self.env.clone());
        let method = conn.method();

        match self.find(method, conn.path()) {
            Ok(RouteMatch { route, params }) => {
                conn.path_params = params;

                for pipe in &route.pipes {
                    if conn.is_halted() {
                        break;
                    }
                    pipe(conn);
                }

                let params = conn.params();
                if let Err(e) = (route.handler)(conn, &params) {
                    warn!("{method} {uri} failed: {e}", uri = conn.uri());
                    conn.server_error();
                }
            }
            Err(e) => {
                debug!("{e}");
                conn.not_found();
            }
        }

        info!("{method} {uri} - {status}", uri = conn.uri(), status = conn.status().as_u16());
        conn.write_resp(false);
    }
}

/// Routes registered through a pipeline all run its pipes first.
pub struct Pipeline<'a> {
    router: &'a mut Router,
    pipes: Vec<Pipe>,
}

impl Pipeline<'_> {
    pub fn get<F>(&mut self, route: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::GET, route, handler)
    }

    pub fn post<F>(&mut self, route: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::POST, route, handler)
    }

    pub fn register<F>(&mut self, method: Method, route: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Conn, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.register(method, route, self.pipes.clone(), handler);
        self
    }
}

fn serve_static(conn: &mut Conn, params: &Params) -> HandlerResult {
    let file = params
        .get("file")
        .and_then(ParamValue::as_str)
        .unwrap_or_default()
        .to_string();

    conn.add_header("Content-Type", mime_type(Path::new(&file)))?;
    conn.send_file(StatusCode::Ok, &file, true);
    Ok(())
}
