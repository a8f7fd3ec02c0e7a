//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::conn::Conn;
use crate::parser::{find_head_end, parse_request};
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server driving a [`Router`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with the stock file routes, serving
    /// `config.public_dir`.
    pub fn new(config: ServerConfig) -> Self {
        let mut router = Router::with_defaults();
        router.set_public_dir(&config.public_dir);

        Self { config, router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register routes here before starting the server.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Resolve `host:port`, bind it and serve until Ctrl+C.
    pub async fn listen(mut self, host: &str, port: u16) -> Result<(), Error> {
        self.config.addr = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| Error::InternalError(format!("Could not resolve {host}:{port}")))?;

        self.start().await
    }

    /// Log the registered endpoints.
    fn display_server_info(router: &Router) {
        info!("Registered endpoints:");
        for (method, pattern) in router.routes().patterns() {
            let method = method.map_or("*", |m| m.as_str());
            info!("  {method} {pattern}");
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        router: Arc<Router>,
        config: Arc<ServerConfig>,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                if let Err(e) = socket.write_all(&response.to_bytes()).await {
                    warn!("Could not reject {addr}: {e}");
                }
                return;
            }
        };

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, &router, &config).await {
                warn!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown timed out with {len} connections still open", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    ///
    /// The router is frozen from here on; it is shared read-only by every
    /// connection task.
    pub async fn start(self) -> Result<(), Error> {
        Self::display_server_info(&self.router);

        let listener = self.setup_listener().await?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx, &mut tasks);

        let config = Arc::new(self.config);
        let router = Arc::new(self.router);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                router.clone(),
                                config.clone(),
                                &mut tasks,
                            ).await;
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Serve a single request on `socket`.
    ///
    /// Reads the request, dispatches it, reads any file the handler asked
    /// for, and writes the one committed response.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: &Router,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let raw = match Self::read_request(socket, config).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(()), // Connection closed
            Err(Error::PayloadTooLarge(limit)) => {
                let response = HttpResponse::new(StatusCode::PayloadTooLarge)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Request exceeds {limit} bytes"));
                Self::write_response(socket, response).await?;
                return Err(Error::PayloadTooLarge(limit));
            }
            Err(e) => return Err(e),
        };

        let request = match parse_request(&raw) {
            Ok(request) => request,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                Self::write_response(socket, response).await?;
                return Err(Error::ParseError(e));
            }
        };

        let mut conn = router.conn(request);
        router.dispatch(&mut conn);
        Self::complete_file(&mut conn).await;

        let response = conn.take_response().ok_or_else(|| {
            Error::InternalError(format!("No response committed for {}", conn.uri()))
        })?;

        Self::write_response(socket, response).await
    }

    /// Finish a deferred file response, if the handler started one.
    async fn complete_file(conn: &mut Conn) {
        let Some(path) = conn.pending_file().map(|path| path.to_path_buf()) else {
            return;
        };

        match tokio::fs::read(&path).await {
            Ok(contents) => conn.finish_file(contents),
            Err(e) => {
                warn!("Could not open {}: {e}", path.display());
                conn.fail_file();
            }
        }
    }

    /// Read one request: the head, then as many body bytes as
    /// `Content-Length` declares. `None` means the peer sent nothing.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut buf = Vec::with_capacity(config.read_buffer_size);
        let mut chunk = vec![0; config.read_buffer_size];

        loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if buf.len() > config.max_request_size {
                return Err(Error::PayloadTooLarge(config.max_request_size));
            }

            if let Some(head_end) = find_head_end(&buf) {
                let body_len = parse_request(&buf[..head_end])
                    .ok()
                    .and_then(|head| head.content_length())
                    .unwrap_or(0);

                if head_end.saturating_add(body_len) > config.max_request_size {
                    return Err(Error::PayloadTooLarge(config.max_request_size));
                }
                if buf.len() >= head_end + body_len {
                    buf.truncate(head_end + body_len);
                    break;
                }
            }
        }

        Ok(if buf.is_empty() { None } else { Some(buf) })
    }

    async fn write_response(
        socket: &mut (impl AsyncWrite + Unpin),
        mut response: HttpResponse,
    ) -> Result<(), Error> {
        response.headers.replace_or_add("Connection", "close");
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }
}
