//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use log::{info, warn, error};

use crate::parser::{parse_request, Method};
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The router. Read-only once the server is built.
    pub router: Arc<Router>,
}

impl HttpServer {
    /// Create a new HTTP server that dispatches to `router`.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Log the registered routes.
    fn display_server_info(&self) {
        info!("Registered routes:");
        for route in self.router.routes().iter() {
            let methods = route.methods();
            let methods = if methods.is_empty() {
                "ANY".to_string()
            } else {
                methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
            };
            info!("  {methods} {}", route.pattern().as_str());
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Spawn a task that signals shutdown on Ctrl+C.
    fn watch_ctrl_c(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Cannot listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received, draining connections");
            let _ = shutdown_tx.send(()).await;
        });
    }

    /// Serve an accepted socket on its own task, or turn it away with `503`
    /// when every connection slot is taken.
    async fn spawn_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        slots: &Arc<Semaphore>,
        router: &Arc<Router>,
        read_buffer_size: usize,
        tasks: &mut JoinSet<()>,
    ) {
        let Ok(permit) = Arc::clone(slots).try_acquire_owned() else {
            warn!("Connection limit reached, rejecting {addr}");
            let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                .with_content_type("text/plain")
                .with_body_string("Server is at capacity, please try again later");
            let _ = socket.write_all(&response.to_bytes()).await;
            return;
        };

        let router = Arc::clone(router);
        tasks.spawn(async move {
            // Held until the connection is done
            let _permit = permit;
            if let Err(e) = Self::handle_connection(&mut socket, router, read_buffer_size).await {
                error!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Log an accept failure. Returns `true` if the listener is unusable.
    async fn accept_failed(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            return true;
        }
        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
        false
    }

    /// Wait for in-flight connections, up to [`DRAIN_TIMEOUT`].
    async fn drain(tasks: &mut JoinSet<()>) {
        info!("Waiting for {} active connections to complete...", tasks.len());
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Connection task failed during shutdown: {e}");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Shutdown timed out with {} connections still open", tasks.len());
        }
        info!("Server shutdown complete");
    }

    /// Bind, then serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();
        let listener = self.setup_listener().await?;

        let slots = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();
        // Keep a sender here so a failed Ctrl+C watcher cannot close the channel
        Self::watch_ctrl_c(shutdown_tx.clone(), &mut tasks);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, addr)) => {
                        Self::spawn_connection(
                            socket,
                            addr,
                            &slots,
                            &self.router,
                            self.config.read_buffer_size,
                            &mut tasks,
                        ).await;
                    }
                    Err(e) => {
                        if Self::accept_failed(e).await {
                            error!("Listener failed, shutting down");
                            break;
                        }
                    }
                },
            }
        }

        Self::drain(&mut tasks).await;
        Ok(())
    }

    /// Handle a single connection.
    ///
    /// Reads one request, dispatches it through the router, and writes the
    /// response. A dispatch error is answered with `500` and returned.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: Arc<Router>,
        read_buffer_size: usize,
    ) -> Result<(), Error> {
        let mut buf = vec![0; read_buffer_size];
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let request = match parse_request(&buf[..n]) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::ParseError(e));
            }
        };

        let method = request.method;
        let path = request.path.clone();

        let mut response = match router.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Handler failed for {method} {path}: {e}");
                let response = HttpResponse::new(StatusCode::InternalServerError)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Internal server error: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(e);
            }
        };

        // HEAD keeps the headers, Content-Length included, but sends no body
        if method == Method::HEAD {
            response.body.clear();
        }

        info!("{method} {path} -> {}", response.status.as_u16());
        socket.write_all(&response.to_bytes()).await?;
        Ok(())
    }
}
