//! Edgesub Server - HTTP surface.
//!
//! ## Endpoints
//!
//! - `GET /{credential}/sub` - Aggregate and render a subscription
//! - `GET /test` - Probe the latency of one host
//! - `POST /batch-test` - Probe many hosts with bounded concurrency
//!
//! CORS is open on every route.
//!
//! ## Example
//!
//! ```no_run
//! use edgesub_server::{AppState, Server, ServerConfig};
//! use edgesub_sources::{build_source_set, Prober, SourcesConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sources = build_source_set(&SourcesConfig::default()).unwrap();
//!     let state = AppState::new(sources, Prober::new().unwrap());
//!     let server = Server::new(ServerConfig::default(), state).unwrap();
//!     server.run(std::future::pending()).await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use handlers::{native_endpoint, NO_STORE};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0).
    pub host: String,
    /// Port to bind to (default: 8787).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/{credential}/sub", get(handlers::subscription))
        .route("/test", get(handlers::probe_one))
        .route("/batch-test", post(handlers::probe_batch))
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(state)
}

/// The HTTP server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server with the given configuration and state.
    pub fn new(config: ServerConfig, state: AppState) -> std::result::Result<Self, ServerError> {
        let addr = format_addr(&config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self {
            router: router(state),
            addr,
        })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> std::result::Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting edgesub server on {}", self.addr);

        // SO_REUSEADDR lets a restart bind while old sockets linger in TIME_WAIT
        let socket = Socket::new(Domain::for_address(self.addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        info!("Server stopped");
        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn format_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
