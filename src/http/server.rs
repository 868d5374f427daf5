//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum app that feeds every request to the dispatch engine
//! - Wire up middleware (tracing, request ID, optional timeout)
//! - Bind the listener, serve in the background, stop gracefully
//! - Log and count every served request
//!
//! # Design Decisions
//! - Routes are snapshotted into an `Arc<RouteTable>` at `start`; routes
//!   registered later take effect on the next start
//! - `start` and `stop` are idempotent
//! - The app has a single fallback handler; all routing is ours

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::dispatch::{DispatchEngine, Diagnostics, TracingDiagnostics};
use crate::http::request::{prepare_input, UuidRequestId};
use crate::http::response::send_output;
use crate::http::{Input, Output};
use crate::lifecycle::Shutdown;
use crate::observability::{log_access, record_request};
use crate::routing::Router;

/// Error type for the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// State injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    engine: DispatchEngine,
    max_body_bytes: usize,
}

struct Running {
    local_addr: SocketAddr,
    engine: DispatchEngine,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

/// A route table served over HTTP.
pub struct Server {
    config: ServerConfig,
    router: Router,
    diagnostics: Arc<dyn Diagnostics>,
    running: Option<Running>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let diagnostics = Arc::new(TracingDiagnostics::new(config.debug));
        Self {
            config,
            router: Router::new(),
            diagnostics,
            running: None,
        }
    }

    /// Serve an existing router.
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Replace the sink that receives handler faults.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The route registry. Changes apply from the next `start`.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bound socket address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// `http://host:port`, with the bound port once running.
    pub fn address(&self) -> String {
        let port = self
            .local_addr()
            .map_or(self.config.listener.port, |addr| addr.port());
        format!("http://{}:{}", self.config.listener.host, port)
    }

    /// Bind and start serving in the background.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let address = self.config.listener.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let engine = self.engine();
        let app = self.build_app(engine.clone());
        let shutdown = Shutdown::new();
        let signal = shutdown.wait();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        tracing::info!(
            name = %self.config.name,
            address = %local_addr,
            routes = engine.table().len(),
            "Server started"
        );

        self.running = Some(Running {
            local_addr,
            engine,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stop accepting, let in-flight requests finish, and wait for the
    /// serve task. No-op when not running.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.shutdown.trigger();
        running.task.await??;

        tracing::info!(name = %self.config.name, "Server stopped");
        Ok(())
    }

    /// Dispatch an `Input` in-process, without the HTTP layer.
    pub async fn handle(&self, input: Input) -> Output {
        match &self.running {
            Some(running) => running.engine.handle(input).await,
            None => self.engine().handle(input).await,
        }
    }

    /// The Axum app over a snapshot of the current routes.
    pub fn app(&self) -> axum::Router {
        self.build_app(self.engine())
    }

    fn engine(&self) -> DispatchEngine {
        DispatchEngine::new(self.router.table().clone())
            .with_cors(self.config.cors)
            .with_diagnostics(self.diagnostics.clone())
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(&self, engine: DispatchEngine) -> axum::Router {
        let state = AppState {
            engine,
            max_body_bytes: self.config.limits.max_body_bytes,
        };

        let app = axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state);

        let app = match self.config.timeouts.request_secs {
            Some(secs) => app.layer(TimeoutLayer::new(Duration::from_secs(secs))),
            None => app,
        };

        app.layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.trigger();
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.config.name)
            .field("routes", &self.router.routes().len())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

/// Single entry point for every request.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let output = match prepare_input(request, state.max_body_bytes).await {
        Ok(input) => state.engine.handle(input).await,
        Err(err) => {
            tracing::warn!(method = %method, path = %path, error = %err, "Rejected request");
            Output::text(err.to_string()).with_status(err.status().as_u16())
        }
    };

    let response = send_output(output).await;
    let status = response.status().as_u16();
    log_access(&method, &path, status, start.elapsed());
    record_request(method.as_str(), status, start.elapsed());
    response
}
