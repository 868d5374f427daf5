//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit one access line per served request
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from `RUST_LOG`, falling back to the configured level
//! - Initialization is idempotent so tests and embedders can call it freely

use std::time::Duration;

use axum::http::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("switchyard={default_level},tower_http={default_level}"))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Access log line for a completed request.
pub fn log_access(method: &Method, path: &str, status: u16, elapsed: Duration) {
    tracing::info!(
        method = %method,
        status,
        path = %path,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "{} {} {}",
        method,
        status,
        path
    );
}
