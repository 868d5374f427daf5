//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server produces, per request:
//!     → logging.rs (access line, handler faults via Diagnostics)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Consumers:
//!     → stdout (tracing fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the tower layers and the access log span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_access};
pub use metrics::{init_metrics, record_request};
