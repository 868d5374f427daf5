//! Request dispatch over the route table.
//!
//! # Data Flow
//! ```text
//! Input
//!     → engine.rs (global preflight, scan from cursor 0)
//!     → route handler(input, Next { cursor: i + 1 })
//!         → next.rs (resume the scan after the current route)
//!     → cors.rs (header pass, once, at the outermost call)
//!     → Output
//! ```

pub mod cors;
pub mod diagnostics;
pub mod engine;
pub mod handler;
pub mod next;

pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use engine::{DispatchEngine, Dispatched};
pub use handler::{handler, BoxFuture, BoxedHandler, Handler, HandlerResult, IntoHandlerResult};
pub use next::Next;
