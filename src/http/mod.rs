//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, fallback handler)
//!     → request.rs (request ID, parse into Input)
//!     → dispatch engine (route table scan)
//!     → response.rs (serialize Output, infer headers)
//!     → Send to client
//! ```

pub mod cookie;
pub mod input;
pub mod output;
pub mod request;
pub mod response;
pub mod server;

pub use self::cookie::{CookieError, SameSite, SetCookie};
pub use input::{Input, Params, Query, QueryValue, UploadedFile};
pub use output::{Body, Output, OutputError, OutputFile};
pub use request::{prepare_input, RequestError, UuidRequestId, X_REQUEST_ID};
pub use response::send_output;
pub use server::{Server, ServerError};
