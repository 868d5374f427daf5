//! Ordered route table and middleware dispatch over HTTP.
//!
//! Routes are registered on a [`Router`] with one method per verb, matched in
//! registration order, and run as an onion: each handler receives the
//! request and a [`Next`] continuation it may call to run the rest of the
//! table.
//!
//! ```ignore
//! use switchyard::{args, handler, Input, Next, Output, Server, ServerConfig};
//!
//! let mut server = Server::new(ServerConfig::default());
//! server.router_mut().get(args!["/hello/:name", handler(|input: Input, _: Next| async move {
//!     Output::text(format!("hello {}", input.param("name").unwrap_or("you")))
//! })])?;
//! server.start().await?;
//! ```

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use dispatch::{handler, DispatchEngine, HandlerResult, Next};
pub use http::{Input, Output, OutputFile, Server, ServerError};
pub use lifecycle::Shutdown;
pub use routing::{RouteOptions, Router, RouterError};
