//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     router.get(args![path, handler, options])
//!     → router.rs (collect args, normalize paths, flatten mounts)
//!     → matcher.rs (compile path patterns)
//!     → route.rs (append Route to the ordered RouteTable)
//!
//! Dispatch (see `dispatch`):
//!     RouteTable frozen in an Arc
//!     → scanned in insertion order
//!     → Route::match_path fills Input::params
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable once serving starts
//! - No regex in the hot path (segment walk only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod options;
pub mod path;
pub mod route;
pub mod router;
pub mod verb;

pub use matcher::{MatchOptions, Params, PathMatcher, PatternError, WILDCARD_PARAM};
pub use options::RouteOptions;
pub use route::{Route, RouteTable};
pub use router::{Arg, IntoArg, Router, RouterError, Target};
pub use verb::{MethodSet, Verb};
