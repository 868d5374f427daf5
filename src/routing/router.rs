//! Route registration and sub-router flattening.
//!
//! # Responsibilities
//! - Collect paths, targets and options for one registration call
//! - Normalize paths (`greet`, `/greet/` and `greet/` are all `/greet`)
//! - Flatten mounted routers into this router's table
//!
//! # Design Decisions
//! - Arguments are validated before anything is appended
//! - Mounting copies routes; there is no runtime indirection
//! - Mount-call options overlay each child route's own options
//! - Verb methods are generated from one list and all go through `register`

use serde_json::Value;
use thiserror::Error;

use crate::dispatch::{BoxedHandler, Handler};
use crate::routing::matcher::PatternError;
use crate::routing::options::RouteOptions;
use crate::routing::route::{Route, RouteTable};
use crate::routing::verb::{MethodSet, Verb};

/// Error type for route registration.
#[derive(Debug, Error)]
pub enum RouterError {
    /// An argument that is not a path, handler, router or options object.
    #[error("Invalid argument '{0}'")]
    InvalidArgument(&'static str),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// One registration argument.
pub enum Arg {
    Path(String),
    Handler(BoxedHandler),
    Mount(Router),
    Options(RouteOptions),
    /// A dynamic value of a kind registration does not accept.
    Unsupported(&'static str),
}

impl Arg {
    /// Wrap a handler closure.
    pub fn handler<H: Handler>(handler: H) -> Self {
        Arg::Handler(crate::dispatch::handler(handler))
    }
}

impl From<&str> for Arg {
    fn from(path: &str) -> Self {
        Arg::Path(path.to_string())
    }
}

impl From<String> for Arg {
    fn from(path: String) -> Self {
        Arg::Path(path)
    }
}

impl From<BoxedHandler> for Arg {
    fn from(handler: BoxedHandler) -> Self {
        Arg::Handler(handler)
    }
}

impl From<Router> for Arg {
    fn from(router: Router) -> Self {
        Arg::Mount(router)
    }
}

impl From<&Router> for Arg {
    fn from(router: &Router) -> Self {
        Arg::Mount(router.clone())
    }
}

impl From<RouteOptions> for Arg {
    fn from(options: RouteOptions) -> Self {
        Arg::Options(options)
    }
}

/// Dynamic arguments: strings are paths, objects are options (unknown keys
/// become `meta`), anything else is rejected at registration. An object whose
/// `cors` is not a boolean is rejected too.
impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(path) => Arg::Path(path),
            Value::Object(map) => match serde_json::from_value(Value::Object(map)) {
                Ok(options) => Arg::Options(options),
                Err(_) => Arg::Unsupported("object"),
            },
            Value::Null => Arg::Unsupported("null"),
            Value::Bool(_) => Arg::Unsupported("boolean"),
            Value::Number(_) => Arg::Unsupported("number"),
            Value::Array(_) => Arg::Unsupported("array"),
        }
    }
}

/// Build a `Vec<Arg>` from paths, handlers, routers and options.
///
/// ```ignore
/// router.get(args!["/users/:id", handler(show_user), RouteOptions::cors()])?;
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::routing::IntoArg::into_arg($arg)),*]
    };
}

/// Conversion used by [`args!`]. Handler closures go through
/// [`handler`](crate::dispatch::handler) first.
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Arg {
        Arg::from(self)
    }
}

impl IntoArg for String {
    fn into_arg(self) -> Arg {
        Arg::from(self)
    }
}

impl IntoArg for BoxedHandler {
    fn into_arg(self) -> Arg {
        Arg::Handler(self)
    }
}

impl IntoArg for Router {
    fn into_arg(self) -> Arg {
        Arg::Mount(self)
    }
}

impl IntoArg for &Router {
    fn into_arg(self) -> Arg {
        Arg::from(self)
    }
}

impl IntoArg for RouteOptions {
    fn into_arg(self) -> Arg {
        Arg::Options(self)
    }
}

impl IntoArg for Value {
    fn into_arg(self) -> Arg {
        Arg::from(self)
    }
}

/// What a path is bound to.
pub enum Target {
    Leaf(BoxedHandler),
    Mounted(Router),
}

/// Ordered route registry.
#[derive(Clone, Default, Debug)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered routes, in dispatch order.
    pub fn routes(&self) -> &[Route] {
        self.table.as_slice()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn into_table(self) -> RouteTable {
        self.table
    }

    /// Register `args` for `methods`.
    ///
    /// Paths, targets and options are collected in order; options merge with
    /// last write winning. With no path the route is registered at `/`.
    pub fn register<I>(&mut self, methods: MethodSet, args: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = Arg>,
    {
        let mut paths = Vec::new();
        let mut targets = Vec::new();
        let mut options = RouteOptions::default();

        for arg in args {
            match arg {
                Arg::Path(path) => paths.push(path),
                Arg::Handler(handler) => targets.push(Target::Leaf(handler)),
                Arg::Mount(router) => targets.push(Target::Mounted(router)),
                Arg::Options(more) => options.merge(&more),
                Arg::Unsupported(kind) => return Err(RouterError::InvalidArgument(kind)),
            }
        }

        if paths.is_empty() {
            paths.push("/".to_string());
        }

        self.add_routes(&methods, &paths, &targets, &options)?;
        Ok(self)
    }

    /// Append one route per (path, target) pair, flattening mounted routers.
    ///
    /// Nothing is appended unless every route compiles.
    pub fn add_routes(
        &mut self,
        methods: &MethodSet,
        paths: &[String],
        targets: &[Target],
        options: &RouteOptions,
    ) -> Result<(), RouterError> {
        let mut staged = Vec::new();

        for path in paths {
            for target in targets {
                match target {
                    Target::Leaf(handler) => {
                        staged.push(Route::new(methods.clone(), path, handler.clone(), options.clone())?);
                    }
                    Target::Mounted(router) => {
                        staged.extend(router.table.mounted(path, methods, options)?);
                    }
                }
            }
        }

        tracing::debug!(
            added = staged.len(),
            total = self.table.len() + staged.len(),
            "Routes registered"
        );
        self.table.extend(staged);
        Ok(())
    }

    /// Register with an empty method set: any verb, and the path also
    /// matches every descendant path. Used for middleware and sub-routers.
    pub fn mount<I>(&mut self, args: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = Arg>,
    {
        self.register(MethodSet::any(), args)
    }
}

macro_rules! verb_methods {
    ($($name:ident => $verb:ident),* $(,)?) => {
        impl Router {
            $(
                #[doc = concat!("Register routes for the `", stringify!($name), "` verb token.")]
                pub fn $name<I>(&mut self, args: I) -> Result<&mut Self, RouterError>
                where
                    I: IntoIterator<Item = Arg>,
                {
                    self.register(MethodSet::from(Verb::$verb), args)
                }
            )*
        }
    };
}

verb_methods! {
    get => Get,
    head => Head,
    post => Post,
    put => Put,
    delete => Delete,
    connect => Connect,
    options => Options,
    trace => Trace,
    patch => Patch,
    all => All,
}
