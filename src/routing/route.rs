//! Route records and the ordered route table.
//!
//! # Responsibilities
//! - Hold one registered (methods, path, handler, options) entry
//! - Compile the matcher list for a route path
//! - Copy routes under a mount prefix with a fresh matcher set
//!
//! # Design Decisions
//! - Insertion order is dispatch priority; the table never reorders
//! - Prefix routes (registered with no verbs) get a second `path/*` matcher
//! - The prefix flag survives mounting, so mounted middleware keeps
//!   covering descendant paths

use std::fmt;
use std::ops::Index;

use crate::dispatch::BoxedHandler;
use crate::routing::matcher::{Params, PathMatcher, PatternError};
use crate::routing::options::RouteOptions;
use crate::routing::path;
use crate::routing::verb::MethodSet;

/// One registered route with its compiled matchers.
#[derive(Clone)]
pub struct Route {
    methods: MethodSet,
    path: String,
    matchers: Vec<PathMatcher>,
    handler: BoxedHandler,
    options: RouteOptions,
    prefix: bool,
}

impl Route {
    /// Build a route. `path` is normalized; an empty method set makes it a
    /// prefix route.
    pub fn new(
        methods: MethodSet,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
    ) -> Result<Self, PatternError> {
        let prefix = methods.is_empty();
        let path = path::normalize(path);
        let matchers = compile_matchers(&path, prefix)?;

        Ok(Self {
            methods,
            path,
            matchers,
            handler,
            options,
            prefix,
        })
    }

    /// Copy of this route mounted under `prefix`.
    pub fn mounted(
        &self,
        prefix: &str,
        methods: &MethodSet,
        options: &RouteOptions,
    ) -> Result<Self, PatternError> {
        let path = path::join(prefix, &self.path);
        let matchers = compile_matchers(&path, self.prefix)?;

        Ok(Self {
            methods: self.methods.union(methods),
            path,
            matchers,
            handler: self.handler.clone(),
            options: self.options.overlaid(options),
            prefix: self.prefix,
        })
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn matchers(&self) -> &[PathMatcher] {
        &self.matchers
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// True for routes registered through `mount` (no verbs).
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Try each matcher in order; the first success wins.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        self.matchers.iter().find_map(|matcher| matcher.matches(path))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn compile_matchers(path: &str, prefix: bool) -> Result<Vec<PathMatcher>, PatternError> {
    let mut matchers = vec![PathMatcher::compile(path)?];
    if prefix {
        matchers.push(PathMatcher::compile(&path::join(path, "*"))?);
    }
    Ok(matchers)
}

/// Ordered sequence of routes.
#[derive(Clone, Default, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn extend(&mut self, routes: impl IntoIterator<Item = Route>) {
        self.routes.extend(routes);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn as_slice(&self) -> &[Route] {
        &self.routes
    }

    /// Every route of `self` copied under `prefix`, in order.
    pub fn mounted(
        &self,
        prefix: &str,
        methods: &MethodSet,
        options: &RouteOptions,
    ) -> Result<Vec<Route>, PatternError> {
        self.routes
            .iter()
            .map(|route| route.mounted(prefix, methods, options))
            .collect()
    }
}

impl Index<usize> for RouteTable {
    type Output = Route;

    fn index(&self, index: usize) -> &Route {
        &self.routes[index]
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{handler, Next};
    use crate::http::{Input, Output};
    use crate::routing::verb::Verb;

    fn noop() -> BoxedHandler {
        handler(|_: Input, _: Next| async { Output::text("ok") })
    }

    #[test]
    fn test_exact_route_has_one_matcher() {
        let route = Route::new(Verb::Get.into(), "about/", noop(), RouteOptions::new()).unwrap();
        assert_eq!(route.path(), "/about");
        assert_eq!(route.matchers().len(), 1);
        assert!(route.match_path("/about").is_some());
        assert!(route.match_path("/about/team").is_none());
    }

    #[test]
    fn test_prefix_route_matches_descendants() {
        let route = Route::new(MethodSet::any(), "/api", noop(), RouteOptions::new()).unwrap();
        assert!(route.is_prefix());
        assert_eq!(route.matchers().len(), 2);
        assert_eq!(route.matchers()[1].pattern(), "/api/*");
        assert!(route.match_path("/api").is_some());
        assert!(route.match_path("/api/v1/users").is_some());
        assert!(route.match_path("/apis").is_none());
    }

    #[test]
    fn test_primary_matcher_tried_first() {
        let route = Route::new(MethodSet::any(), "/users/:id", noop(), RouteOptions::new()).unwrap();

        let exact = route.match_path("/users/7").unwrap();
        assert_eq!(exact.get("id"), Some("7"));
        assert_eq!(exact.get("*"), None);

        let nested = route.match_path("/users/7/posts").unwrap();
        assert_eq!(nested.get("*"), Some("posts"));
    }

    #[test]
    fn test_mounted_keeps_prefix_flag() {
        let route = Route::new(MethodSet::any(), "/", noop(), RouteOptions::cors()).unwrap();
        let mounted = route
            .mounted("/sub", &Verb::Get.into(), &RouteOptions::new())
            .unwrap();

        assert_eq!(mounted.path(), "/sub");
        assert!(mounted.is_prefix());
        assert!(mounted.methods().contains(Verb::Get));
        assert!(mounted.options().cors_enabled());
        assert!(mounted.match_path("/sub/anything").is_some());
    }
}
