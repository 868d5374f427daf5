//! Ordered first-match dispatch with continuation semantics.
//!
//! # Responsibilities
//! - Scan the route table from a cursor, in registration order
//! - Answer CORS preflights for CORS-enabled routes
//! - Filter by method, then by path, then invoke the handler with a `Next`
//! - Apply the CORS header pass once, at the outermost call, for every
//!   CORS-enabled route the chain passed through
//! - Recover handler errors and panics as 500 outputs
//!
//! # Design Decisions
//! - The continuation is an explicit cursor into an `Arc<RouteTable>`
//! - Each step is a boxed future, so deep chains grow on the heap
//! - No-match is `Ok(None)`, never an error
//! - No timeout of its own; a handler that never resolves stays pending

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::Method;
use futures_util::FutureExt;

use crate::dispatch::cors;
use crate::dispatch::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::dispatch::handler::BoxFuture;
use crate::dispatch::Next;
use crate::http::{Input, Output};
use crate::routing::{RouteTable, Router};

/// A dispatch result with the route that produced it.
#[derive(Debug)]
pub struct Dispatched {
    /// Index of the outermost route whose handler ran (or that answered a
    /// preflight).
    pub route_index: usize,
    /// True if any route whose handler ran in this chain has CORS enabled.
    pub cors: bool,
    pub output: Output,
}

/// Dispatch `input` against `table`, starting at `cursor`.
///
/// `chain_cors` is shared by every step of one request and records whether
/// any matched route asked for CORS.
pub(crate) fn dispatch_from(
    table: Arc<RouteTable>,
    cursor: usize,
    mut input: Input,
    chain_cors: Arc<AtomicBool>,
) -> BoxFuture<'static, anyhow::Result<Option<Dispatched>>> {
    Box::pin(async move {
        for index in cursor..table.len() {
            let route = &table[index];
            let cors = route.options().cors_enabled();

            // preflight skips both filters
            if cors && input.method == Method::OPTIONS {
                chain_cors.store(true, Ordering::Relaxed);
                return Ok(Some(Dispatched {
                    route_index: index,
                    cors,
                    output: cors::preflight(),
                }));
            }

            if !route.methods().allows(&input.method) {
                continue;
            }

            let Some(params) = route.match_path(&input.path) else {
                continue;
            };
            input.params = params;

            tracing::trace!(route = index, pattern = %route.path(), "Route matched");

            if cors {
                chain_cors.store(true, Ordering::Relaxed);
            }

            let handler = route.handler().clone();
            let next = Next::new(table.clone(), index + 1, chain_cors.clone());
            let output = handler.call(input, next).await?;

            return Ok(Some(Dispatched {
                route_index: index,
                cors: chain_cors.load(Ordering::Relaxed),
                output,
            }));
        }

        Ok(None)
    })
}

/// Runs requests against a frozen route table.
#[derive(Clone)]
pub struct DispatchEngine {
    table: Arc<RouteTable>,
    cors: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl DispatchEngine {
    pub fn new(table: impl Into<Arc<RouteTable>>) -> Self {
        Self {
            table: table.into(),
            cors: false,
            diagnostics: Arc::new(TracingDiagnostics::default()),
        }
    }

    pub fn from_router(router: Router) -> Self {
        Self::new(router.into_table())
    }

    /// Global CORS: every response gets the wildcard headers and every
    /// `OPTIONS` request is answered as a preflight.
    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn cors(&self) -> bool {
        self.cors
    }

    /// Raw dispatch: no CORS pass, errors propagate.
    pub async fn dispatch(&self, input: Input) -> anyhow::Result<Option<Dispatched>> {
        dispatch_from(self.table.clone(), 0, input, Arc::default()).await
    }

    /// Boundary dispatch: always yields an `Output`.
    ///
    /// No match gives an empty output (404 at the serializer). Errors and
    /// panics are reported to the diagnostics sink and become error outputs.
    pub async fn handle(&self, input: Input) -> Output {
        if self.cors && input.method == Method::OPTIONS {
            return cors::preflight();
        }

        match AssertUnwindSafe(self.dispatch(input)).catch_unwind().await {
            Ok(Ok(Some(dispatched))) => {
                cors::post_route(dispatched.output, self.cors || dispatched.cors)
            }
            Ok(Ok(None)) => cors::post_route(Output::default(), self.cors),
            Ok(Err(err)) => {
                self.diagnostics.report(&err);
                cors::post_route(Output::from_error(&err), self.cors)
            }
            Err(panic) => {
                let err = anyhow::anyhow!(panic_message(panic.as_ref()));
                self.diagnostics.report(&err);
                cors::post_route(Output::from_error(&err), self.cors)
            }
        }
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("routes", &self.table.len())
            .field("cors", &self.cors)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::dispatch::{handler, BoxedHandler, HandlerResult};
    use crate::http::Body;
    use crate::routing::RouteOptions;
    use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn text(body: &'static str) -> BoxedHandler {
        handler(move |_: Input, _: Next| async move { Output::text(body) })
    }

    fn counting(counter: Arc<AtomicUsize>, body: &'static str) -> BoxedHandler {
        handler(move |_: Input, _: Next| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Output::text(body) }
        })
    }

    fn get(path: &str) -> Input {
        Input::new(Method::GET, path)
    }

    #[derive(Default)]
    struct RecordingDiagnostics {
        messages: Mutex<Vec<String>>,
    }

    impl Diagnostics for RecordingDiagnostics {
        fn report(&self, err: &anyhow::Error) {
            self.messages.lock().unwrap().push(err.to_string());
        }
    }

    #[tokio::test]
    async fn test_lowest_matching_index_wins() {
        let skipped = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        router.post(args!["/", counting(skipped.clone(), "post")]).unwrap();
        router.get(args!["/other", counting(skipped.clone(), "other")]).unwrap();
        router.get(args!["/", text("first")]).unwrap();
        router.get(args!["/", text("second")]).unwrap();

        let engine = DispatchEngine::from_router(router);
        let dispatched = engine.dispatch(get("/")).await.unwrap().unwrap();

        assert_eq!(dispatched.route_index, 2);
        assert_eq!(dispatched.output.body_text(), Some("first"));
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_method_routing() {
        let mut router = Router::new();
        router
            .post(args!["/", handler(|_: Input, _: Next| async {
                Output::text("ok post").with_status(401)
            })])
            .unwrap();
        router.get(args!["/", text("ok")]).unwrap();

        let engine = DispatchEngine::from_router(router);

        let output = engine.handle(get("/")).await;
        assert_eq!(output.body_text(), Some("ok"));

        let output = engine.handle(Input::new(Method::POST, "/")).await;
        assert_eq!(output.status, Some(401));
        assert_eq!(output.body_text(), Some("ok post"));
    }

    #[tokio::test]
    async fn test_wrapping_handler_sees_inner_output() {
        let mut router = Router::new();
        router
            .get(args!["/", handler(|input: Input, next: Next| async move {
                let inner = next.run(input).await?;
                let body = format!("parent {}", inner.body_text().unwrap_or_default());
                HandlerResult::Ok(Output::text(body).with_status(200))
            })])
            .unwrap();
        router.get(args!["/", text("child")]).unwrap();

        let output = DispatchEngine::from_router(router).handle(get("/")).await;
        assert_eq!(output.status, Some(200));
        assert_eq!(output.body_text(), Some("parent child"));
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let layer = |name: &'static str, log: Arc<Mutex<Vec<String>>>| {
            handler(move |input: Input, next: Next| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{name} in"));
                    let output = next.run(input).await;
                    log.lock().unwrap().push(format!("{name} out"));
                    output
                }
            })
        };

        let mut router = Router::new();
        router.mount(args![layer("outer", log.clone())]).unwrap();
        router.mount(args![layer("inner", log.clone())]).unwrap();
        router.get(args!["/deep/path", text("leaf")]).unwrap();

        let output = DispatchEngine::from_router(router).handle(get("/deep/path")).await;
        assert_eq!(output.body_text(), Some("leaf"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer in", "inner in", "inner out", "outer out"]
        );
    }

    #[tokio::test]
    async fn test_no_match() {
        let mut router = Router::new();
        router.get(args!["/only", text("only")]).unwrap();
        let engine = DispatchEngine::from_router(router);

        assert!(engine.dispatch(get("/hello")).await.unwrap().is_none());
        assert!(engine.handle(get("/hello")).await.is_empty());
        assert!(engine.handle(Input::new(Method::DELETE, "/only")).await.is_empty());
    }

    #[tokio::test]
    async fn test_next_without_more_routes() {
        let mut router = Router::new();
        router
            .get(args![handler(|input: Input, next: Next| async move {
                let rest = next.dispatch(input).await?;
                HandlerResult::Ok(Output::text(if rest.is_none() { "end" } else { "more" }))
            })])
            .unwrap();

        let output = DispatchEngine::from_router(router).handle(get("/")).await;
        assert_eq!(output.body_text(), Some("end"));
    }

    #[tokio::test]
    async fn test_error_becomes_error_output() {
        async fn fails(_: Input, _: Next) -> HandlerResult {
            anyhow::bail!("Something wrong")
        }

        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let mut router = Router::new();
        router.get(args![handler(fails)]).unwrap();
        router.get(args!["/ok", text("ok")]).unwrap();

        let engine = DispatchEngine::from_router(router).with_diagnostics(diagnostics.clone());

        let output = engine.handle(get("/")).await;
        assert!(matches!(output.body, Some(Body::Error(ref m)) if m == "Something wrong"));
        assert_eq!(*diagnostics.messages.lock().unwrap(), vec!["Something wrong"]);

        let output = engine.handle(get("/ok")).await;
        assert_eq!(output.body_text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_panic_is_recovered() {
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let mut router = Router::new();
        router
            .get(args![handler(|_: Input, _: Next| async {
                if true {
                    panic!("boom");
                }
                Output::new()
            })])
            .unwrap();

        let engine = DispatchEngine::from_router(router).with_diagnostics(diagnostics.clone());
        let output = engine.handle(get("/")).await;

        assert!(matches!(output.body, Some(Body::Error(ref m)) if m == "boom"));
        assert_eq!(diagnostics.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_params_are_replaced_per_match() {
        let mut router = Router::new();
        router
            .mount(args!["/users", handler(|input: Input, next: Next| async move {
                assert_eq!(input.param("*"), Some("7"));
                next.run(input).await
            })])
            .unwrap();
        router
            .get(args!["/users/:id", handler(|input: Input, _: Next| async move {
                let seen: Vec<String> = input.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                Output::text(seen.join(","))
            })])
            .unwrap();

        let output = DispatchEngine::from_router(router).handle(get("/users/7")).await;
        assert_eq!(output.body_text(), Some("id=7"));
    }

    #[derive(Clone)]
    struct Prefix(String);

    #[tokio::test]
    async fn test_mutations_flow_downstream() {
        let mut sub = Router::new();
        sub.mount(args![handler(|mut input: Input, next: Next| async move {
            let mut prefix = input
                .extensions
                .get::<Prefix>()
                .map(|p| p.0.clone())
                .unwrap_or_default();
            prefix.push('2');
            input.extensions.insert(Prefix(prefix));
            next.run(input).await
        })])
        .unwrap();
        sub.get(args!["/ok", handler(|input: Input, _: Next| async move {
            let prefix = input.extensions.get::<Prefix>().map(|p| p.0.clone()).unwrap_or_default();
            Output::text(format!("{prefix} ok"))
        })])
        .unwrap();
        sub.post(args!["/ok", handler(|input: Input, _: Next| async move {
            let prefix = input.extensions.get::<Prefix>().map(|p| p.0.clone()).unwrap_or_default();
            Output::text(format!("{prefix} not ok"))
        })])
        .unwrap();

        let mut router = Router::new();
        router.mount(args![&sub]).unwrap();
        router
            .mount(args![
                "/sub-route",
                handler(|mut input: Input, next: Next| async move {
                    input.extensions.insert(Prefix("1 ".to_string()));
                    next.run(input).await
                }),
                &sub,
            ])
            .unwrap();

        let engine = DispatchEngine::from_router(router);

        let output = engine.handle(get("/ok")).await;
        assert_eq!(output.body_text(), Some("2 ok"));

        let output = engine.handle(get("/sub-route/ok")).await;
        assert_eq!(output.body_text(), Some("1 2 ok"));

        let output = engine.handle(Input::new(Method::POST, "/sub-route/ok")).await;
        assert_eq!(output.body_text(), Some("1 2 not ok"));
    }

    #[tokio::test]
    async fn test_all_token_needs_exact_path() {
        let mut router = Router::new();
        router.all(args!["/about", text("About me")]).unwrap();
        let engine = DispatchEngine::from_router(router);

        assert_eq!(engine.handle(Input::new(Method::PUT, "/about/")).await.body_text(), Some("About me"));
        assert!(engine.handle(get("/about/team")).await.is_empty());
    }

    #[tokio::test]
    async fn test_route_cors_preflight() {
        let mut router = Router::new();
        router.get(args!["/hi", text("plain")]).unwrap();
        router.get(args!["/hi", text("ok"), RouteOptions::cors()]).unwrap();
        router.get(args!["/hello", text("hello")]).unwrap();
        let engine = DispatchEngine::from_router(router);

        let preflight = engine.handle(Input::new(Method::OPTIONS, "/hi")).await;
        assert_eq!(preflight.status, Some(204));
        assert_eq!(preflight.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        // first match is the plain route, so no CORS headers
        let plain = engine.handle(get("/hi")).await;
        assert_eq!(plain.body_text(), Some("plain"));
        assert!(plain.headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let hello = engine.handle(get("/hello")).await;
        assert!(hello.headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

    }

    #[tokio::test]
    async fn test_route_preflight_ignores_path() {
        let mut router = Router::new();
        router.get(args!["/hi", text("ok"), RouteOptions::cors()]).unwrap();
        let engine = DispatchEngine::from_router(router);

        let preflight = engine.handle(Input::new(Method::OPTIONS, "/hello")).await;
        assert_eq!(preflight.status, Some(204));
        assert_eq!(preflight.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let plain = DispatchEngine::new(RouteTable::new())
            .handle(Input::new(Method::OPTIONS, "/hello"))
            .await;
        assert!(plain.is_empty());
    }

    #[tokio::test]
    async fn test_route_cors_headers() {
        let mut router = Router::new();
        router.get(args!["/hi", text("ok"), RouteOptions::cors()]).unwrap();
        let engine = DispatchEngine::from_router(router);

        let output = engine.handle(get("/hi")).await;
        assert_eq!(output.body_text(), Some("ok"));
        assert_eq!(output.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_route_cors_behind_middleware() {
        let mut router = Router::new();
        router
            .mount(args![handler(|input: Input, next: Next| async move {
                next.run(input).await
            })])
            .unwrap();
        router
            .mount(args![handler(|input: Input, next: Next| async move {
                let inner = next.run(input).await?;
                let body = format!("wrapped {}", inner.body_text().unwrap_or_default());
                HandlerResult::Ok(Output::text(body))
            })])
            .unwrap();
        router.get(args!["/hi", text("ok"), RouteOptions::cors()]).unwrap();
        router.get(args!["/plain", text("plain")]).unwrap();
        let engine = DispatchEngine::from_router(router);

        let dispatched = engine.dispatch(get("/hi")).await.unwrap().unwrap();
        assert_eq!(dispatched.route_index, 0);
        assert!(dispatched.cors);

        let output = engine.handle(get("/hi")).await;
        assert_eq!(output.body_text(), Some("wrapped ok"));
        assert_eq!(output.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let output = engine.handle(get("/plain")).await;
        assert_eq!(output.body_text(), Some("wrapped plain"));
        assert!(output.headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_global_cors() {
        let engine = DispatchEngine::new(RouteTable::new()).with_cors(true);

        let output = engine.handle(get("/hello")).await;
        assert!(output.is_empty());
        assert_eq!(output.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let preflight = engine.handle(Input::new(Method::OPTIONS, "/hello")).await;
        assert_eq!(preflight.status, Some(204));
        assert_eq!(preflight.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_pending_handler_stays_pending() {
        let mut router = Router::new();
        router
            .get(args!["/never-end", handler(|_: Input, _: Next| std::future::pending::<Output>())])
            .unwrap();
        router.get(args!["/ok", text("ok")]).unwrap();
        let engine = DispatchEngine::from_router(router);

        let pending = tokio::time::timeout(Duration::from_millis(50), engine.handle(get("/never-end"))).await;
        assert!(pending.is_err());

        assert_eq!(engine.handle(get("/ok")).await.body_text(), Some("ok"));
    }
}
