//! Handler abstraction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dispatch::Next;
use crate::http::{Input, Output};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler resolves to. Errors become a 500 at the dispatch boundary.
pub type HandlerResult = anyhow::Result<Output>;

/// A route handler or middleware.
///
/// Implemented for every `Fn(Input, Next) -> impl Future` whose output is an
/// [`Output`] or a [`HandlerResult`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, input: Input, next: Next) -> BoxFuture<'static, HandlerResult>;
}

/// Shared handler, as stored in a route.
pub type BoxedHandler = Arc<dyn Handler>;

/// Conversion of a handler's return value into a [`HandlerResult`].
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for Output {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoHandlerResult for HandlerResult {
    fn into_handler_result(self) -> HandlerResult {
        self
    }
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Input, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult,
{
    fn call(&self, input: Input, next: Next) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(input, next);
        Box::pin(async move { fut.await.into_handler_result() })
    }
}

/// Box a handler for registration.
pub fn handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
