//! Handler system.
//!
//! A [`Handler`] is the business logic attached to a route. It receives the
//! per-dispatch [`Context`] and emits responses through it. Any async
//! function or closure of the shape `Fn(Context) -> impl Future<Output =
//! HandlerResult>` is a handler:
//!
//! ```rust,ignore
//! async fn ping(ctx: Context) -> HandlerResult {
//!     ctx.send_message("pong", MessageOptions::default());
//!     Ok(())
//! }
//!
//! router.register(on_command("/ping"), ping);
//! ```
//!
//! Errors returned by a handler are not caught by the router; they surface
//! from `Router::dispatch` as `DispatchError::Handler`.

use std::future::Future;
use std::sync::Arc;

use courier_core::{BoxError, BoxFuture};

use crate::context::Context;

/// Result type returned by handlers.
pub type HandlerResult = Result<(), BoxError>;

/// The core trait for event handlers.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler against one dispatch context.
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult>;
}

/// A type-erased handler that can be stored in a route table.
pub type BoxedHandler = Arc<dyn Handler>;

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx))
    }
}

/// Converts a handler into a boxed handler.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
