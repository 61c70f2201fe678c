//! Event router.
//!
//! The [`Router`] selects exactly one handler per event and publishes what
//! that handler emitted. For each [`dispatch`](Router::dispatch):
//!
//! 1. A fresh [`Context`] is bound to a new, empty [`ResponseCollector`]
//! 2. Every middleware `before` hook runs in registration order
//! 3. Routes are scanned in registration order; the **first** matcher that
//!    accepts the event selects its handler and the scan stops
//! 4. The handler runs (or, with no match, a single fallback response with
//!    [`FALLBACK_TEXT`] is emitted)
//! 5. The responses are published in emission order
//! 6. Every middleware `after` hook runs with the published responses
//!
//! ```rust,ignore
//! let mut router = Router::new(publisher);
//! router.register(on_command("/ping"), ping);
//! router.register(on_callback("confirm"), confirm);
//!
//! let published = router.dispatch(Event::message(1, 1, "/ping")).await?;
//! ```
//!
//! # Concurrency
//!
//! `dispatch` takes `&self` and keeps all per-event state local, so distinct
//! events can be dispatched concurrently. Registration takes `&mut self`;
//! the route table is copy-on-write, so clones taken before a `register`
//! keep their own table.

use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use courier_core::{
    BoxFuture, DispatchError, DispatchResult, Event, MiddlewarePhase, Response, ResponsePublisher,
};
use parking_lot::Mutex;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace};

use crate::collector::{ResponseCollector, ResponseDispatcher};
use crate::context::{Context, MessageOptions};
use crate::group::RouteGroup;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::matcher::Matcher;
use crate::matcher_builders::{on_callback, on_command, on_message};
use crate::middleware::Middleware;

/// Text of the response emitted when no route matches.
pub const FALLBACK_TEXT: &str = "Command not recognized.";

/// A matcher paired with the handler it selects.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) matcher: Arc<dyn Matcher>,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    pub(crate) fn new<M, H>(matcher: M, handler: H) -> Self
    where
        M: Matcher + 'static,
        H: Handler,
    {
        Self {
            matcher: Arc::new(matcher),
            handler: into_handler(handler),
        }
    }
}

#[derive(Clone)]
struct RouterInner {
    routes: Vec<Route>,
    middlewares: Vec<Arc<dyn Middleware>>,
    dispatcher: ResponseDispatcher,
}

/// Routes events to handlers and publishes their responses.
///
/// Cloning is cheap; clones share the route table until one of them
/// registers a new route.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Creates a router publishing through `publisher`.
    pub fn new<P>(publisher: P) -> Self
    where
        P: ResponsePublisher + 'static,
    {
        Self::from_publisher(Arc::new(publisher))
    }

    /// Creates a router from an already shared publisher.
    pub fn from_publisher(publisher: Arc<dyn ResponsePublisher>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routes: Vec::new(),
                middlewares: Vec::new(),
                dispatcher: ResponseDispatcher::new(publisher),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut RouterInner {
        Arc::make_mut(&mut self.inner)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Appends a route. Earlier routes win when several match.
    pub fn register<M, H>(&mut self, matcher: M, handler: H)
    where
        M: Matcher + 'static,
        H: Handler,
    {
        self.inner_mut().routes.push(Route::new(matcher, handler));
    }

    /// Appends a route with pre-shared matcher and handler.
    pub fn register_boxed(&mut self, matcher: Arc<dyn Matcher>, handler: BoxedHandler) {
        self.inner_mut().routes.push(Route { matcher, handler });
    }

    /// Appends a route (builder pattern).
    pub fn route<M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: Matcher + 'static,
        H: Handler,
    {
        self.register(matcher, handler);
        self
    }

    /// Routes events whose text equals `command`.
    pub fn command<H: Handler>(&mut self, command: impl Into<String>, handler: H) {
        self.register(on_command(command), handler);
    }

    /// Routes events whose callback data equals `data`.
    pub fn callback<H: Handler>(&mut self, data: impl Into<String>, handler: H) {
        self.register(on_callback(data), handler);
    }

    /// Routes events accepted by `predicate`.
    pub fn message<F, H>(&mut self, predicate: F, handler: H)
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
        H: Handler,
    {
        self.register(on_message(predicate), handler);
    }

    /// Appends every route of `group`, in order, and returns how many.
    pub fn include(&mut self, group: RouteGroup) -> usize {
        let routes = group.into_routes();
        let count = routes.len();
        self.inner_mut().routes.extend(routes);
        count
    }

    /// Appends a middleware. Hooks run in the order they are added.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.inner_mut().middlewares.push(Arc::new(middleware));
    }

    /// Appends a middleware (builder pattern).
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add_middleware(middleware);
        self
    }

    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middlewares.len()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Handles one event and returns the responses that were published.
    pub async fn dispatch(&self, event: Event) -> DispatchResult<Vec<Response>> {
        let span = debug_span!(
            "dispatch",
            user_id = event.user_id,
            event_type = %event.event_type
        );
        self.dispatch_inner(event).instrument(span).await
    }

    async fn dispatch_inner(&self, event: Event) -> DispatchResult<Vec<Response>> {
        let inner = &self.inner;
        let event = Arc::new(event);
        let collector = Arc::new(Mutex::new(ResponseCollector::new()));
        let ctx = Context::new(Arc::clone(&event), Arc::clone(&collector));

        for middleware in &inner.middlewares {
            middleware
                .before(&event)
                .await
                .map_err(|source| DispatchError::Middleware {
                    middleware: middleware.name().to_string(),
                    phase: MiddlewarePhase::Before,
                    source,
                })?;
        }

        match self.select(&event) {
            Some((index, route)) => {
                debug!(route = index, "Route matched, invoking handler");
                route
                    .handler
                    .call(ctx)
                    .await
                    .map_err(|source| DispatchError::Handler {
                        route: index,
                        source,
                    })?;
            }
            None => {
                debug!("No route matched, emitting fallback");
                ctx.send_message(FALLBACK_TEXT, MessageOptions::default());
            }
        }

        let responses = collector.lock().take();
        inner.dispatcher.dispatch(event.user_id, &responses).await?;

        for middleware in &inner.middlewares {
            middleware
                .after(&event, &responses)
                .await
                .map_err(|source| DispatchError::Middleware {
                    middleware: middleware.name().to_string(),
                    phase: MiddlewarePhase::After,
                    source,
                })?;
        }

        Ok(responses)
    }

    /// Returns the first route whose matcher accepts `event`.
    fn select(&self, event: &Event) -> Option<(usize, &Route)> {
        self.inner.routes.iter().enumerate().find(|(index, route)| {
            let matched = route.matcher.matches(event);
            trace!(route = index, matched, "Checked route");
            matched
        })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.inner.routes.len())
            .field("middleware_count", &self.inner.middlewares.len())
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation for Router
// ============================================================================

/// Lets tower layers wrap dispatch.
///
/// ```rust,ignore
/// use tower::ServiceExt;
///
/// let published = router.clone().oneshot(event).await?;
/// ```
impl Service<Event> for Router {
    type Response = Vec<Response>;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: Event) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { router.dispatch(event).await })
    }
}
