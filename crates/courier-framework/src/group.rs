//! Route groups for multi-module applications.
//!
//! A [`RouteGroup`] collects routes without owning a publisher. Feature
//! modules each build a group and the application merges them into its
//! [`Router`](crate::Router):
//!
//! ```rust,ignore
//! // users.rs
//! pub fn routes() -> RouteGroup {
//!     RouteGroup::new()
//!         .command("/profile", profile)
//!         .callback("edit_name", edit_name)
//! }
//!
//! // main.rs
//! let mut router = Router::new(publisher);
//! router.include(users::routes());
//! router.include(billing::routes());
//! ```
//!
//! Included routes keep their relative order and are appended after any
//! routes already registered on the router.

use courier_core::Event;

use crate::handler::Handler;
use crate::matcher::Matcher;
use crate::matcher_builders::{on_callback, on_command, on_message};
use crate::router::Route;

/// An ordered set of routes waiting to be included into a router.
#[derive(Clone, Default)]
pub struct RouteGroup {
    routes: Vec<Route>,
}

impl RouteGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route.
    pub fn register<M, H>(&mut self, matcher: M, handler: H)
    where
        M: Matcher + 'static,
        H: Handler,
    {
        self.routes.push(Route::new(matcher, handler));
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

    pub fn command<H: Handler>(self, command: impl Into<String>, handler: H) -> Self {
        self.route(on_command(command), handler)
    }

    pub fn callback<H: Handler>(self, data: impl Into<String>, handler: H) -> Self {
        self.route(on_callback(data), handler)
    }

    pub fn message<F, H>(self, predicate: F, handler: H) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
        H: Handler,
    {
        self.route(on_message(predicate), handler)
    }

    /// Appends every route of `other` after this group's routes.
    pub fn merge(mut self, other: RouteGroup) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

impl std::fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("route_count", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::{Response, ResponsePublisher, TransportResult};
    use parking_lot::Mutex;
    use std::sync::Arc;

    use crate::context::{Context, MessageOptions};
    use crate::handler::HandlerResult;
    use crate::router::Router;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<Response>>,
    }

    #[async_trait]
    impl ResponsePublisher for RecordingPublisher {
        async fn publish(&self, _user_id: i64, response: &Response) -> TransportResult<()> {
            self.sent.lock().push(response.clone());
            Ok(())
        }
    }

    async fn profile(ctx: Context) -> HandlerResult {
        ctx.send_message("profile", MessageOptions::default());
        Ok(())
    }

    async fn shadowed(ctx: Context) -> HandlerResult {
        ctx.send_message("shadowed", MessageOptions::default());
        Ok(())
    }

    async fn edit_name(ctx: Context) -> HandlerResult {
        ctx.edit_message("new name?", MessageOptions::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_include_appends_in_order() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut router = Router::from_publisher(publisher.clone());
        router.command("/profile", profile);

        let group = RouteGroup::new()
            .command("/profile", shadowed)
            .callback("edit_name", edit_name)
            .message(|ev| ev.text() == Some("/whoami"), profile);
        assert_eq!(group.len(), 3);

        assert_eq!(router.include(group), 3);
        assert_eq!(router.route_count(), 4);

        router.dispatch(Event::message(1, 1, "/profile")).await.unwrap();
        router.dispatch(Event::callback(1, 1, "edit_name")).await.unwrap();

        let texts: Vec<_> = publisher
            .sent
            .lock()
            .iter()
            .filter_map(|r| r.text.clone())
            .collect();
        assert_eq!(texts, ["profile", "new name?"]);
    }

    #[test]
    fn test_merge_and_empty_include() {
        let a = RouteGroup::new().command("/a", profile);
        let b = RouteGroup::new().command("/b", profile).command("/c", profile);
        assert_eq!(a.merge(b).len(), 3);

        let mut router = Router::new(RecordingPublisher::default());
        assert_eq!(router.include(RouteGroup::new()), 0);
        assert!(RouteGroup::new().is_empty());
    }
}
