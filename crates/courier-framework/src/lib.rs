//! # Courier Framework
//!
//! Routing components for building handler services.
//!
//! This layer provides:
//! - [`Router`]: single-winner routing of events to handlers, with middleware
//!   hooks and ordered publishing of the emitted responses
//! - [`Context`]: the per-dispatch facade handlers emit responses through
//! - [`Matcher`] and the stock [`MatchRule`] variants, plus combinators
//! - [`RouteGroup`] for composing routes from several modules
//! - Convenience matcher builders (`on_command`, `on_callback`, `on_message`)

pub mod collector;
pub mod context;
pub mod group;
pub mod handler;
pub mod matcher;
pub mod matcher_builders;
pub mod middleware;
pub mod router;

pub use collector::{ResponseCollector, ResponseDispatcher};
pub use context::{Context, MessageOptions};
pub use group::RouteGroup;
pub use handler::{BoxedHandler, Handler, HandlerResult, into_handler};
pub use matcher::{And, MatchRule, Matcher, MatcherExt, Not, Or, PredicateFn};
pub use matcher_builders::{on_callback, on_command, on_event_type, on_message};
pub use middleware::{Middleware, TracingMiddleware};
pub use router::{FALLBACK_TEXT, Router};
