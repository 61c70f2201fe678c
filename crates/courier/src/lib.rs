//! # Courier
//!
//! Event routing for chat handler services, plus request/reply over a
//! publish/subscribe bus.
//!
//! ## Architecture
//!
//! ```text
//!              request stream (Event)
//! ┌─────────┐ ─────────────────────▶ ┌─────┐ ─────▶ ┌────────────────┐
//! │ Gateway │                        │ Bus │        │ HandlerService │
//! │  (RPC)  │ ◀───────────────────── │     │ ◀───── │  Router        │
//! └─────────┘ reply stream (Response) └─────┘        └────────────────┘
//! ```
//!
//! - **Router**: picks the first route whose matcher accepts the event, runs
//!   middleware around the handler and publishes what the handler emitted.
//!   Unmatched events get a fixed fallback reply.
//! - **RpcClient**: stamps a correlation id on each request and resolves the
//!   caller with the first reply carrying that id, or times out.
//! - **Gateway**: turns an RPC timeout into a polite "service did not respond"
//!   reply.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! async fn ping(ctx: Context) -> HandlerResult {
//!     ctx.send_message("pong", MessageOptions::default());
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bus = Arc::new(MemoryBus::new());
//!     let mut router = Router::new(BusPublisher::new(bus.clone(), DEFAULT_REPLY_STREAM));
//!     router.command("/ping", ping);
//!
//!     HandlerService::new(bus, router).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `courier.toml` files (default)
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Commonly used types for building handler services and gateways.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Data model
    pub use courier_core::{
        Action, BoxError, DispatchError, Event, EventType, Response, RpcError,
    };

    // Routing
    pub use courier_framework::{
        Context, HandlerResult, MatchRule, Matcher, MatcherExt, MessageOptions, Middleware,
        RouteGroup, Router, TracingMiddleware, on_callback, on_command, on_message,
    };

    // Transport
    pub use courier_transport::{
        BusPublisher, DEFAULT_REPLY_STREAM, DEFAULT_REQUEST_STREAM, MemoryBus, RpcClient,
    };

    // Runtime
    pub use courier_runtime::{ConfigLoader, CourierConfig, Gateway, HandlerService};
}
