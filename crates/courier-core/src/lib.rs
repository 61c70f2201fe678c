//! # Courier Core
//!
//! Data model and capability traits shared by every Courier crate.
//!
//! - **Records**: [`Event`] (inbound interaction) and [`Response`] (outbound
//!   action), with a serde wire form whose optional fields are absent-safe.
//! - **Errors**: the dispatch and RPC error taxonomy ([`DispatchError`],
//!   [`RpcError`], [`TransportError`]).
//! - **Capabilities**: [`ResponsePublisher`] and [`MessageBus`], implemented by
//!   transports outside this crate.
//!
//! ```text
//! ┌─────────┐  Event   ┌────────┐ Response ┌───────────────────┐
//! │ Gateway │─────────▶│ Router │─────────▶│ ResponsePublisher │
//! └─────────┘          └────────┘          └───────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod response;
pub mod transport;

pub use error::{
    BoxError, DispatchError, DispatchResult, MiddlewarePhase, RpcError, RpcResult,
    TransportError, TransportResult,
};
pub use event::{Event, EventType, Metadata};
pub use response::{Action, EDIT_MESSAGE_ID_KEY, Response};
pub use transport::{MessageBus, MessageCallback, ResponsePublisher, SubscriptionHandle};

/// A boxed, pinned, `Send` future.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
