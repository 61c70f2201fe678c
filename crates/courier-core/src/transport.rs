//! Capabilities consumed from the transport layer.
//!
//! Courier never speaks a broker protocol itself. It depends on two narrow
//! traits that concrete transports implement:
//!
//! | Capability | Used by | Purpose |
//! |------------|---------|---------|
//! | [`ResponsePublisher`] | `ResponseDispatcher` | Deliver one [`Response`] to a destination. |
//! | [`MessageBus`] | `RpcClient`, `HandlerService`, `BusPublisher` | Publish raw payloads to a named stream and subscribe to one. |
//!
//! Payloads on the bus are JSON values; `Event` and `Response` travel in
//! their serde wire form.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::TransportResult;
use crate::response::Response;

/// Callback invoked for every message delivered on a subscribed stream.
///
/// The callback is synchronous; implementations that need to do async work
/// must spawn it.
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Delivers responses produced by a dispatch.
#[async_trait]
pub trait ResponsePublisher: Send + Sync {
    /// Publishes a single response addressed to `user_id`.
    async fn publish(&self, user_id: i64, response: &Response) -> TransportResult<()>;
}

/// A publish/subscribe bus with named streams.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes `payload` on `stream`.
    async fn publish(&self, stream: &str, payload: Value) -> TransportResult<()>;

    /// Subscribes `on_message` to `stream`.
    ///
    /// Delivery continues until the returned handle is stopped or dropped.
    async fn subscribe(
        &self,
        stream: &str,
        on_message: MessageCallback,
    ) -> TransportResult<SubscriptionHandle>;
}

#[async_trait]
impl<T: ResponsePublisher + ?Sized> ResponsePublisher for Arc<T> {
    async fn publish(&self, user_id: i64, response: &Response) -> TransportResult<()> {
        (**self).publish(user_id, response).await
    }
}

#[async_trait]
impl<T: MessageBus + ?Sized> MessageBus for Arc<T> {
    async fn publish(&self, stream: &str, payload: Value) -> TransportResult<()> {
        (**self).publish(stream, payload).await
    }

    async fn subscribe(
        &self,
        stream: &str,
        on_message: MessageCallback,
    ) -> TransportResult<SubscriptionHandle> {
        (**self).subscribe(stream, on_message).await
    }
}

/// Keeps a subscription alive.
///
/// Dropping the handle cancels delivery.
#[derive(Debug)]
pub struct SubscriptionHandle {
    stream: String,
    cancel: CancellationToken,
}

impl SubscriptionHandle {
    /// Creates a handle whose subscription stops when `cancel` fires.
    pub fn new(stream: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            stream: stream.into(),
            cancel,
        }
    }

    /// Returns the subscribed stream name.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Returns `true` once the subscription has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the subscription.
    pub fn stop(self) {
        self.cancel.cancel();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
