//! In-process [`MessageBus`] over tokio broadcast channels.
//!
//! Each stream name maps to one broadcast channel, created on first use.
//! Every subscription gets its own forwarding task that feeds messages to the
//! callback in publish order until the [`SubscriptionHandle`] is dropped.
//!
//! Publishing to a stream nobody listens on succeeds and the message is
//! dropped, the way a fanout exchange without bound queues behaves.

use std::collections::HashMap;

use async_trait::async_trait;
use courier_core::{MessageBus, MessageCallback, SubscriptionHandle, TransportResult};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default per-stream buffer size.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Largest per-stream buffer a bus will allocate.
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// An in-memory publish/subscribe bus.
#[derive(Debug)]
pub struct MemoryBus {
    streams: RwLock<HashMap<String, broadcast::Sender<Value>>>,
    capacity: usize,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus whose streams buffer up to `capacity` messages per
    /// lagging subscriber, clamped to `1..=MAX_CHANNEL_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            capacity: capacity.clamp(1, MAX_CHANNEL_CAPACITY),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of live subscriptions on `stream`.
    pub fn subscriber_count(&self, stream: &str) -> usize {
        self.streams
            .read()
            .get(stream)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn sender(&self, stream: &str) -> broadcast::Sender<Value> {
        if let Some(tx) = self.streams.read().get(stream) {
            return tx.clone();
        }
        self.streams
            .write()
            .entry(stream.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, stream: &str, payload: Value) -> TransportResult<()> {
        match self.sender(stream).send(payload) {
            Ok(receivers) => trace!(stream, receivers, "Message published"),
            Err(_) => debug!(stream, "No subscribers, message dropped"),
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        stream: &str,
        on_message: MessageCallback,
    ) -> TransportResult<SubscriptionHandle> {
        let mut rx = self.sender(stream).subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = stream.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(payload) => on_message(payload),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(stream = %name, skipped, "Subscriber lagged, messages skipped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            trace!(stream = %name, "Subscription ended");
        });

        debug!(stream, "Subscribed");
        Ok(SubscriptionHandle::new(stream, cancel))
    }
}
