//! [`ResponsePublisher`] that writes responses onto a bus stream.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{MessageBus, Response, ResponsePublisher, TransportResult};
use tracing::trace;

/// Publishes every response to a single reply stream.
///
/// The recipient is carried inside the response (via its correlation id and
/// the originating event), so `user_id` is only used for logging.
#[derive(Clone)]
pub struct BusPublisher {
    bus: Arc<dyn MessageBus>,
    stream: String,
}

impl BusPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, stream: impl Into<String>) -> Self {
        Self {
            bus,
            stream: stream.into(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl std::fmt::Debug for BusPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusPublisher")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResponsePublisher for BusPublisher {
    async fn publish(&self, user_id: i64, response: &Response) -> TransportResult<()> {
        let payload = serde_json::to_value(response)?;
        trace!(
            user_id,
            stream = %self.stream,
            action = %response.action,
            "Publishing response"
        );
        self.bus.publish(&self.stream, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBus;
    use courier_core::Action;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_response_lands_on_reply_stream() {
        let bus = Arc::new(MemoryBus::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = bus
            .subscribe(
                "replies",
                Arc::new(move |payload| {
                    let _ = tx.send(payload);
                }),
            )
            .await
            .unwrap();

        let publisher = BusPublisher::new(bus, "replies");
        let response = Response::send_message("pong").with_correlation_id(Some("c-1".into()));
        publisher.publish(7, &response).await.unwrap();

        let raw = rx.recv().await.unwrap();
        let decoded: Response = serde_json::from_value(raw).unwrap();
        assert_eq!(decoded.action, Action::SendMessage);
        assert_eq!(decoded.text(), Some("pong"));
        assert_eq!(decoded.correlation_id.as_deref(), Some("c-1"));
    }
}
