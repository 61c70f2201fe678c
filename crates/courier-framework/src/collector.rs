//! Response buffering and publishing.
//!
//! - [`ResponseCollector`] buffers the responses emitted during one dispatch,
//!   in emission order. A fresh collector is created per dispatch and dropped
//!   once its contents are published.
//! - [`ResponseDispatcher`] hands a buffered sequence to the
//!   [`ResponsePublisher`], one publish per response, stopping at the first
//!   failure.

use std::sync::Arc;

use courier_core::{Response, ResponsePublisher, TransportResult};
use tracing::trace;

/// Ordered buffer of responses for a single dispatch.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    buffer: Vec<Response>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Appends a response.
    pub fn add(&mut self, response: Response) {
        self.buffer.push(response);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.buffer.iter()
    }

    /// Removes and returns every buffered response.
    pub fn take(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.buffer)
    }
}

impl IntoIterator for ResponseCollector {
    type Item = Response;
    type IntoIter = std::vec::IntoIter<Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffer.into_iter()
    }
}

/// Publishes collected responses through a [`ResponsePublisher`].
#[derive(Clone)]
pub struct ResponseDispatcher {
    publisher: Arc<dyn ResponsePublisher>,
}

impl ResponseDispatcher {
    pub fn new(publisher: Arc<dyn ResponsePublisher>) -> Self {
        Self { publisher }
    }

    /// Publishes `responses` to `user_id` in order.
    ///
    /// The first publish failure is returned and later responses are not sent.
    pub async fn dispatch(&self, user_id: i64, responses: &[Response]) -> TransportResult<()> {
        for (index, response) in responses.iter().enumerate() {
            trace!(user_id, index, action = %response.action, "Publishing response");
            self.publisher.publish(user_id, response).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::TransportError;
    use parking_lot::Mutex;

    /// Fails on the n-th publish (zero based).
    struct FlakyPublisher {
        fail_at: usize,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResponsePublisher for FlakyPublisher {
        async fn publish(&self, _user_id: i64, response: &Response) -> TransportResult<()> {
            let mut sent = self.sent.lock();
            if sent.len() == self.fail_at {
                return Err(TransportError::send_failed("replies", "broker down"));
            }
            sent.push(response.text().unwrap_or_default().to_string());
            Ok(())
        }
    }

    #[test]
    fn test_collector_preserves_order() {
        let mut collector = ResponseCollector::new();
        collector.add(Response::send_message("a"));
        collector.add(Response::send_message("b"));

        assert_eq!(collector.len(), 2);
        let texts: Vec<_> = collector.iter().filter_map(Response::text).collect();
        assert_eq!(texts, ["a", "b"]);

        let taken = collector.take();
        assert_eq!(taken.len(), 2);
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_stops_at_first_failure() {
        let publisher = Arc::new(FlakyPublisher {
            fail_at: 1,
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = ResponseDispatcher::new(publisher.clone());
        let responses = vec![
            Response::send_message("one"),
            Response::send_message("two"),
            Response::send_message("three"),
        ];

        let result = dispatcher.dispatch(1, &responses).await;

        assert!(matches!(result, Err(TransportError::SendFailed { .. })));
        assert_eq!(*publisher.sent.lock(), vec!["one".to_string()]);
    }
}
