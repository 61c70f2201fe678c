//! Correlation-based request/reply over a publish/subscribe bus.
//!
//! # Overview
//!
//! A bus has no notion of a reply. [`RpcClient`] builds one:
//!
//! 1. [`start`](RpcClient::start) subscribes a single listener to the reply
//!    stream. It is the only subscription the client ever makes.
//! 2. [`call`](RpcClient::call) stamps a fresh UUID v4 correlation id on the
//!    event, registers a oneshot sender under that id, publishes the event on
//!    the request stream and waits for the receiver or the timeout.
//! 3. The listener reads `correlation_id` from every reply and removes the
//!    matching sender from the pending map before resolving it. Replies whose
//!    id is not pending (late, duplicate, or addressed to another client) are
//!    dropped without effect.
//!
//! The pending entry is removed on every exit path of `call`, including the
//! call future being dropped, so the map never grows with abandoned requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use courier_core::{
    Event, MessageBus, Response, RpcError, RpcResult, SubscriptionHandle, TransportError,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{Instrument, debug, debug_span, trace, warn};
use uuid::Uuid;

/// Stream requests are published on unless configured otherwise.
pub const DEFAULT_REQUEST_STREAM: &str = "event.user.input";

/// Stream replies are read from unless configured otherwise.
pub const DEFAULT_REPLY_STREAM: &str = "event.user.response";

/// Timeout used by [`RpcClient::call_default`] unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

/// Turns a bus into call-and-await.
///
/// The client is `Send + Sync`; share it behind an `Arc` and issue calls
/// concurrently from any number of tasks.
pub struct RpcClient {
    bus: Arc<dyn MessageBus>,
    request_stream: String,
    reply_stream: String,
    default_timeout: Duration,
    pending: PendingMap,
    started: AtomicBool,
    // Bumped by `shutdown` so a `start` racing with it discards its handle.
    epoch: AtomicU64,
    subscription: Mutex<Option<SubscriptionHandle>>,
}

impl RpcClient {
    /// Creates a client using the default stream names and timeout.
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            request_stream: DEFAULT_REQUEST_STREAM.to_string(),
            reply_stream: DEFAULT_REPLY_STREAM.to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            pending: Arc::new(Mutex::new(HashMap::new())),
            started: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            subscription: Mutex::new(None),
        }
    }

    pub fn with_request_stream(mut self, stream: impl Into<String>) -> Self {
        self.request_stream = stream.into();
        self
    }

    pub fn with_reply_stream(mut self, stream: impl Into<String>) -> Self {
        self.reply_stream = stream.into();
        self
    }

    /// Sets the timeout used by [`call_default`](Self::call_default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn request_stream(&self) -> &str {
        &self.request_stream
    }

    pub fn reply_stream(&self) -> &str {
        &self.reply_stream
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Subscribes the reply listener.
    ///
    /// # Errors
    /// [`RpcError::AlreadyStarted`] on a second call, [`RpcError::Cancelled`]
    /// if [`shutdown`](Self::shutdown) ran while subscribing, or the transport
    /// error if the subscription fails. A failed start may be retried.
    pub async fn start(&self) -> RpcResult<()> {
        let epoch = self.epoch.load(Ordering::Acquire);
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RpcError::AlreadyStarted);
        }

        let pending = Arc::clone(&self.pending);
        let listener = Arc::new(move |reply: Value| resolve(&pending, reply));

        match self.bus.subscribe(&self.reply_stream, listener).await {
            Ok(handle) => {
                let mut subscription = self.subscription.lock();
                if self.epoch.load(Ordering::Acquire) != epoch {
                    drop(subscription);
                    handle.stop();
                    debug!("RPC client shut down while starting");
                    return Err(RpcError::Cancelled);
                }
                *subscription = Some(handle);
                drop(subscription);
                debug!(
                    request_stream = %self.request_stream,
                    reply_stream = %self.reply_stream,
                    "RPC client started"
                );
                Ok(())
            }
            Err(e) => {
                let _subscription = self.subscription.lock();
                if self.epoch.load(Ordering::Acquire) == epoch {
                    self.started.store(false, Ordering::Release);
                }
                Err(e.into())
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Publishes `event` and waits up to `timeout` for the correlated reply.
    ///
    /// Any correlation id already on the event is replaced.
    ///
    /// # Errors
    /// - [`RpcError::NotStarted`] before [`start`](Self::start)
    /// - [`RpcError::Timeout`] if no reply arrived in time
    /// - [`RpcError::Cancelled`] if the client was shut down while waiting
    /// - [`RpcError::MalformedReply`] if the reply is not a valid response
    /// - [`RpcError::Transport`] if publishing failed
    pub async fn call(&self, event: Event, timeout: Duration) -> RpcResult<Response> {
        if !self.is_started() {
            return Err(RpcError::NotStarted);
        }

        let correlation_id = Uuid::new_v4().to_string();
        let span = debug_span!("rpc_call", correlation_id = %correlation_id);
        self.exchange(event.with_correlation_id(correlation_id.clone()), &correlation_id, timeout)
            .instrument(span)
            .await
    }

    /// Like [`call`](Self::call) with the configured default timeout.
    pub async fn call_default(&self, event: Event) -> RpcResult<Response> {
        self.call(event, self.default_timeout).await
    }

    async fn exchange(
        &self,
        event: Event,
        correlation_id: &str,
        wait: Duration,
    ) -> RpcResult<Response> {
        let (tx, rx) = oneshot::channel();
        // Registered before publishing so a fast reply cannot be missed.
        self.pending.lock().insert(correlation_id.to_string(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            correlation_id,
        };

        let payload = serde_json::to_value(&event).map_err(TransportError::from)?;
        self.bus.publish(&self.request_stream, payload).await?;
        trace!(stream = %self.request_stream, "Request published, awaiting reply");

        match timeout(wait, rx).await {
            Ok(Ok(reply)) => {
                serde_json::from_value(reply).map_err(|e| RpcError::MalformedReply(e.to_string()))
            }
            Ok(Err(_)) => Err(RpcError::Cancelled),
            Err(_) => {
                warn!(timeout = ?wait, "RPC call timed out");
                Err(RpcError::Timeout(wait))
            }
        }
    }

    /// Returns the number of calls currently waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, correlation_id: &str) -> bool {
        self.pending.lock().contains_key(correlation_id)
    }

    /// Drops the reply subscription and fails every outstanding call with
    /// [`RpcError::Cancelled`]. The client can be started again afterwards.
    pub fn shutdown(&self) {
        let handle = {
            let mut subscription = self.subscription.lock();
            self.epoch.fetch_add(1, Ordering::AcqRel);
            self.started.store(false, Ordering::Release);
            subscription.take()
        };
        if let Some(handle) = handle {
            handle.stop();
        }
        let dropped = {
            let mut pending = self.pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        debug!(dropped, "RPC client shut down");
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("request_stream", &self.request_stream)
            .field("reply_stream", &self.reply_stream)
            .field("default_timeout", &self.default_timeout)
            .field("pending", &self.pending_count())
            .field("started", &self.is_started())
            .finish()
    }
}

/// Listener body: route a reply to its waiting call, if any.
fn resolve(pending: &PendingMap, reply: Value) {
    let Some(id) = reply
        .get("correlation_id")
        .and_then(Value::as_str)
        .map(str::to_owned)
    else {
        debug!("Reply without correlation id dropped");
        return;
    };

    let waiter = pending.lock().remove(&id);
    match waiter {
        Some(tx) => {
            if tx.send(reply).is_err() {
                trace!(correlation_id = %id, "Caller went away before the reply");
            }
        }
        // Late, duplicate, or meant for another client.
        None => debug!(correlation_id = %id, "Reply for unknown correlation id dropped"),
    }
}

/// Removes a pending entry when the owning call finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    correlation_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(self.correlation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBus;
    use async_trait::async_trait;
    use courier_core::{MessageCallback, TransportResult};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        bus: Arc<MemoryBus>,
        client: RpcClient,
        requests: mpsc::UnboundedReceiver<Event>,
        _requests_sub: SubscriptionHandle,
    }

    /// Starts a client on a fresh bus and captures every request it publishes.
    async fn harness() -> Harness {
        let bus = Arc::new(MemoryBus::new());
        let (tx, requests) = mpsc::unbounded_channel();
        let requests_sub = bus
            .subscribe(
                DEFAULT_REQUEST_STREAM,
                Arc::new(move |payload| {
                    if let Ok(event) = serde_json::from_value::<Event>(payload) {
                        let _ = tx.send(event);
                    }
                }),
            )
            .await
            .unwrap();

        let client = RpcClient::new(bus.clone());
        client.start().await.unwrap();
        Harness {
            bus,
            client,
            requests,
            _requests_sub: requests_sub,
        }
    }

    async fn reply(bus: &MemoryBus, correlation_id: &str, text: &str) {
        let response =
            Response::send_message(text).with_correlation_id(Some(correlation_id.to_string()));
        bus.publish(DEFAULT_REPLY_STREAM, serde_json::to_value(response).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_call_resolves_with_matching_reply() {
        let Harness {
            bus,
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        let responder = async {
            let request = requests.recv().await.unwrap();
            assert_eq!(request.text(), Some("/ping"));
            let id = request.correlation_id().unwrap().to_string();
            assert!(client.is_pending(&id));
            reply(&bus, &id, "pong").await;
            id
        };

        let (result, id) = tokio::join!(
            client.call(Event::message(1, 1, "/ping"), Duration::from_secs(5)),
            responder
        );

        let response = result.unwrap();
        assert_eq!(response.text(), Some("pong"));
        assert_eq!(response.correlation_id.as_deref(), Some(id.as_str()));
        assert!(!client.is_pending(&id));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_pending_entry() {
        let Harness { client, _requests_sub, .. } = harness().await;

        let err = client
            .call(Event::message(1, 1, "/slow"), Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err, RpcError::Timeout(d) if d == Duration::from_millis(50)));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_dropped() {
        let Harness {
            bus,
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        let err = client
            .call(Event::message(1, 1, "/slow"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let request = requests.recv().await.unwrap();
        let id = request.correlation_id().unwrap().to_string();
        reply(&bus, &id, "too late").await;
        tokio::task::yield_now().await;

        assert!(!client.is_pending(&id));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_their_own_replies() {
        let Harness {
            bus,
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        let responder = async {
            let first = requests.recv().await.unwrap();
            let second = requests.recv().await.unwrap();
            assert_ne!(first.correlation_id(), second.correlation_id());
            assert_eq!(client.pending_count(), 2);

            // Answer out of order, echoing each request's text.
            for request in [second, first] {
                let text = format!("re:{}", request.text().unwrap());
                reply(&bus, request.correlation_id().unwrap(), &text).await;
            }
        };

        let wait = Duration::from_secs(5);
        let (a, b, ()) = tokio::join!(
            client.call(Event::message(1, 1, "a"), wait),
            client.call(Event::message(2, 2, "b"), wait),
            responder
        );

        assert_eq!(a.unwrap().text(), Some("re:a"));
        assert_eq!(b.unwrap().text(), Some("re:b"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_replies_are_ignored() {
        let Harness {
            bus,
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        let responder = async {
            let request = requests.recv().await.unwrap();
            let id = request.correlation_id().unwrap().to_string();
            reply(&bus, "someone-else", "not yours").await;
            bus.publish(DEFAULT_REPLY_STREAM, json!({ "action": "none" }))
                .await
                .unwrap();
            reply(&bus, &id, "first").await;
            reply(&bus, &id, "second").await;
        };

        let (result, ()) = tokio::join!(
            client.call(Event::message(1, 1, "/once"), Duration::from_secs(5)),
            responder
        );

        assert_eq!(result.unwrap().text(), Some("first"));
        tokio::task::yield_now().await;
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let Harness {
            bus,
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        let responder = async {
            let request = requests.recv().await.unwrap();
            let id = request.correlation_id().unwrap().to_string();
            bus.publish(
                DEFAULT_REPLY_STREAM,
                json!({ "correlation_id": id, "action": "launch_rockets" }),
            )
            .await
            .unwrap();
        };

        let (result, ()) = tokio::join!(
            client.call(Event::message(1, 1, "/odd"), Duration::from_secs(5)),
            responder
        );

        assert!(matches!(result, Err(RpcError::MalformedReply(_))));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_before_start_and_double_start() {
        let client = RpcClient::new(Arc::new(MemoryBus::new()));
        let err = client
            .call(Event::message(1, 1, "/ping"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::NotStarted));

        client.start().await.unwrap();
        assert!(client.is_started());
        assert!(matches!(client.start().await, Err(RpcError::AlreadyStarted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_stream_subscribed_once() {
        let Harness { bus, client, _requests_sub, .. } = harness().await;
        assert_eq!(bus.subscriber_count(DEFAULT_REPLY_STREAM), 1);

        for text in ["/a", "/b", "/c"] {
            let err = client
                .call(Event::message(1, 1, text), Duration::from_millis(20))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }

        assert_eq!(bus.subscriber_count(DEFAULT_REPLY_STREAM), 1);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_outstanding_calls() {
        let Harness {
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;
        let client = Arc::new(client);

        let call = tokio::spawn({
            let client = Arc::clone(&client);
            async move {
                client
                    .call(Event::message(1, 1, "/wait"), Duration::from_secs(60))
                    .await
            }
        });

        requests.recv().await.unwrap();
        assert_eq!(client.pending_count(), 1);
        client.shutdown();

        let result = call.await.unwrap();
        assert!(matches!(result, Err(RpcError::Cancelled)));
        assert!(!client.is_started());
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_call_cleans_up() {
        let Harness {
            client,
            mut requests,
            _requests_sub,
            ..
        } = harness().await;

        {
            let call = client.call(Event::message(1, 1, "/abandon"), Duration::from_secs(60));
            tokio::pin!(call);
            tokio::select! {
                _ = &mut call => panic!("no reply was sent"),
                request = requests.recv() => {
                    let id = request.unwrap().correlation_id().unwrap().to_string();
                    assert!(client.is_pending(&id));
                }
            }
        }

        assert_eq!(client.pending_count(), 0);
    }

    struct FailingBus;

    #[async_trait]
    impl MessageBus for FailingBus {
        async fn publish(&self, stream: &str, _payload: Value) -> TransportResult<()> {
            Err(TransportError::send_failed(stream, "broker unreachable"))
        }

        async fn subscribe(
            &self,
            stream: &str,
            _on_message: MessageCallback,
        ) -> TransportResult<SubscriptionHandle> {
            Ok(SubscriptionHandle::new(stream, CancellationToken::new()))
        }
    }

    /// Holds `subscribe` open until released.
    #[derive(Default)]
    struct GatedBus {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        tokens: Mutex<Vec<CancellationToken>>,
    }

    #[async_trait]
    impl MessageBus for GatedBus {
        async fn publish(&self, _stream: &str, _payload: Value) -> TransportResult<()> {
            Ok(())
        }

        async fn subscribe(
            &self,
            stream: &str,
            _on_message: MessageCallback,
        ) -> TransportResult<SubscriptionHandle> {
            self.entered.notify_one();
            self.release.notified().await;
            let token = CancellationToken::new();
            self.tokens.lock().push(token.clone());
            Ok(SubscriptionHandle::new(stream, token))
        }
    }

    #[tokio::test]
    async fn test_shutdown_during_start() {
        let bus = Arc::new(GatedBus::default());
        let client = Arc::new(RpcClient::new(bus.clone()));

        let start = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.start().await }
        });
        bus.entered.notified().await;
        client.shutdown();
        bus.release.notify_one();

        assert!(matches!(start.await.unwrap(), Err(RpcError::Cancelled)));
        assert!(!client.is_started());
        assert!(bus.tokens.lock()[0].is_cancelled());

        // Nothing is left half-started, so the client starts cleanly.
        bus.release.notify_one();
        client.start().await.unwrap();
        assert!(client.is_started());
        assert!(!bus.tokens.lock()[1].is_cancelled());
    }

    #[tokio::test]
    async fn test_publish_failure_cleans_up() {
        let client = RpcClient::new(Arc::new(FailingBus));
        client.start().await.unwrap();

        let err = client.call_default(Event::message(1, 1, "/ping")).await.unwrap_err();

        assert!(matches!(
            err,
            RpcError::Transport(TransportError::SendFailed { ref stream, .. })
                if stream == DEFAULT_REQUEST_STREAM
        ));
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn test_defaults_and_builders() {
        let client = RpcClient::new(Arc::new(MemoryBus::new()))
            .with_request_stream("req")
            .with_reply_stream("rep")
            .with_timeout(Duration::from_millis(250));

        assert_eq!(client.request_stream(), "req");
        assert_eq!(client.reply_stream(), "rep");
        assert_eq!(client.default_timeout(), Duration::from_millis(250));
        assert!(!client.is_started());
    }
}
