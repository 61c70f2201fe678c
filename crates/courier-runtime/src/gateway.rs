//! The edge of the system: forwards events to handler services and never lets
//! a silent service surface as a failure.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{Event, MessageBus, Response, RpcError, RpcResult};
use courier_transport::RpcClient;
use tracing::warn;

use crate::config::CourierConfig;
use crate::error::RuntimeResult;

/// Asks handler services for a response over RPC.
#[derive(Debug, Clone)]
pub struct Gateway {
    rpc: Arc<RpcClient>,
    timeout: Duration,
    unavailable_text: String,
}

impl Gateway {
    /// Wraps an already started client.
    pub fn new(rpc: Arc<RpcClient>, unavailable_text: impl Into<String>) -> Self {
        let timeout = rpc.default_timeout();
        Self {
            rpc,
            timeout,
            unavailable_text: unavailable_text.into(),
        }
    }

    /// Builds and starts an RPC client on `bus` using the stream names,
    /// timeout, and fallback text from `config`.
    pub async fn connect(bus: Arc<dyn MessageBus>, config: &CourierConfig) -> RuntimeResult<Self> {
        let rpc = RpcClient::new(bus)
            .with_request_stream(&config.bus.request_stream)
            .with_reply_stream(&config.bus.reply_stream)
            .with_timeout(config.rpc.timeout());
        rpc.start().await?;
        Ok(Self::new(Arc::new(rpc), &config.gateway.unavailable_text))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Returns the handler service's response to `event`.
    ///
    /// A timeout yields a `send_message` response carrying the configured
    /// unavailable text, with `error` set. Every other failure is returned.
    pub async fn ask(&self, event: Event) -> RpcResult<Response> {
        let user_id = event.user_id;
        match self.rpc.call(event, self.timeout).await {
            Err(err @ RpcError::Timeout(_)) => {
                warn!(user_id, error = %err, "Handler service did not respond");
                Ok(Response::send_message(&self.unavailable_text).with_error(err.to_string()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Action, BoxError};
    use courier_framework::{Context, MessageOptions, Router};
    use courier_transport::{BusPublisher, MemoryBus};

    use crate::service::HandlerService;

    #[tokio::test]
    async fn test_ask_round_trip() {
        let config = CourierConfig::default();
        let bus = Arc::new(MemoryBus::new());

        let mut router = Router::new(BusPublisher::new(bus.clone(), &config.bus.reply_stream));
        router.command("/ping", |ctx: Context| async move {
            ctx.send_message("pong", MessageOptions::default());
            Ok::<(), BoxError>(())
        });
        let service = HandlerService::from_config(bus.clone(), router, &config.bus);
        service.start().await.unwrap();

        let gateway = Gateway::connect(bus, &config).await.unwrap();
        let response = gateway.ask(Event::message(3, 3, "/ping")).await.unwrap();

        assert_eq!(response.action, Action::SendMessage);
        assert_eq!(response.text(), Some("pong"));
        assert!(response.error.is_none());
        assert_eq!(gateway.rpc().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_fallback_response() {
        let mut config = CourierConfig::default();
        config.gateway.unavailable_text = "Busy, try later.".into();
        let gateway = Gateway::connect(Arc::new(MemoryBus::new()), &config)
            .await
            .unwrap()
            .with_timeout(Duration::from_millis(100));

        let response = gateway.ask(Event::message(1, 1, "/ping")).await.unwrap();

        assert_eq!(response.text(), Some("Busy, try later."));
        assert!(response.error.as_deref().is_some_and(|e| e.contains("timed out")));
        assert_eq!(gateway.rpc().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let rpc = Arc::new(RpcClient::new(Arc::new(MemoryBus::new())));
        let gateway = Gateway::new(rpc, "unused");

        let err = gateway.ask(Event::message(1, 1, "/ping")).await.unwrap_err();
        assert!(matches!(err, RpcError::NotStarted));
    }
}
