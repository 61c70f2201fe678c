//! Middleware hooks around dispatch.
//!
//! Middleware runs strictly sequentially in registration order: every
//! `before` hook runs before route selection, every `after` hook runs once
//! the responses have been published. A failing hook aborts the rest of the
//! pipeline for that event:
//!
//! - `before` failure: no handler runs and nothing is published.
//! - `after` failure: responses are already out; remaining hooks are skipped.

use async_trait::async_trait;
use courier_core::{BoxError, Event, Response};
use tracing::{debug, info};

/// Before/after hooks around a dispatch.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in error reports and logs.
    fn name(&self) -> &str {
        "middleware"
    }

    /// Runs before route selection.
    async fn before(&self, _event: &Event) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs after publishing with the complete response list.
    async fn after(&self, _event: &Event, _responses: &[Response]) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Logs every event and the number of responses it produced.
#[derive(Debug, Clone, Default)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn before(&self, event: &Event) -> Result<(), BoxError> {
        debug!(
            user_id = event.user_id,
            chat_id = event.chat_id,
            event_type = %event.event_type,
            text = event.text().unwrap_or_default(),
            callback_data = event.callback_data().unwrap_or_default(),
            "Event received"
        );
        Ok(())
    }

    async fn after(&self, event: &Event, responses: &[Response]) -> Result<(), BoxError> {
        info!(
            user_id = event.user_id,
            correlation_id = event.correlation_id().unwrap_or("-"),
            responses = responses.len(),
            "Event handled"
        );
        Ok(())
    }
}
