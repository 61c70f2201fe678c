//! Unified error types for Courier.
//!
//! Unmatched events and replies bearing unknown correlation ids are not
//! errors and have no variant here.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by application handlers and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by publishers and message buses.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The bus connection is not available.
    #[error("bus is not connected")]
    NotConnected,

    /// A publish failed.
    #[error("failed to publish to '{stream}': {reason}")]
    SendFailed {
        /// The destination stream.
        stream: String,
        /// Reason for failure.
        reason: String,
    },

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The subscription was closed.
    #[error("subscription closed")]
    SubscriptionClosed,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn send_failed(stream: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            stream: stream.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Which middleware hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewarePhase {
    Before,
    After,
}

impl fmt::Display for MiddlewarePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Errors surfaced by `Router::dispatch`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A middleware hook failed; the rest of the pipeline was skipped.
    #[error("middleware '{middleware}' failed in {phase} hook: {source}")]
    Middleware {
        middleware: String,
        phase: MiddlewarePhase,
        #[source]
        source: BoxError,
    },

    /// The selected handler failed.
    #[error("handler for route #{route} failed: {source}")]
    Handler {
        /// Index of the route in registration order.
        route: usize,
        #[source]
        source: BoxError,
    },

    /// Publishing a response failed. Nothing is retried.
    #[error(transparent)]
    Publish(#[from] TransportError),
}

impl DispatchError {
    /// Returns the middleware phase if this is a middleware failure.
    pub fn middleware_phase(&self) -> Option<MiddlewarePhase> {
        match self {
            Self::Middleware { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler { .. })
    }

    pub fn is_publish_failure(&self) -> bool {
        matches!(self, Self::Publish(_))
    }
}

// =============================================================================
// RPC Errors
// =============================================================================

/// Errors returned by the correlation-based RPC client.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// No matching reply arrived in time.
    #[error("RPC call timed out after {0:?}")]
    Timeout(Duration),

    /// `call` was invoked before `start`.
    #[error("RPC client is not started")]
    NotStarted,

    /// `start` was invoked twice.
    #[error("RPC client is already started")]
    AlreadyStarted,

    /// The reply could not be decoded into a response.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// The client was shut down while the call or start was waiting.
    #[error("RPC call cancelled")]
    Cancelled,

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RpcError {
    /// Returns `true` for timeouts, which callers should turn into a graceful
    /// "service unavailable" outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for RPC calls.
pub type RpcResult<T> = Result<T, RpcError>;
