//! Runtime error types.

use courier_core::{RpcError, TransportError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while wiring or running Courier services.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// `start` was called on a service that is already running.
    #[error("service is already running")]
    AlreadyRunning,

    /// Installing a shutdown signal handler failed.
    #[error("failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
