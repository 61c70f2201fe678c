//! Courier Runtime - wiring layer for Courier services.
//!
//! This crate provides:
//! - Layered configuration (`CourierConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - `HandlerService`, which binds a `Router` to the request stream
//! - `Gateway`, which asks handler services over RPC and turns timeouts into a
//!   fallback response
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_runtime::{ConfigLoader, Gateway, HandlerService, logging};
//! use courier_transport::{BusPublisher, MemoryBus};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bus = Arc::new(MemoryBus::with_capacity(config.bus.channel_capacity));
//!     let mut router = Router::new(BusPublisher::new(bus.clone(), &config.bus.reply_stream));
//!     router.command("/ping", ping);
//!
//!     let service = HandlerService::from_config(bus.clone(), router, &config.bus);
//!     service.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod service;

pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use gateway::Gateway;
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use service::{HandlerService, wait_for_shutdown};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Commonly used logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
