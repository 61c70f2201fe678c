//! Configuration for Courier services.
//!
//! Settings are layered with figment (defaults, TOML files, `COURIER_*`
//! environment variables, programmatic overrides) and checked by
//! [`validate_config`] before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BusConfig, CourierConfig, GatewayConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    RpcConfig, SpanEventConfig,
};
pub use validation::validate_config;
