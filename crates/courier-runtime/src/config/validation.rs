//! Configuration validation utilities.

use courier_transport::MAX_CHANNEL_CAPACITY;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BusConfig, CourierConfig, LogFormat, LogLevel, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_bus_config(&config.bus)?;

    if config.rpc.timeout_ms == 0 {
        return Err(ConfigError::validation("RPC timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (module, level) in &logging.filters {
        if level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::validation(format!(
                "Invalid log level for '{module}': {level}. Valid values are: {:?}",
                LogLevel::ALL.map(|l| l.as_str())
            )));
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "File log output requires logging.file_path",
        ));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the 'json-log' feature",
        ));
    }

    Ok(())
}

fn validate_bus_config(bus: &BusConfig) -> ConfigResult<()> {
    if bus.request_stream.trim().is_empty() {
        return Err(ConfigError::validation("bus.request_stream must not be empty"));
    }

    if bus.reply_stream.trim().is_empty() {
        return Err(ConfigError::validation("bus.reply_stream must not be empty"));
    }

    if bus.request_stream == bus.reply_stream {
        return Err(ConfigError::validation(format!(
            "Request and reply streams must differ (both are '{}')",
            bus.request_stream
        )));
    }

    if bus.channel_capacity == 0 {
        return Err(ConfigError::validation(
            "bus.channel_capacity must be greater than 0",
        ));
    }

    if bus.channel_capacity > MAX_CHANNEL_CAPACITY {
        return Err(ConfigError::validation(format!(
            "bus.channel_capacity must be at most {MAX_CHANNEL_CAPACITY} (got {})",
            bus.channel_capacity
        )));
    }

    Ok(())
}
