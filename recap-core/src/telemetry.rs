//! Tracing subscriber initialization.
//!
//! Binaries call [`init_tracing`] once at startup. Library code only emits
//! `tracing` events and never installs a subscriber itself.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_or;
use crate::{ConfigError, RecapError, RecapResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
    /// Output format
    pub format: LogFormat,
}

impl TelemetryConfig {
    /// Defaults for a named service.
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_filter: "recap=info,info".to_string(),
            format: LogFormat::Pretty,
        }
    }

    /// Read `RECAP_LOG_FORMAT` (`pretty` or `json`) on top of the defaults.
    pub fn from_env(service_name: impl Into<String>) -> Result<Self, ConfigError> {
        let mut config = Self::for_service(service_name);
        config.format = env_or("RECAP_LOG_FORMAT", config.format)?;
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing(config: &TelemetryConfig) -> RecapResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| {
        RecapError::Config(ConfigError::InvalidValue {
            field: "tracing subscriber".to_string(),
            value: config.service_name.clone(),
            reason: e.to_string(),
        })
    })?;

    tracing::info!(
        service_name = %config.service_name,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("PRETTY".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_telemetry_config_for_service() {
        let config = TelemetryConfig::for_service("recap-aggregate");
        assert_eq!(config.service_name, "recap-aggregate");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.default_filter.contains("recap=info"));
    }
}
