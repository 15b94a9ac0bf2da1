//! Configuration management for PriceLab.
//!
//! All configurable parameters in one place with environment variable
//! overrides. Sensible defaults, configurable in production.

use std::env;
use std::net::IpAddr;
use tracing::info;

use crate::constants::DEFAULT_CONFIDENCE_LEVEL;

/// Server configuration loaded at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Bind port
    pub port: u16,
    /// Confidence level applied to experiment analysis
    pub confidence_level: f64,
    /// Days to keep funnel events before the retention sweep drops them
    pub event_retention_days: i64,
    /// Hours between retention sweeps
    pub purge_interval_hours: u64,
    /// Max in-flight requests before new ones queue
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8700,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            event_retention_days: 180,
            purge_interval_hours: 12,
            max_concurrent_requests: 512,
        }
    }
}

impl ServerConfig {
    /// Load from environment variables, falling back to defaults on
    /// missing or unparseable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("PRICELAB_HOST") {
            if let Ok(host) = val.parse() {
                config.host = host;
            }
        }

        if let Ok(val) = env::var("PRICELAB_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = env::var("PRICELAB_CONFIDENCE_LEVEL") {
            if let Ok(level) = val.parse::<f64>() {
                match crate::validation::validate_confidence_level(level) {
                    Ok(()) => config.confidence_level = level,
                    Err(e) => tracing::warn!(
                        "ignoring PRICELAB_CONFIDENCE_LEVEL: {e}, keeping {}",
                        config.confidence_level
                    ),
                }
            }
        }

        if let Ok(val) = env::var("PRICELAB_EVENT_RETENTION_DAYS") {
            if let Ok(days) = val.parse() {
                config.event_retention_days = days;
            }
        }

        if let Ok(val) = env::var("PRICELAB_PURGE_INTERVAL_HOURS") {
            if let Ok(hours) = val.parse() {
                config.purge_interval_hours = hours;
            }
        }

        if let Ok(val) = env::var("PRICELAB_MAX_CONCURRENT_REQUESTS") {
            if let Ok(max) = val.parse() {
                config.max_concurrent_requests = max;
            }
        }

        info!(
            host = %config.host,
            port = config.port,
            confidence_level = config.confidence_level,
            event_retention_days = config.event_retention_days,
            "configuration loaded"
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8700);
        assert!((config.confidence_level - 0.95).abs() < 1e-12);
        assert!(config.event_retention_days > 0);
    }
}
