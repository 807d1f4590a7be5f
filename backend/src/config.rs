//! Configuration management for the GDD tracker
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with GDD_ prefix

use config::builder::{ConfigBuilder, DefaultState};
use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::ExtractionPolicy;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Weather and geocoding API configuration
    pub weather: WeatherConfig,

    /// Accumulation engine configuration
    pub gdd: GddConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Hourly history API endpoint
    pub history_endpoint: String,

    /// Direct geocoding API endpoint
    pub geocoding_endpoint: String,

    /// OpenWeatherMap API key
    pub api_key: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GddConfig {
    /// How daily min/max temperatures are derived from hourly samples
    pub extraction_policy: ExtractionPolicy,

    /// Location used when a request does not name one
    pub default_location: String,

    /// Base temperature used when a request does not give one
    pub default_base_temperature: Decimal,

    /// Upper bound on a whole day-range scan
    pub scan_deadline_secs: Option<u64>,
}

impl GddConfig {
    pub fn scan_deadline(&self) -> Option<Duration> {
        self.scan_deadline_secs.map(Duration::from_secs)
    }
}

/// Default upper bound on one scan, in seconds
pub const DEFAULT_SCAN_DEADLINE_SECS: u64 = 25;

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("GDD_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GDD_ prefix)
            .add_source(
                Environment::with_prefix("GDD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default(
                "weather.history_endpoint",
                "https://history.openweathermap.org/data/2.5/history/city",
            )?
            .set_default(
                "weather.geocoding_endpoint",
                "https://api.openweathermap.org/geo/1.0/direct",
            )?
            .set_default("weather.request_timeout_secs", 10)?
            .set_default("gdd.extraction_policy", "full_sweep")?
            .set_default("gdd.default_location", "Larnaca")?
            .set_default("gdd.default_base_temperature", "10")?
            // One history request per scanned day
            .set_default("gdd.scan_deadline_secs", DEFAULT_SCAN_DEADLINE_SECS)
    }
}
