//! Configuration management for ragsync services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Secret acquisition configuration
    pub secret: SecretConfig,

    /// Database pool configuration
    pub database: DatabaseConfig,

    /// Retry policy configuration
    pub retry: RetryConfig,

    /// Ingestion configuration
    pub ingestion: IngestionConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecretConfig {
    /// Opaque identifier of the database credential secret
    pub id: String,

    /// Where the secret bundle is fetched from: "file" or "env"
    #[serde(default = "default_secret_source")]
    pub source: String,

    /// Directory holding file-mounted secrets
    #[serde(default = "default_secret_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Base pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Additional connections allowed beyond the base pool
    #[serde(default = "default_max_overflow")]
    pub max_overflow: u32,

    /// Recycle connections older than this (seconds)
    #[serde(default = "default_recycle")]
    pub recycle_secs: u64,

    /// Connection acquisition timeout in seconds (fail fast)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// application_name reported to the database
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum connection-build attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in seconds; attempt n sleeps base * 2^n
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Expected embedding dimension for every chunk
    #[serde(default = "default_vector_dimension")]
    pub vector_dimension: usize,

    /// Rows per multi-row insert statement
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_secret_source() -> String {
    "file".to_string()
}
fn default_secret_dir() -> String {
    "/run/secrets".to_string()
}
fn default_pool_size() -> u32 {
    5
}
fn default_max_overflow() -> u32 {
    10
}
fn default_recycle() -> u64 {
    1800
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_application_name() -> String {
    "ragsync-ingestion".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    1
}
fn default_vector_dimension() -> usize {
    1536
}
fn default_insert_batch_size() -> usize {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_json_logging() -> bool {
    true
}

impl Settings {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__POOL_SIZE=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Total connection cap: base pool plus overflow allowance
    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }

    /// Get the acquisition timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get the recycle interval as Duration
    pub fn recycle(&self) -> Duration {
        Duration::from_secs(self.recycle_secs)
    }
}

impl RetryConfig {
    /// Get the base backoff delay as Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret: SecretConfig {
                id: "ragsync-db-credentials".to_string(),
                source: default_secret_source(),
                dir: default_secret_dir(),
            },
            database: DatabaseConfig::default(),
            retry: RetryConfig::default(),
            ingestion: IngestionConfig::default(),
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            max_overflow: default_max_overflow(),
            recycle_secs: default_recycle(),
            connect_timeout_secs: default_connect_timeout(),
            application_name: default_application_name(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            vector_dimension: default_vector_dimension(),
            insert_batch_size: default_insert_batch_size(),
        }
    }
}
