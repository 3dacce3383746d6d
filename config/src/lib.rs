//! # Configuration Management for defi-queries
//!
//! This crate provides centralized configuration structures for the query
//! cache and the signal system.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{QueryConfig, SignalConfig};
//!
//! // Query cache configuration
//! let query_config = QueryConfig::new(30_000, 300_000, 60_000, 0, 1_000, true);
//!
//! // Signal configuration
//! let signal_config = SignalConfig::new(64);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [query]
//! stale_time_ms = 30000
//! gc_time_ms = 300000
//! gc_interval_ms = 60000
//! retry = 0
//! retry_delay_ms = 1000
//! refetch_on_invalidate = true
//!
//! [signal]
//! max_callbacks = 64
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from defi-queries.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./defi-queries.toml";
const CONFIG_PATH_VAR: &str = "DEFI_QUERIES_CONFIG";
const MAX_RETRY: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Age after which a successful entry is considered stale
    pub stale_time_ms: u64,
    /// How long an entry without observers is retained
    pub gc_time_ms: u64,
    /// Sweep period of the background collector
    pub gc_interval_ms: u64,
    /// Extra attempts after a failed fetch
    pub retry: u32,
    /// Fixed delay between attempts
    pub retry_delay_ms: u64,
    /// Refetch observed entries as soon as they are invalidated
    pub refetch_on_invalidate: bool,
}

/// Signal system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub max_callbacks: usize,
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, a malformed one is not
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        // Try the path from DEFI_QUERIES_CONFIG first
        if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        }
        // Try to load config from DEFAULT_CONFIG_PATH
        else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        }
        // Return error if neither .env variable nor default config file exists
        else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.query.validate()?;
        self.signal.validate()
    }
}

impl QueryConfig {
    /// Create a new query cache configuration
    pub fn new(
        stale_time_ms: u64,
        gc_time_ms: u64,
        gc_interval_ms: u64,
        retry: u32,
        retry_delay_ms: u64,
        refetch_on_invalidate: bool,
    ) -> Self {
        Self {
            stale_time_ms,
            gc_time_ms,
            gc_interval_ms,
            retry,
            retry_delay_ms,
            refetch_on_invalidate,
        }
    }

    pub fn with_stale_time_ms(mut self, stale_time_ms: u64) -> Self {
        self.stale_time_ms = stale_time_ms;
        self
    }

    pub fn with_gc_time_ms(mut self, gc_time_ms: u64) -> Self {
        self.gc_time_ms = gc_time_ms;
        self
    }

    pub fn with_retry(mut self, retry: u32, retry_delay_ms: u64) -> Self {
        self.retry = retry;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_ms)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gc_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Query gc_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.gc_time_ms < self.stale_time_ms {
            return Err(ConfigError::Invalid(
                "Query gc_time_ms cannot be less than stale_time_ms".to_string(),
            ));
        }
        if self.retry > MAX_RETRY {
            return Err(ConfigError::Invalid(format!(
                "Query retry cannot exceed {}",
                MAX_RETRY
            )));
        }
        Ok(())
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 30_000,
            gc_time_ms: 300_000,
            gc_interval_ms: 60_000,
            retry: 0,
            retry_delay_ms: 1_000,
            refetch_on_invalidate: true,
        }
    }
}

impl SignalConfig {
    /// Create a new signal configuration
    pub fn new(max_callbacks: usize) -> Self {
        Self { max_callbacks }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_callbacks == 0 {
            return Err(ConfigError::Invalid(
                "Signal max_callbacks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { max_callbacks: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = AppConfig::from_toml_str(
            r#"
            [query]
            stale_time_ms = 5000
            gc_time_ms = 10000
            gc_interval_ms = 1000
            retry = 2
            retry_delay_ms = 250
            refetch_on_invalidate = false

            [signal]
            max_callbacks = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.query.stale_time(), Duration::from_secs(5));
        assert_eq!(config.query.retry, 2);
        assert!(!config.query.refetch_on_invalidate);
        assert_eq!(config.signal.max_callbacks, 8);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AppConfig::from_toml_str("[query]\nretry = 1\n").unwrap();
        assert_eq!(config.query.retry, 1);
        assert_eq!(config.query.stale_time_ms, 30_000);
        assert_eq!(config.signal.max_callbacks, 64);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_toml_str("[query]\ngc_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err =
            AppConfig::from_toml_str("[query]\nstale_time_ms = 10\ngc_time_ms = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AppConfig::from_toml_str("[query]\nretry = 11\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AppConfig::from_toml_str("[signal]\nmax_callbacks = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[query\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("defi-queries-{}.toml", std::process::id()));
        std::fs::write(&path, "[signal]\nmax_callbacks = 3\n").unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.signal.max_callbacks, 3);

        let err = AppConfig::from_file("/nonexistent/defi-queries.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
