use crate::pool::DEFAULT_PORT;
use crate::utils::error::{ConnPoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Seconds an idle connection stays pooled before it is closed
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Port used when an address names only a host
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Bound for dials made by `get` (milliseconds). Unset means unbounded.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub tcp_nodelay: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String, // "json" or "pretty"
}

// Default values
fn default_keep_alive_secs() -> u64 {
    60
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
            default_port: default_port(),
            connect_timeout_ms: None,
            tcp_nodelay: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PoolSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<()> {
        if self.keep_alive_secs == 0 {
            return Err(ConnPoolError::Config(
                "pool.keep_alive_secs must be greater than zero".to_string(),
            ));
        }

        if self.default_port == 0 {
            return Err(ConnPoolError::Config(
                "pool.default_port cannot be 0".to_string(),
            ));
        }

        if self.connect_timeout_ms == Some(0) {
            return Err(ConnPoolError::Config(
                "pool.connect_timeout_ms must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConnPoolError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConnPoolError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConnPoolError::Config(format!(
                "Invalid log format: {}. Must be 'pretty' or 'json'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let example = r#"[pool]
keep_alive_secs = 60      # Idle connections are closed after this many seconds
default_port = 80         # Applied to addresses given without a port
# connect_timeout_ms = 5000  # Bound plain checkouts; unbounded when unset
tcp_nodelay = false

[logging]
level = "info"  # Options: "trace", "debug", "info", "warn", "error"
format = "pretty"  # Options: "pretty", "json"
"#;

        std::fs::write(path.as_ref(), example).map_err(|e| {
            ConnPoolError::Config(format!("Failed to write example config: {}", e))
        })?;

        Ok(())
    }
}
