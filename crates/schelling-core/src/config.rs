//! Configuration loading and typed config structures for the board server.
//!
//! The configuration lives in `schelling-config.yaml` next to the binary's
//! working directory. Every field has a default, so an empty or missing
//! file yields a runnable server.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::hub::DEFAULT_VIEWER_QUEUE_CAPACITY;
use crate::scenario::{DEFAULT_MIDDLE_THRESHOLD, MAX_MIDDLE_THRESHOLD};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `schelling-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchellingConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ServerSettings,

    /// Board setup.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Viewer fan-out.
    #[serde(default)]
    pub broadcast: BroadcastSettings,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SchellingConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override the file for the listen address:
    /// - `SCHELLING_HOST` overrides `server.host`
    /// - `SCHELLING_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse fine but cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.simulation.middle_threshold;
        if !(0..=i64::from(MAX_MIDDLE_THRESHOLD)).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "simulation.middle_threshold must be between 0 and {MAX_MIDDLE_THRESHOLD}, got {threshold}"
            )));
        }
        if self.broadcast.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.heartbeat_interval_ms must be positive".to_owned(),
            ));
        }
        if self.broadcast.viewer_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.viewer_queue_capacity must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Listen address settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override the listen address with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `SCHELLING_PORT` is not a port
    /// number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SCHELLING_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("SCHELLING_PORT") {
            self.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("SCHELLING_PORT={val}: {e}")))?;
        }
        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Board setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSettings {
    /// Seed for placement shuffles. Unset means a fresh OS seed per run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Initial middle-cell threshold (0-8).
    #[serde(default = "default_middle_threshold")]
    pub middle_threshold: i64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            middle_threshold: default_middle_threshold(),
        }
    }
}

/// Viewer fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastSettings {
    /// Milliseconds between unconditional re-broadcasts.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Undelivered snapshots a viewer may lag behind before it is dropped.
    #[serde(default = "default_viewer_queue_capacity")]
    pub viewer_queue_capacity: usize,
}

impl BroadcastSettings {
    /// The heartbeat period as a [`Duration`].
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            viewer_queue_capacity: default_viewer_queue_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (e.g. `info`,
    /// `schelling_core=debug`). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

fn default_middle_threshold() -> i64 {
    i64::from(DEFAULT_MIDDLE_THRESHOLD)
}

const fn default_heartbeat_interval_ms() -> u64 {
    5000
}

const fn default_viewer_queue_capacity() -> usize {
    DEFAULT_VIEWER_QUEUE_CAPACITY
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SchellingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.simulation.middle_threshold, 3);
        assert_eq!(config.simulation.seed, None);
        assert_eq!(config.broadcast.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.broadcast.viewer_queue_capacity, 64);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9100

simulation:
  seed: 42
  middle_threshold: 4

broadcast:
  heartbeat_interval_ms: 2500
  viewer_queue_capacity: 8

logging:
  level: "debug"
  format: json
"#;
        let config = SchellingConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.middle_threshold, 4);
        assert_eq!(config.broadcast.heartbeat_interval_ms, 2500);
        assert_eq!(config.broadcast.viewer_queue_capacity, 8);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let config = SchellingConfig::parse("simulation:\n  seed: 7\n").unwrap();
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.middle_threshold, 3);
        assert_eq!(config.server, ServerSettings::default());
    }

    #[test]
    fn parse_empty_yaml_gives_defaults() {
        assert_eq!(SchellingConfig::parse("").unwrap(), SchellingConfig::default());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result = SchellingConfig::parse("simulation:\n  middle_threshold: 9\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let result = SchellingConfig::parse("simulation:\n  middle_threshold: -1\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_interval_or_capacity_is_rejected() {
        let result = SchellingConfig::parse("broadcast:\n  heartbeat_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let result = SchellingConfig::parse("broadcast:\n  viewer_queue_capacity: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = SchellingConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SchellingConfig::from_file(Path::new("/nonexistent/schelling-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
