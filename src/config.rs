//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{EnoceanError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub learn: LearnConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Connection to the EnOcean module
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path, "auto", or TCP `host[:port]`
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Port used for TCP hosts given without one
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Learn mode configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LearnConfig {
    /// Minimum signal strength for implicit (RPS) teach-in
    #[serde(default = "default_min_learn_dbm")]
    pub min_learn_dbm: i32,

    #[serde(default)]
    pub enable_on_startup: bool,

    /// Learn mode is disabled again after this many seconds
    #[serde(default = "default_learn_timeout_s")]
    pub timeout_s: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; console only if unset
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_stats_interval_packets")]
    pub stats_interval_packets: u64,
}

/// Device store configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// TOML file holding learned-in devices; in-memory only if unset
    #[serde(default)]
    pub path: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 57600 }
fn default_tcp_port() -> u16 { 2102 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_min_learn_dbm() -> i32 { -50 }
fn default_learn_timeout_s() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_stats_interval_packets() -> u64 { 100 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            tcp_port: default_tcp_port(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            min_learn_dbm: default_min_learn_dbm(),
            enable_on_startup: false,
            timeout_s: default_learn_timeout_s(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            stats_interval_packets: default_stats_interval_packets(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> EnoceanError {
    EnoceanError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use enocean_gateway::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 57600, 115200, 230400, 460800].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 57600, 115200, 230400, 460800"));
        }

        if self.serial.tcp_port == 0 {
            return Err(invalid("tcp_port must be greater than 0"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        if !(-120..=0).contains(&self.learn.min_learn_dbm) {
            return Err(invalid("min_learn_dbm must be between -120 and 0"));
        }

        if self.learn.timeout_s == 0 || self.learn.timeout_s > 600 {
            return Err(invalid("learn timeout_s must be between 1 and 600"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        if self.logging.stats_interval_packets == 0 {
            return Err(invalid("stats_interval_packets must be greater than 0"));
        }

        if matches!(&self.store.path, Some(path) if path.is_empty()) {
            return Err(invalid("store path cannot be empty when set"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.learn.min_learn_dbm, -50);
        assert!(!config.learn.enable_on_startup);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_load_config_from_file() {
        let config = load_str(
            r#"
[serial]
port = "gateway.local:4000"
reconnect_interval_ms = 5000

[learn]
min_learn_dbm = -70
enable_on_startup = true

[logging]
level = "debug"
log_dir = "./logs"

[store]
path = "devices.toml"
"#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "gateway.local:4000");
        assert_eq!(config.serial.tcp_port, 2102);
        assert_eq!(config.serial.reconnect_interval_ms, 5000);
        assert_eq!(config.learn.min_learn_dbm, -70);
        assert!(config.learn.enable_on_startup);
        assert_eq!(config.learn.timeout_s, 30);
        assert_eq!(config.logging.log_dir.as_deref(), Some("./logs"));
        assert_eq!(config.store.path.as_deref(), Some("devices.toml"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = load_str("").unwrap();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.logging.stats_interval_packets, 100);
    }

    #[test]
    fn test_invalid_min_learn_dbm() {
        let mut config = Config::default();
        config.learn.min_learn_dbm = 10;
        assert!(config.validate().is_err());

        config.learn.min_learn_dbm = -121;
        assert!(config.validate().is_err());

        config.learn.min_learn_dbm = -120;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.learn.timeout_s = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.stats_interval_packets = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store.path = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let result = load_str("[learn]\nmin_learn_dbm = 5\n");
        assert!(matches!(result, Err(EnoceanError::Config(_))));

        let result = load_str("[serial]\nbaud_rate = \"fast\"\n");
        assert!(matches!(result, Err(EnoceanError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/enocean.toml");
        assert!(matches!(result, Err(EnoceanError::Io(_))));
    }
}
