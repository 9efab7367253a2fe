//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so a partial (or empty) file is valid.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::adcs::protocol::STANDARD_GRAVITY;
use crate::error::{AdcsError, Result};

/// Baud rates accepted by the testbed firmware
pub const SUPPORTED_BAUD_RATES: &[u32] =
    &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Unit the firmware reports acceleration in
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationUnit {
    /// Metres per second squared, stored as received
    #[default]
    Mps2,
    /// Multiples of standard gravity, converted to m/s² before storing
    G,
}

impl AccelerationUnit {
    /// Factor that converts a reported value to m/s²
    #[must_use]
    pub fn to_mps2_factor(self) -> f64 {
        match self {
            Self::Mps2 => 1.0,
            Self::G => STANDARD_GRAVITY,
        }
    }
}

/// Telemetry history configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Time span kept per channel
    #[serde(default = "default_history_window_ms")]
    pub history_window_ms: u64,

    /// Expected interval between samples
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default)]
    pub acceleration_unit: AccelerationUnit,

    /// Send `imu start` right after the port opens
    #[serde(default = "default_start_imu_on_connect")]
    pub start_imu_on_connect: bool,
}

/// Command forwarding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    /// Quiet period before a changed setpoint is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily log files; empty logs to the console only
    #[serde(default)]
    pub directory: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_data_bits() -> u8 { 8 }
fn default_stop_bits() -> u8 { 1 }
fn default_read_buffer_size() -> usize { 1024 }

fn default_history_window_ms() -> u64 { 2000 }
fn default_sample_interval_ms() -> u64 { 50 }
fn default_start_imu_on_connect() -> bool { true }

fn default_debounce_ms() -> u64 { 300 }

fn default_file_prefix() -> String { "adcs-bridge.log".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_window_ms: default_history_window_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            acceleration_unit: AccelerationUnit::default(),
            start_imu_on_connect: default_start_imu_on_connect(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
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
    /// use adcs_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Samples kept per channel: the history window divided by the sample
    /// interval, at least 1
    ///
    /// # Examples
    ///
    /// ```
    /// use adcs_bridge::config::Config;
    ///
    /// assert_eq!(Config::default().history_capacity(), 40);
    /// ```
    #[must_use]
    pub fn history_capacity(&self) -> usize {
        let interval = self.telemetry.sample_interval_ms.max(1);
        (self.telemetry.history_window_ms / interval).max(1) as usize
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

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(invalid("data_bits must be between 5 and 8"));
        }

        if self.serial.stop_bits != 1 && self.serial.stop_bits != 2 {
            return Err(invalid("stop_bits must be 1 or 2"));
        }

        if self.serial.read_buffer_size == 0 || self.serial.read_buffer_size > 65536 {
            return Err(invalid("read_buffer_size must be between 1 and 65536"));
        }

        if self.telemetry.history_window_ms < 50 || self.telemetry.history_window_ms > 60000 {
            return Err(invalid("history_window_ms must be between 50 and 60000"));
        }

        if self.telemetry.sample_interval_ms == 0 || self.telemetry.sample_interval_ms > 10000 {
            return Err(invalid("sample_interval_ms must be between 1 and 10000"));
        }

        if self.telemetry.sample_interval_ms > self.telemetry.history_window_ms {
            return Err(invalid("sample_interval_ms must not exceed history_window_ms"));
        }

        if self.control.debounce_ms > 10000 {
            return Err(invalid("debounce_ms must be between 0 and 10000"));
        }

        if !self.logging.directory.is_empty() && self.logging.file_prefix.is_empty() {
            return Err(invalid("logging file_prefix cannot be empty when a directory is set"));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> AdcsError {
    AdcsError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.control.debounce_ms, 300);
        assert_eq!(config.telemetry.acceleration_unit, AccelerationUnit::Mps2);
        assert!(config.logging.directory.is_empty());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.telemetry.history_window_ms, 2000);
        assert_eq!(config.telemetry.sample_interval_ms, 50);
        assert!(config.telemetry.start_imu_on_connect);
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 921600

[telemetry]
acceleration_unit = "g"

[control]
debounce_ms = 0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.telemetry.acceleration_unit, AccelerationUnit::G);
        assert_eq!(config.control.debounce_ms, 0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/adcs-bridge.toml");
        assert!(matches!(result, Err(AdcsError::Io(_))));
    }

    #[test]
    fn test_invalid_toml_syntax() {
        assert!(matches!(Config::from_toml("[serial\nport = "), Err(AdcsError::Config(_))));
    }

    #[test]
    fn test_unknown_acceleration_unit() {
        let result = Config::from_toml("[telemetry]\nacceleration_unit = \"furlongs\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("baud_rate"));
    }

    #[test]
    fn test_invalid_serial_framing() {
        let mut config = Config::default();
        config.serial.data_bits = 9;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.stop_bits = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.read_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_port_rejected() {
        let mut config = Config::default();
        config.serial.port.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_bounds() {
        let mut config = Config::default();
        config.telemetry.history_window_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.telemetry.sample_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.telemetry.history_window_ms = 100;
        config.telemetry.sample_interval_ms = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debounce_bounds() {
        let mut config = Config::default();
        config.control.debounce_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_prefix_required_with_directory() {
        let mut config = Config::default();
        config.logging.directory = "./logs".to_string();
        config.logging.file_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_capacity() {
        let mut config = Config::default();
        assert_eq!(config.history_capacity(), 40);

        config.telemetry.history_window_ms = 1000;
        config.telemetry.sample_interval_ms = 300;
        assert_eq!(config.history_capacity(), 3);

        config.telemetry.history_window_ms = 50;
        config.telemetry.sample_interval_ms = 50;
        assert_eq!(config.history_capacity(), 1);
    }

    #[test]
    fn test_acceleration_factor() {
        assert_eq!(AccelerationUnit::Mps2.to_mps2_factor(), 1.0);
        assert_eq!(AccelerationUnit::G.to_mps2_factor(), STANDARD_GRAVITY);
    }

    #[test]
    fn test_shipped_default_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.history_capacity(), 40);
    }
}
