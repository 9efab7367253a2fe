//! # Error Types
//!
//! Custom error types for ADCS Bridge using `thiserror`.
//!
//! Per-line and per-sample failures (`Framing`, `TelemetryParse`) are local:
//! the telemetry pipeline logs and absorbs them. `OutOfRange` and
//! `ConfigSchema` are returned to the caller. `TransportUnavailable` is the
//! result of a command issued while no serial link is attached.

use thiserror::Error;

/// Main error type for ADCS Bridge
#[derive(Debug, Error)]
pub enum AdcsError {
    /// A framed line was not valid UTF-8
    #[error("Framing error: {0}")]
    Framing(String),

    /// A telemetry line had bad numeric or structural content
    #[error("Telemetry parse error: {0}")]
    TelemetryParse(String),

    /// A command argument was outside its allowed range
    #[error("{what} {value} is out of range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A persisted JSON snapshot did not match its schema
    #[error("Config schema error: {0}")]
    ConfigSchema(String),

    /// No open transport to write a command to
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// A change listener reported a failure
    #[error("Listener error: {0}")]
    Listener(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON syntax errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ADCS Bridge
pub type Result<T> = std::result::Result<T, AdcsError>;
