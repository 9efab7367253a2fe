//! # Serial Communication Module
//!
//! Handles the USB serial link to the ADCS testbed microcontroller.
//!
//! This module handles:
//! - Opening the port with configured baud rate and framing (no parity, no flow control)
//! - Splitting the port into a telemetry source and a command sink
//! - Trying fallback device paths

pub mod port_trait;

use crate::config::SerialConfig;
use crate::error::{AdcsError, Result};
use port_trait::{ReaderSource, WriterSink};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Fallback device paths tried after the configured one
const FALLBACK_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (most dev boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Telemetry half of an opened port
pub type SerialSource = ReaderSource<ReadHalf<tokio_serial::SerialStream>>;

/// Command half of an opened port
pub type SerialSink = WriterSink<WriteHalf<tokio_serial::SerialStream>>;

/// ADCS Serial Port Handler
pub struct AdcsSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for AdcsSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdcsSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl AdcsSerial {
    /// Open the configured port, falling back to common device paths
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no path could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use adcs_bridge::config::SerialConfig;
    /// use adcs_bridge::serial::AdcsSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = AdcsSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut paths: Vec<&str> = vec![config.port.as_str()];
        paths.extend(FALLBACK_DEVICE_PATHS.iter().filter(|p| **p != config.port));
        Self::open_with_paths(config, &paths)
    }

    /// Open the first path in `paths` that succeeds
    ///
    /// # Arguments
    ///
    /// * `config` - Baud rate and framing
    /// * `paths` - Device paths to try, in order
    pub fn open_with_paths(config: &SerialConfig, paths: &[&str]) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, config) {
                Ok(port) => {
                    info!("Opened ADCS device at {} ({} baud)", path, config.baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(AdcsError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, config: &SerialConfig) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .parity(tokio_serial::Parity::None)
            .stop_bits(stop_bits(config.stop_bits)?)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| AdcsError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into the telemetry source and the command sink
    pub fn into_split(self) -> (SerialSource, SerialSink) {
        let (read, write) = tokio::io::split(self.port);
        (ReaderSource::new(read), WriterSink::new(write))
    }
}

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(AdcsError::Serial(format!("Unsupported data bits: {}", other))),
    }
}

fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        other => Err(AdcsError::Serial(format!("Unsupported stop bits: {}", other))),
    }
}
