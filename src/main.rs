//! # ADCS Bridge
//!
//! Ground-side bridge for the reaction-wheel/stepper ADCS testbed.
//!
//! Opens the serial link, streams telemetry into the shared state, forwards
//! setpoint changes as commands and logs link statistics until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use adcs_bridge::config::{Config, LoggingConfig};
use adcs_bridge::control::sender::CommandSender;
use adcs_bridge::control::SetpointBindings;
use adcs_bridge::serial::AdcsSerial;
use adcs_bridge::store::rolling::{AxisChannel, ScalarChannel};
use adcs_bridge::store::state::AdcsState;
use adcs_bridge::telemetry::{spawn_reader, TelemetryPipeline};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Seconds between link status log messages
const STATUS_INTERVAL_SECS: u64 = 5;

/// Main entry point for ADCS Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first CLI argument, or `config/default.toml`)
///    - Set up logging
///    - Open the serial port and split it into telemetry and command halves
///    - Start the telemetry reader and bind setpoint forwarding
///    - Send `imu start` if configured
///
/// 2. **Main Loop**
///    - Log link statistics every 5 seconds
///    - Exit on Ctrl+C or when the telemetry stream ends
///
/// 3. **Graceful Shutdown**
///    - Stop setpoint forwarding
///    - Send `imu stop`
///    - Stop the reader after its current chunk
///
/// # Errors
///
/// Returns error if the configuration is invalid or no serial port can be opened
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path(std::env::args());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let _log_guard = init_logging(&config.logging);

    info!("ADCS Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path.display());

    let state = AdcsState::shared(config.history_capacity());

    let serial = AdcsSerial::open(&config.serial)?;
    info!("ADCS serial port opened at: {}", serial.device_path());
    let (source, sink) = serial.into_split();

    let pipeline = TelemetryPipeline::new(state.clone())
        .with_acceleration_unit(config.telemetry.acceleration_unit);
    let mut reader = spawn_reader(source, pipeline, config.serial.read_buffer_size);

    let sender = Arc::new(CommandSender::new());
    sender.attach(sink).await;

    let bindings = SetpointBindings::bind(
        &state,
        sender.clone(),
        Duration::from_millis(config.control.debounce_ms),
    );

    if config.telemetry.start_imu_on_connect {
        if let Err(e) = sender.imu_start().await {
            warn!("Failed to start IMU streaming: {}", e);
        }
    }

    info!("Press Ctrl+C to exit");

    let mut status = interval(Duration::from_secs(STATUS_INTERVAL_SECS));
    status.tick().await;

    loop {
        tokio::select! {
            _ = status.tick() => log_status(&state),

            exit = reader.wait() => {
                warn!("Telemetry reader ended: {:?}", exit);
                break;
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    bindings.unbind(&state);

    if let Err(e) = sender.imu_stop().await {
        warn!("Failed to stop IMU streaming: {}", e);
    }
    sender.detach().await;

    let exit = reader.stop().await;
    info!("Telemetry reader stopped: {:?}", exit);
    log_status(&state);

    Ok(())
}

/// First CLI argument, or the default configuration path
fn config_path<I: IntoIterator<Item = String>>(args: I) -> PathBuf {
    args.into_iter()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Console logging, plus a daily rotating file when a directory is configured
///
/// The returned guard flushes the file writer when dropped and must be held
/// until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console = fmt::layer();

    if config.directory.is_empty() {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

fn log_status(state: &AdcsState) {
    let stats = state.packet_stats();
    let average_ms = stats
        .average_delay()
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0);

    info!(
        "Packets: {} received, {} skipped, avg delay {:.1} ms",
        stats.total_count, stats.skipped_count, average_ms
    );

    if let Some(angle) = state.channels.latest(AxisChannel::Angle) {
        info!("Angle: ({:.2}, {:.2}, {:.2})", angle.x, angle.y, angle.z);
    }
    if let Some(temperature) = state.channels.latest_scalar(ScalarChannel::Temperature) {
        info!("Temperature: {:.1}", temperature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_default() {
        let args = vec!["adcs-bridge".to_string()];
        assert_eq!(config_path(args), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_config_path_from_args() {
        let args = vec!["adcs-bridge".to_string(), "/etc/adcs.toml".to_string()];
        assert_eq!(config_path(args), PathBuf::from("/etc/adcs.toml"));
    }

    #[test]
    fn test_status_interval_constant() {
        assert_eq!(STATUS_INTERVAL_SECS, 5);
    }

    #[test]
    fn test_log_status_with_empty_state() {
        let state = AdcsState::new(4);
        log_status(&state);
        assert_eq!(state.packet_stats().total_count, 0);
    }
}
