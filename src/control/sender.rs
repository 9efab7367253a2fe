//! # Command Sender
//!
//! Writes validated commands to the attached transport.
//!
//! A command is built first, so a validation failure never reaches the
//! port. With no transport attached, sending fails with
//! `TransportUnavailable` and nothing is written.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::adcs::encoder;
use crate::adcs::protocol::Axis;
use crate::error::{AdcsError, Result};
use crate::serial::port_trait::ByteSink;

/// Shared handle to the outbound side of the link
#[derive(Default)]
pub struct CommandSender {
    sink: Mutex<Option<Box<dyn ByteSink>>>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender").finish_non_exhaustive()
    }
}

impl CommandSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `sink` for all following commands, replacing any previous one
    pub async fn attach<S: ByteSink + 'static>(&self, sink: S) {
        *self.sink.lock().await = Some(Box::new(sink));
        info!("Command transport attached");
    }

    /// Drop the transport; later sends fail with `TransportUnavailable`
    pub async fn detach(&self) {
        if self.sink.lock().await.take().is_some() {
            info!("Command transport detached");
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    /// Write `command` followed by the terminator, then flush
    ///
    /// # Errors
    ///
    /// - `TransportUnavailable` if no transport is attached
    /// - `Serial` if the write or flush fails
    pub async fn send(&self, command: &str) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| AdcsError::TransportUnavailable(format!("cannot send '{}'", command)))?;

        let frame = encoder::encode_wire_command(command);
        sink.write_all(&frame)
            .await
            .map_err(|e| AdcsError::Serial(format!("Failed to write '{}': {}", command, e)))?;
        sink.flush()
            .await
            .map_err(|e| AdcsError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent command: {}", command);
        Ok(())
    }

    /// Move a stepper to `amount` percent of travel
    pub async fn stepper_move(&self, axis: Axis, amount: f64) -> Result<()> {
        let command = encoder::stepper_move(axis.index(), amount)?;
        self.send(&command).await
    }

    /// Drive a motor at a signed speed percentage; 0 sends a stop
    pub async fn motor_set_speed(&self, axis: Axis, percent: f64) -> Result<()> {
        let command = if percent == 0.0 {
            encoder::motor_stop(axis.index())?
        } else {
            encoder::motor_set_speed(axis.index(), percent)?
        };
        self.send(&command).await
    }

    pub async fn motor_stop(&self, axis: Axis) -> Result<()> {
        let command = encoder::motor_stop(axis.index())?;
        self.send(&command).await
    }

    pub async fn imu_start(&self) -> Result<()> {
        self.send(&encoder::imu_start()).await
    }

    pub async fn imu_stop(&self) -> Result<()> {
        self.send(&encoder::imu_stop()).await
    }
}
