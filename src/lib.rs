//! # ADCS Bridge Library
//!
//! Telemetry and command core for a reaction-wheel/stepper attitude control
//! testbed connected over USB serial.
//!
//! The testbed streams newline-delimited ASCII telemetry (packet counter,
//! accelerometer, gyroscope, orientation, temperature) and accepts ASCII
//! commands (stepper moves, motor PWM duty, IMU start/stop). This library
//! frames and decodes the telemetry into rolling per-channel histories,
//! tracks link statistics, and encodes validated commands.

pub mod adcs;
pub mod config;
pub mod control;
pub mod error;
pub mod serial;
pub mod store;
pub mod telemetry;
