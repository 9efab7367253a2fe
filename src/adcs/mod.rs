//! # ADCS Link Protocol Module
//!
//! Implementation of the ASCII telemetry/command protocol spoken by the
//! testbed microcontroller.
//!
//! This module handles:
//! - Framing the raw byte stream into text lines
//! - Decoding telemetry lines into typed events
//! - Encoding validated stepper, motor and IMU commands

pub mod protocol;
pub mod framer;
pub mod decoder;
pub mod encoder;
