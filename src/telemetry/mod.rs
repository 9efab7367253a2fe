//! # Telemetry Module
//!
//! Handles the inbound telemetry stream.
//!
//! This module handles:
//! - Framing and decoding received bytes into the shared state
//! - Tracking packet counter gaps and inter-packet delay
//! - Running the reader task with cooperative shutdown

pub mod packet_stats;
pub mod pipeline;
pub mod reader;

pub use packet_stats::{PacketStats, PacketStatsTracker};
pub use pipeline::{IngestSummary, TelemetryPipeline};
pub use reader::{spawn_reader, ReaderExit, ReaderHandle};
