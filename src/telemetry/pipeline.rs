//! # Telemetry Pipeline
//!
//! Raw bytes in, store updates out: framing, decoding and dispatch of each
//! event to the channel histories and packet statistics.
//!
//! Bad lines never stop the pipeline. Invalid UTF-8 is dropped by the
//! framer, malformed content is logged and skipped.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adcs::decoder::decode_line;
use crate::adcs::framer::LineFramer;
use crate::adcs::protocol::TelemetryEvent;
use crate::config::AccelerationUnit;
use crate::store::rolling::{AxisChannel, ScalarChannel};
use crate::store::state::AdcsState;

/// Outcome of one [`TelemetryPipeline::ingest`] call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Complete text lines framed
    pub lines: usize,
    /// Lines decoded into a stored event
    pub events: usize,
    /// Lines with an unknown prefix
    pub unrecognized: usize,
    /// Lines dropped for bad encoding or bad content
    pub errors: usize,
}

/// Framer plus decoder feeding an [`AdcsState`]
#[derive(Debug)]
pub struct TelemetryPipeline {
    framer: LineFramer,
    state: Arc<AdcsState>,
    acceleration_factor: f64,
}

impl TelemetryPipeline {
    #[must_use]
    pub fn new(state: Arc<AdcsState>) -> Self {
        Self {
            framer: LineFramer::new(),
            state,
            acceleration_factor: AccelerationUnit::default().to_mps2_factor(),
        }
    }

    /// Declare the unit the firmware reports acceleration in
    #[must_use]
    pub fn with_acceleration_unit(mut self, unit: AccelerationUnit) -> Self {
        self.acceleration_factor = unit.to_mps2_factor();
        self
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AdcsState> {
        &self.state
    }

    /// Feed a chunk of received bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use adcs_bridge::store::state::AdcsState;
    /// use adcs_bridge::store::rolling::ScalarChannel;
    /// use adcs_bridge::telemetry::pipeline::TelemetryPipeline;
    ///
    /// let state = AdcsState::shared(40);
    /// let mut pipeline = TelemetryPipeline::new(state.clone());
    /// let summary = pipeline.ingest(b"temp21.5\ngarbage\n");
    /// assert_eq!(summary.lines, 2);
    /// assert_eq!(summary.unrecognized, 1);
    /// assert_eq!(state.channels.latest_scalar(ScalarChannel::Temperature), Some(21.5));
    /// ```
    pub fn ingest(&mut self, bytes: &[u8]) -> IngestSummary {
        let discarded_before = self.framer.discarded_lines();
        let mut summary = IngestSummary::default();

        for line in self.framer.feed(bytes) {
            if line.is_empty() {
                continue;
            }
            summary.lines += 1;
            self.state.publish_raw_line(&line);

            match decode_line(&line) {
                Ok(TelemetryEvent::Unrecognized(text)) => {
                    summary.unrecognized += 1;
                    debug!("Ignoring unrecognized line: {:?}", text);
                }
                Ok(event) => {
                    summary.events += 1;
                    dispatch(&self.state, self.acceleration_factor, event);
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!("Skipping telemetry line: {}", e);
                }
            }
        }

        summary.errors += (self.framer.discarded_lines() - discarded_before) as usize;
        summary
    }

    /// Store an already decoded event
    pub fn apply_event(&self, event: TelemetryEvent) {
        dispatch(&self.state, self.acceleration_factor, event);
    }

    /// Drop any partial line, e.g. after reconnecting
    pub fn reset(&mut self) {
        self.framer.reset();
    }
}

fn dispatch(state: &AdcsState, acceleration_factor: f64, event: TelemetryEvent) {
    match event {
        TelemetryEvent::PacketCounter(number) => {
            let stats = state.record_packet(number);
            debug!(
                "Packet {} (total {}, skipped {})",
                number, stats.total_count, stats.skipped_count
            );
        }
        TelemetryEvent::Acceleration(sample) => state
            .channels
            .push_vector(AxisChannel::Acceleration, sample.scaled(acceleration_factor)),
        TelemetryEvent::AngularVelocity(sample) => {
            state.channels.push_vector(AxisChannel::Gyroscope, sample)
        }
        TelemetryEvent::Orientation(sample) => {
            state.channels.push_vector(AxisChannel::Angle, sample)
        }
        TelemetryEvent::Temperature(value) => {
            state.channels.push_scalar(ScalarChannel::Temperature, value)
        }
        TelemetryEvent::Unrecognized(_) => {}
    }
}
