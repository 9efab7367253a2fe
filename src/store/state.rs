//! # Shared ADCS State
//!
//! One [`AdcsState`] is created at startup and shared through an `Arc`
//! between the telemetry reader, command forwarding and any views.
//!
//! The reader task is the only writer of the telemetry side (channel
//! histories, packet statistics, raw lines). Setpoints are written by the
//! command side only.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::observable::{lock, Listener, ListenerId, ListenerSet, ObservableValue};
use super::rolling::RollingChannelStore;
use super::setpoints::{AngularVelocityValues, MotorAxisValues, PidValues, StepperAxisValues};
use super::snapshot::{
    load_snapshot, save_snapshot, AngularVelocitySnapshot, MotorSnapshot, PidSnapshot,
    StepperSnapshot,
};
use crate::error::Result;
use crate::telemetry::packet_stats::{PacketStats, PacketStatsTracker};

/// Link statistics published as observables after every counter packet
#[derive(Debug)]
pub struct PacketStatsValues {
    pub total_packets: ObservableValue<u64>,
    pub skipped_packets: ObservableValue<u64>,
    pub average_delay_ms: ObservableValue<f64>,
    pub min_delay_ms: ObservableValue<Option<f64>>,
    pub max_delay_ms: ObservableValue<Option<f64>>,
}

impl Default for PacketStatsValues {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketStatsValues {
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_packets: ObservableValue::new(0, "total_packets"),
            skipped_packets: ObservableValue::new(0, "skipped_packets"),
            average_delay_ms: ObservableValue::new(0.0, "average_delay_ms"),
            min_delay_ms: ObservableValue::new(None, "min_delay_ms"),
            max_delay_ms: ObservableValue::new(None, "max_delay_ms"),
        }
    }

    /// Copy `stats` into the observables
    pub fn publish(&self, stats: &PacketStats) {
        self.total_packets.set(stats.total_count);
        self.skipped_packets.set(stats.skipped_count);
        self.average_delay_ms
            .set(stats.average_delay().map_or(0.0, millis));
        self.min_delay_ms.set(stats.min_delay.map(millis));
        self.max_delay_ms.set(stats.max_delay.map(millis));
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Everything the tool keeps in memory
#[derive(Debug)]
pub struct AdcsState {
    pub channels: RollingChannelStore,
    pub link_stats: PacketStatsValues,
    pub stepper_values: StepperAxisValues,
    pub motor_values: MotorAxisValues,
    pub angular_velocity: AngularVelocityValues,
    pub pid_values: PidValues,
    packet_stats: Mutex<PacketStatsTracker>,
    raw_lines: ListenerSet<String>,
}

impl AdcsState {
    /// Create state whose channel histories hold `history_capacity` samples
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            channels: RollingChannelStore::new(history_capacity),
            link_stats: PacketStatsValues::new(),
            stepper_values: StepperAxisValues::new(),
            motor_values: MotorAxisValues::new(),
            angular_velocity: AngularVelocityValues::new(),
            pid_values: PidValues::default(),
            packet_stats: Mutex::new(PacketStatsTracker::new()),
            raw_lines: ListenerSet::new("raw_lines"),
        }
    }

    /// Convenience constructor for sharing
    #[must_use]
    pub fn shared(history_capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(history_capacity))
    }

    /// Record a counter packet and publish the updated link statistics
    pub fn record_packet(&self, packet_number: u32) -> PacketStats {
        self.record_packet_at(packet_number, Instant::now())
    }

    pub fn record_packet_at(&self, packet_number: u32, now: Instant) -> PacketStats {
        let stats = lock(&self.packet_stats)
            .observe_at(packet_number, now)
            .clone();
        self.link_stats.publish(&stats);
        stats
    }

    /// Copy of the current link statistics
    #[must_use]
    pub fn packet_stats(&self) -> PacketStats {
        lock(&self.packet_stats).stats().clone()
    }

    pub fn reset_packet_stats(&self) {
        let stats = {
            let mut tracker = lock(&self.packet_stats);
            tracker.reset();
            tracker.stats().clone()
        };
        self.link_stats.publish(&stats);
    }

    /// Subscribe to every received text line, before decoding
    pub fn add_raw_line_listener<L: Listener<String> + 'static>(
        &self,
        listener: &Arc<L>,
    ) -> ListenerId {
        self.raw_lines.add(listener)
    }

    pub fn remove_raw_line_listener(&self, id: ListenerId) -> bool {
        self.raw_lines.remove(id)
    }

    /// Deliver a received line to the raw line listeners
    pub fn publish_raw_line(&self, line: &str) {
        if !self.raw_lines.is_empty() {
            self.raw_lines.notify(&line.to_string());
        }
    }

    pub fn save_stepper_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(path, &StepperSnapshot::capture(&self.stepper_values))
    }

    /// Load stepper values; the current values are kept if the file is rejected
    pub fn load_stepper_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: StepperSnapshot = load_snapshot(path)?;
        snapshot.apply(&self.stepper_values);
        Ok(())
    }

    pub fn save_motor_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(path, &MotorSnapshot::capture(&self.motor_values))
    }

    pub fn load_motor_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: MotorSnapshot = load_snapshot(path)?;
        snapshot.apply(&self.motor_values);
        Ok(())
    }

    pub fn save_angular_velocity_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(path, &AngularVelocitySnapshot::capture(&self.angular_velocity))
    }

    pub fn load_angular_velocity_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: AngularVelocitySnapshot = load_snapshot(path)?;
        snapshot.apply(&self.angular_velocity);
        Ok(())
    }

    /// Save the angular velocity PID tuning in the `PID_values` format
    pub fn save_angular_velocity_tuning<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(path, &PidSnapshot::capture(&self.angular_velocity.tuning))
    }

    pub fn load_angular_velocity_tuning<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: PidSnapshot = load_snapshot(path)?;
        snapshot.apply(&self.angular_velocity.tuning);
        Ok(())
    }

    pub fn save_pid_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_snapshot(path, &PidSnapshot::capture(&self.pid_values))
    }

    pub fn load_pid_values<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: PidSnapshot = load_snapshot(path)?;
        snapshot.apply(&self.pid_values);
        Ok(())
    }
}
