//! # Packet Statistics
//!
//! Tracks the packet counter stream to measure link health.
//!
//! This module handles:
//! - Counting received counter packets
//! - Detecting gaps (any number other than `last + 1` counts as skipped)
//! - Inter-packet delay: running average plus min/max after a warm-up period

use std::time::{Duration, Instant};

use tracing::debug;

/// Packets seen before min/max delay tracking starts, so startup jitter
/// does not pollute the extremes
pub const WARMUP_PACKETS: u64 = 50;

/// Link statistics accumulated by [`PacketStatsTracker`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketStats {
    /// Most recent packet counter value
    pub last_packet_number: Option<u32>,
    /// Arrival time of the most recent packet
    pub last_timestamp: Option<Instant>,
    /// Sum of all inter-arrival delays
    pub delay_sum: Duration,
    /// Counter packets observed
    pub total_count: u64,
    /// Packets whose number was not `last + 1`
    pub skipped_count: u64,
    pub min_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
}

impl PacketStats {
    /// Mean delay over the intervals between observed packets
    ///
    /// Returns `None` until at least two packets have arrived.
    #[must_use]
    pub fn average_delay(&self) -> Option<Duration> {
        let intervals = self.total_count.saturating_sub(1);
        if intervals == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.delay_sum.as_secs_f64() / intervals as f64,
        ))
    }
}

/// Consumes packet counter values and maintains [`PacketStats`]
#[derive(Debug, Default)]
pub struct PacketStatsTracker {
    stats: PacketStats,
}

impl PacketStatsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a counter packet arriving now
    ///
    /// # Examples
    ///
    /// ```
    /// use adcs_bridge::telemetry::packet_stats::PacketStatsTracker;
    ///
    /// let mut tracker = PacketStatsTracker::new();
    /// for n in [1, 2, 4] {
    ///     tracker.observe(n);
    /// }
    /// assert_eq!(tracker.stats().total_count, 3);
    /// assert_eq!(tracker.stats().skipped_count, 1);
    /// ```
    pub fn observe(&mut self, packet_number: u32) -> &PacketStats {
        self.observe_at(packet_number, Instant::now())
    }

    /// Record a counter packet that arrived at `now`
    pub fn observe_at(&mut self, packet_number: u32, now: Instant) -> &PacketStats {
        let stats = &mut self.stats;
        stats.total_count += 1;

        if let (Some(last_number), Some(last_time)) =
            (stats.last_packet_number, stats.last_timestamp)
        {
            if last_number.checked_add(1) != Some(packet_number) {
                stats.skipped_count += 1;
                debug!(
                    "Packet gap: expected {}, got {}",
                    u64::from(last_number) + 1,
                    packet_number
                );
            }

            let delay = now.saturating_duration_since(last_time);
            stats.delay_sum += delay;

            if stats.total_count > WARMUP_PACKETS {
                stats.min_delay = Some(stats.min_delay.map_or(delay, |min| min.min(delay)));
                stats.max_delay = Some(stats.max_delay.map_or(delay, |max| max.max(delay)));
            }
        }

        stats.last_packet_number = Some(packet_number);
        stats.last_timestamp = Some(now);
        &self.stats
    }

    #[must_use]
    pub fn stats(&self) -> &PacketStats {
        &self.stats
    }

    /// Forget everything, e.g. after reconnecting
    pub fn reset(&mut self) {
        self.stats = PacketStats::default();
    }
}
