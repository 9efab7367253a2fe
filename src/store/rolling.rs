//! # Rolling Channel Store
//!
//! Fixed-capacity telemetry histories for plotting.
//!
//! Each three-axis channel (angle, acceleration, gyroscope, magnetometer)
//! keeps one [`RollingBuffer`] per axis; temperature keeps a single buffer.
//! Once a buffer holds `capacity` samples, every push evicts the oldest.
//!
//! After every push the channel's listeners receive a snapshot of the whole
//! history, not just the new sample. Consumers diff if they need to.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::observable::{lock, Listener, ListenerId, ListenerSet};
use crate::adcs::protocol::{Axis, Unit, Vector3, NUM_AXES};

/// FIFO-evicting ring buffer with a fixed capacity
#[derive(Debug, Clone)]
pub struct RollingBuffer<T> {
    capacity: usize,
    buf: VecDeque<T>,
}

impl<T: Clone> RollingBuffer<T> {
    /// Create an empty buffer; a capacity of 0 is raised to 1
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `item`, dropping the oldest entry when full
    pub fn push(&mut self, item: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Contents, oldest first
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Three-axis telemetry channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisChannel {
    Angle,
    Acceleration,
    Gyroscope,
    Magnetometer,
}

impl AxisChannel {
    pub const ALL: [AxisChannel; 4] = [
        AxisChannel::Angle,
        AxisChannel::Acceleration,
        AxisChannel::Gyroscope,
        AxisChannel::Magnetometer,
    ];

    /// Unit samples must be in when pushed
    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            AxisChannel::Angle => Unit::Degrees,
            AxisChannel::Acceleration => Unit::MetersPerSecondSquared,
            AxisChannel::Gyroscope => Unit::DegreesPerSecond,
            AxisChannel::Magnetometer => Unit::Microtesla,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AxisChannel::Angle => "angle",
            AxisChannel::Acceleration => "acceleration",
            AxisChannel::Gyroscope => "gyroscope",
            AxisChannel::Magnetometer => "magnetometer",
        }
    }

    fn slot(self) -> usize {
        match self {
            AxisChannel::Angle => 0,
            AxisChannel::Acceleration => 1,
            AxisChannel::Gyroscope => 2,
            AxisChannel::Magnetometer => 3,
        }
    }
}

/// Single-value telemetry channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarChannel {
    Temperature,
}

impl ScalarChannel {
    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            ScalarChannel::Temperature => Unit::Celsius,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScalarChannel::Temperature => "temperature",
        }
    }
}

/// Snapshot of a three-axis channel's history, oldest sample first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl AxisSeries {
    /// History for one axis
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Most recent sample across all three axes
    #[must_use]
    pub fn last(&self) -> Option<Vector3> {
        Some(Vector3::new(*self.x.last()?, *self.y.last()?, *self.z.last()?))
    }
}

struct AxisHistory {
    axes: Mutex<[RollingBuffer<f64>; NUM_AXES]>,
    listeners: ListenerSet<AxisSeries>,
}

impl AxisHistory {
    fn new(channel: AxisChannel, capacity: usize) -> Self {
        Self {
            axes: Mutex::new(std::array::from_fn(|_| RollingBuffer::new(capacity))),
            listeners: ListenerSet::new(format!("{}_data", channel.name())),
        }
    }

    fn snapshot(axes: &[RollingBuffer<f64>; NUM_AXES]) -> AxisSeries {
        AxisSeries {
            x: axes[Axis::X.index()].to_vec(),
            y: axes[Axis::Y.index()].to_vec(),
            z: axes[Axis::Z.index()].to_vec(),
        }
    }
}

struct ScalarHistory {
    buffer: Mutex<RollingBuffer<f64>>,
    listeners: ListenerSet<Vec<f64>>,
}

/// Rolling histories for every telemetry channel
///
/// Shared between the reader task (the only writer) and any number of
/// readers through an `Arc`. Each channel is guarded by its own mutex;
/// listeners are invoked after the lock is released.
pub struct RollingChannelStore {
    capacity: usize,
    axis_channels: [AxisHistory; 4],
    temperature: ScalarHistory,
}

impl std::fmt::Debug for RollingChannelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingChannelStore")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl RollingChannelStore {
    /// Create a store whose channels each hold at most `capacity` samples
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            axis_channels: AxisChannel::ALL.map(|channel| AxisHistory::new(channel, capacity)),
            temperature: ScalarHistory {
                buffer: Mutex::new(RollingBuffer::new(capacity)),
                listeners: ListenerSet::new("temperature_data"),
            },
        }
    }

    /// Maximum samples per axis
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one sample to a three-axis channel and notify its listeners
    pub fn push(&self, channel: AxisChannel, x: f64, y: f64, z: f64) {
        let history = &self.axis_channels[channel.slot()];
        let snapshot = {
            let mut axes = lock(&history.axes);
            axes[Axis::X.index()].push(x);
            axes[Axis::Y.index()].push(y);
            axes[Axis::Z.index()].push(z);
            AxisHistory::snapshot(&axes)
        };

        let failures = history.listeners.notify(&snapshot);
        if failures > 0 {
            debug!("{}: {} listener(s) failed", channel.name(), failures);
        }
    }

    /// Append a [`Vector3`] sample to a three-axis channel
    pub fn push_vector(&self, channel: AxisChannel, sample: Vector3) {
        self.push(channel, sample.x, sample.y, sample.z);
    }

    /// Append one sample to a scalar channel and notify its listeners
    pub fn push_scalar(&self, channel: ScalarChannel, value: f64) {
        let history = match channel {
            ScalarChannel::Temperature => &self.temperature,
        };
        let snapshot = {
            let mut buffer = lock(&history.buffer);
            buffer.push(value);
            buffer.to_vec()
        };

        let failures = history.listeners.notify(&snapshot);
        if failures > 0 {
            debug!("{}: {} listener(s) failed", channel.name(), failures);
        }
    }

    /// Current history of a three-axis channel
    #[must_use]
    pub fn series(&self, channel: AxisChannel) -> AxisSeries {
        AxisHistory::snapshot(&lock(&self.axis_channels[channel.slot()].axes))
    }

    /// Current history of a scalar channel
    #[must_use]
    pub fn scalar_series(&self, channel: ScalarChannel) -> Vec<f64> {
        match channel {
            ScalarChannel::Temperature => lock(&self.temperature.buffer).to_vec(),
        }
    }

    /// Most recent sample of a three-axis channel
    #[must_use]
    pub fn latest(&self, channel: AxisChannel) -> Option<Vector3> {
        let axes = lock(&self.axis_channels[channel.slot()].axes);
        Some(Vector3::new(
            *axes[Axis::X.index()].last()?,
            *axes[Axis::Y.index()].last()?,
            *axes[Axis::Z.index()].last()?,
        ))
    }

    /// Most recent sample of a scalar channel
    #[must_use]
    pub fn latest_scalar(&self, channel: ScalarChannel) -> Option<f64> {
        match channel {
            ScalarChannel::Temperature => lock(&self.temperature.buffer).last().copied(),
        }
    }

    pub fn add_listener<L: Listener<AxisSeries> + 'static>(
        &self,
        channel: AxisChannel,
        listener: &Arc<L>,
    ) -> ListenerId {
        self.axis_channels[channel.slot()].listeners.add(listener)
    }

    pub fn remove_listener(&self, channel: AxisChannel, id: ListenerId) -> bool {
        self.axis_channels[channel.slot()].listeners.remove(id)
    }

    pub fn add_scalar_listener<L: Listener<Vec<f64>> + 'static>(
        &self,
        channel: ScalarChannel,
        listener: &Arc<L>,
    ) -> ListenerId {
        match channel {
            ScalarChannel::Temperature => self.temperature.listeners.add(listener),
        }
    }

    pub fn remove_scalar_listener(&self, channel: ScalarChannel, id: ListenerId) -> bool {
        match channel {
            ScalarChannel::Temperature => self.temperature.listeners.remove(id),
        }
    }

    /// Empty every channel (listeners are kept)
    pub fn clear(&self) {
        for history in &self.axis_channels {
            for buffer in lock(&history.axes).iter_mut() {
                buffer.clear();
            }
        }
        lock(&self.temperature.buffer).clear();
    }
}
