//! # ADCS Wire Protocol Constants and Types
//!
//! Core definitions for the newline-delimited ASCII link between the ground
//! station and the testbed microcontroller.
//!
//! ## Inbound (telemetry)
//!
//! ```text
//! counter <uint>
//! acc(<f>,<f>,<f>)
//! gyro(<f>,<f>,<f>)
//! angle (<f>, <f>, <f>)
//! temp<f>
//! ```
//!
//! ## Outbound (commands, CR-terminated by the sender)
//!
//! ```text
//! stepper <0|1|2> move <0..100>
//! pwm duty <0|1|2> <duty>
//! imu start
//! imu stop
//! ```

use std::fmt;

/// Inbound line delimiter
pub const LINE_DELIMITER: u8 = b'\n';

/// Terminator appended to every outbound command
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// Packet counter line prefix
pub const PREFIX_COUNTER: &str = "counter ";

/// Accelerometer line prefix
pub const PREFIX_ACCELERATION: &str = "acc";

/// Gyroscope line prefix
pub const PREFIX_GYROSCOPE: &str = "gyro";

/// Orientation angle line prefix
pub const PREFIX_ANGLE: &str = "angle";

/// Temperature line prefix
pub const PREFIX_TEMPERATURE: &str = "temp";

/// Standard gravity in m/s², used when the firmware reports acceleration in g
pub const STANDARD_GRAVITY: f64 = 9.81;

/// PWM period the motor duty cycle is scaled against
pub const PWM_PERIOD: u32 = 50_000;

/// Number of stepper/motor axes on the testbed
pub const NUM_AXES: usize = 3;

/// Lowest stepper move amount (percent of travel)
pub const STEPPER_AMOUNT_MIN: f64 = 0.0;

/// Highest stepper move amount (percent of travel)
pub const STEPPER_AMOUNT_MAX: f64 = 100.0;

/// Full reverse motor speed (signed percent of full duty)
pub const MOTOR_PERCENT_MIN: f64 = -100.0;

/// Full forward motor speed (signed percent of full duty)
pub const MOTOR_PERCENT_MAX: f64 = 100.0;

/// Lowest angular velocity setpoint (rad/s)
pub const ANGULAR_VELOCITY_MIN: f64 = -10.0;

/// Highest angular velocity setpoint (rad/s)
pub const ANGULAR_VELOCITY_MAX: f64 = 10.0;

/// Testbed axis.
///
/// The axis index doubles as the stepper/motor index on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in wire-index order
    pub const ALL: [Axis; NUM_AXES] = [Axis::X, Axis::Y, Axis::Z];

    /// Wire index (0, 1, 2)
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for a wire index, `None` if out of range
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name used as the key in JSON snapshots
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-axis sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component for one axis
    #[must_use]
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Multiply every component by `factor`
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// Physical unit a channel is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Degrees,
    DegreesPerSecond,
    MetersPerSecondSquared,
    Microtesla,
    Celsius,
}

impl Unit {
    /// Short unit label for display
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Degrees => "deg",
            Unit::DegreesPerSecond => "deg/s",
            Unit::MetersPerSecondSquared => "m/s²",
            Unit::Microtesla => "µT",
            Unit::Celsius => "°C",
        }
    }
}

/// One decoded telemetry line
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Monotonically increasing packet counter
    PacketCounter(u32),
    /// Accelerometer sample, as sent by the firmware
    Acceleration(Vector3),
    /// Gyroscope sample (deg/s)
    AngularVelocity(Vector3),
    /// Orientation angle (degrees)
    Orientation(Vector3),
    /// Temperature (°C)
    Temperature(f64),
    /// A line with no known prefix, kept for logging only
    Unrecognized(String),
}

impl TelemetryEvent {
    /// Short name of the event kind for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryEvent::PacketCounter(_) => "counter",
            TelemetryEvent::Acceleration(_) => "acceleration",
            TelemetryEvent::AngularVelocity(_) => "angular_velocity",
            TelemetryEvent::Orientation(_) => "orientation",
            TelemetryEvent::Temperature(_) => "temperature",
            TelemetryEvent::Unrecognized(_) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_index_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(3), None);
    }

    #[test]
    fn test_axis_names() {
        assert_eq!(Axis::X.name(), "X");
        assert_eq!(Axis::Z.to_string(), "Z");
    }

    #[test]
    fn test_vector3_scaled() {
        let v = Vector3::new(1.0, -2.0, 0.5).scaled(STANDARD_GRAVITY);
        assert!((v.x - 9.81).abs() < 1e-9);
        assert!((v.y + 19.62).abs() < 1e-9);
        assert_eq!(v.get(Axis::Z), 0.5 * 9.81);
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(TelemetryEvent::PacketCounter(1).kind(), "counter");
        assert_eq!(TelemetryEvent::Temperature(20.0).kind(), "temperature");
    }
}
