//! # Control Setpoints
//!
//! Per-axis values bound to the UI and forwarded to the testbed: stepper
//! positions, motor speeds, angular velocity setpoints and PID gains. Every
//! value is an [`ObservableValue`] so views and command forwarding can
//! subscribe to it.
//!
//! Setters clamp to the value's range. NaN and infinities are rejected
//! without touching the stored value or notifying listeners.

use tracing::warn;

use super::observable::ObservableValue;
use crate::adcs::protocol::{
    Axis, ANGULAR_VELOCITY_MAX, ANGULAR_VELOCITY_MIN, MOTOR_PERCENT_MAX, MOTOR_PERCENT_MIN,
    NUM_AXES, STEPPER_AMOUNT_MAX, STEPPER_AMOUNT_MIN,
};

/// Stepper position that centres the moving mass
pub const STEPPER_CENTER: f64 = 50.0;

/// Three observable values indexed by [`Axis`], kept within `[min, max]`
#[derive(Debug)]
pub struct AxisValues {
    values: [ObservableValue<f64>; NUM_AXES],
    min: f64,
    max: f64,
}

impl AxisValues {
    /// Create values named `{prefix}_X`, `{prefix}_Y`, `{prefix}_Z`
    #[must_use]
    pub fn new(prefix: &str, initial: f64, min: f64, max: f64) -> Self {
        Self {
            values: Axis::ALL
                .map(|axis| ObservableValue::new(initial, format!("{}_{}", prefix, axis))),
            min,
            max,
        }
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> &ObservableValue<f64> {
        &self.values[axis.index()]
    }

    /// Current values in axis order
    #[must_use]
    pub fn values(&self) -> [f64; NUM_AXES] {
        Axis::ALL.map(|axis| self.axis(axis).get())
    }

    /// Set one axis, clamped to the range
    ///
    /// Returns `true` if the stored value changed. A non-finite `value` is
    /// ignored and returns `false`.
    pub fn set(&self, axis: Axis, value: f64) -> bool {
        let target = self.axis(axis);
        match self.bounded(value) {
            Some(value) => target.set(value),
            None => {
                warn!("Ignoring non-finite value {} for {}", value, target.name());
                false
            }
        }
    }

    /// Set all three axes; listeners fire only for axes that changed
    pub fn set_all(&self, values: [f64; NUM_AXES]) {
        for axis in Axis::ALL {
            self.set(axis, values[axis.index()]);
        }
    }

    fn bounded(&self, value: f64) -> Option<f64> {
        value.is_finite().then(|| value.clamp(self.min, self.max))
    }
}

/// Stepper positions in percent of travel, [0, 100]
#[derive(Debug)]
pub struct StepperAxisValues {
    values: AxisValues,
}

impl Default for StepperAxisValues {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperAxisValues {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: AxisValues::new("stepper_value", 0.0, STEPPER_AMOUNT_MIN, STEPPER_AMOUNT_MAX),
        }
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> &ObservableValue<f64> {
        self.values.axis(axis)
    }

    #[must_use]
    pub fn values(&self) -> [f64; NUM_AXES] {
        self.values.values()
    }

    /// Set one axis, clamped to [0, 100]
    pub fn set(&self, axis: Axis, percent: f64) -> bool {
        self.values.set(axis, percent)
    }

    pub fn set_all(&self, values: [f64; NUM_AXES]) {
        self.values.set_all(values);
    }

    /// Move one axis to the centre position
    pub fn center(&self, axis: Axis) -> bool {
        self.set(axis, STEPPER_CENTER)
    }

    /// Offset one axis by `delta`, clamped to [0, 100] and rounded to two
    /// decimals. Returns the new value; a non-finite `delta` leaves the
    /// axis where it is.
    pub fn nudge(&self, axis: Axis, delta: f64) -> f64 {
        let current = self.axis(axis).get();
        match self.values.bounded(current + delta) {
            Some(value) => {
                let value = round2(value);
                self.axis(axis).set(value);
                value
            }
            None => {
                warn!("Ignoring non-finite nudge {} for {}", delta, self.axis(axis).name());
                current
            }
        }
    }
}

/// Motor speeds in signed percent of full duty, [-100, 100]
#[derive(Debug)]
pub struct MotorAxisValues {
    values: AxisValues,
}

impl Default for MotorAxisValues {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorAxisValues {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: AxisValues::new("motor_value", 0.0, MOTOR_PERCENT_MIN, MOTOR_PERCENT_MAX),
        }
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> &ObservableValue<f64> {
        self.values.axis(axis)
    }

    #[must_use]
    pub fn values(&self) -> [f64; NUM_AXES] {
        self.values.values()
    }

    /// Set one axis, clamped to [-100, 100]
    pub fn set(&self, axis: Axis, percent: f64) -> bool {
        self.values.set(axis, percent)
    }

    pub fn set_all(&self, values: [f64; NUM_AXES]) {
        self.values.set_all(values);
    }

    /// Set one axis to 0
    pub fn stop(&self, axis: Axis) -> bool {
        self.set(axis, 0.0)
    }
}

/// Reaction wheel angular velocity setpoints (rad/s) with their PID tuning
///
/// The firmware has no velocity command yet, so these are held as
/// configuration and persisted, not forwarded.
#[derive(Debug)]
pub struct AngularVelocityValues {
    values: AxisValues,
    pub tuning: PidValues,
}

impl Default for AngularVelocityValues {
    fn default() -> Self {
        Self::new()
    }
}

impl AngularVelocityValues {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: AxisValues::new(
                "angular_velocity_value",
                0.0,
                ANGULAR_VELOCITY_MIN,
                ANGULAR_VELOCITY_MAX,
            ),
            tuning: PidValues::new("angular_velocity_pid"),
        }
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> &ObservableValue<f64> {
        self.values.axis(axis)
    }

    #[must_use]
    pub fn values(&self) -> [f64; NUM_AXES] {
        self.values.values()
    }

    /// Set one axis, clamped to the angular velocity range
    pub fn set(&self, axis: Axis, rad_per_sec: f64) -> bool {
        self.values.set(axis, rad_per_sec)
    }

    pub fn set_all(&self, values: [f64; NUM_AXES]) {
        self.values.set_all(values);
    }

    pub fn stop(&self, axis: Axis) -> bool {
        self.set(axis, 0.0)
    }
}

/// PID gains. Pass-through configuration, not used for control here.
#[derive(Debug)]
pub struct PidValues {
    pub p: ObservableValue<f64>,
    pub i: ObservableValue<f64>,
    pub d: ObservableValue<f64>,
}

impl Default for PidValues {
    fn default() -> Self {
        Self::new("pid")
    }
}

impl PidValues {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            p: ObservableValue::new(0.0, format!("{}_P", prefix)),
            i: ObservableValue::new(0.0, format!("{}_I", prefix)),
            d: ObservableValue::new(0.0, format!("{}_D", prefix)),
        }
    }

    /// Current gains as `(P, I, D)`
    #[must_use]
    pub fn gains(&self) -> (f64, f64, f64) {
        (self.p.get(), self.i.get(), self.d.get())
    }

    /// Set all three gains; a non-finite gain keeps its previous value
    pub fn set_gains(&self, p: f64, i: f64, d: f64) {
        for (gain, value) in [(&self.p, p), (&self.i, i), (&self.d, d)] {
            if value.is_finite() {
                gain.set(value);
            } else {
                warn!("Ignoring non-finite value {} for {}", value, gain.name());
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
