//! # Setpoint Snapshots
//!
//! JSON persistence for stepper values, motor values, angular velocity
//! setpoints and PID gains.
//!
//! ## Formats
//!
//! ```json
//! {"stepper_values": {"X": 0, "Y": 50.5, "Z": 100}}
//! {"motor_values": {"X": -20, "Y": 0, "Z": 35}}
//! {"angular_velocity_values": {"X": 1.5, "Y": 0, "Z": -2}}
//! {"PID_values": {"P": 1.0, "I": 0.1, "D": 0.01}}
//! ```
//!
//! Every key is required and unknown keys are rejected at both levels.
//! Stepper values must lie in [0, 100], motor values in [-100, 100] and
//! angular velocities in [-10, 10] rad/s.
//!
//! Loading is all-or-nothing: a snapshot is parsed and validated before
//! anything is applied, so a rejected file leaves the store untouched.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::setpoints::{AngularVelocityValues, MotorAxisValues, PidValues, StepperAxisValues};
use crate::adcs::protocol::{
    Axis, ANGULAR_VELOCITY_MAX, ANGULAR_VELOCITY_MIN, MOTOR_PERCENT_MAX, MOTOR_PERCENT_MIN,
    STEPPER_AMOUNT_MAX, STEPPER_AMOUNT_MIN,
};
use crate::error::{AdcsError, Result};

/// A persisted JSON document with a schema check
pub trait Snapshot: Serialize + DeserializeOwned {
    /// Check value bounds after the structure has been parsed
    fn validate(&self) -> Result<()>;
}

/// Per-axis numbers keyed `X`, `Y`, `Z`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisTriple {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
}

impl AxisTriple {
    #[must_use]
    pub fn from_array(values: [f64; 3]) -> Self {
        Self {
            x: values[0],
            y: values[1],
            z: values[2],
        }
    }

    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    fn check_bounds(&self, section: &str, min: f64, max: f64) -> Result<()> {
        for axis in Axis::ALL {
            let value = self.to_array()[axis.index()];
            check_number(&format!("{}.{}", section, axis), value, min, max)?;
        }
        Ok(())
    }
}

/// Stepper positions snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepperSnapshot {
    pub stepper_values: AxisTriple,
}

impl StepperSnapshot {
    #[must_use]
    pub fn capture(values: &StepperAxisValues) -> Self {
        Self {
            stepper_values: AxisTriple::from_array(values.values()),
        }
    }

    pub fn apply(&self, values: &StepperAxisValues) {
        values.set_all(self.stepper_values.to_array());
    }
}

impl Snapshot for StepperSnapshot {
    fn validate(&self) -> Result<()> {
        self.stepper_values
            .check_bounds("stepper_values", STEPPER_AMOUNT_MIN, STEPPER_AMOUNT_MAX)
    }
}

/// Motor speeds snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorSnapshot {
    pub motor_values: AxisTriple,
}

impl MotorSnapshot {
    #[must_use]
    pub fn capture(values: &MotorAxisValues) -> Self {
        Self {
            motor_values: AxisTriple::from_array(values.values()),
        }
    }

    pub fn apply(&self, values: &MotorAxisValues) {
        values.set_all(self.motor_values.to_array());
    }
}

impl Snapshot for MotorSnapshot {
    fn validate(&self) -> Result<()> {
        self.motor_values
            .check_bounds("motor_values", MOTOR_PERCENT_MIN, MOTOR_PERCENT_MAX)
    }
}

/// Angular velocity setpoints snapshot (rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AngularVelocitySnapshot {
    pub angular_velocity_values: AxisTriple,
}

impl AngularVelocitySnapshot {
    #[must_use]
    pub fn capture(values: &AngularVelocityValues) -> Self {
        Self {
            angular_velocity_values: AxisTriple::from_array(values.values()),
        }
    }

    pub fn apply(&self, values: &AngularVelocityValues) {
        values.set_all(self.angular_velocity_values.to_array());
    }
}

impl Snapshot for AngularVelocitySnapshot {
    fn validate(&self) -> Result<()> {
        self.angular_velocity_values.check_bounds(
            "angular_velocity_values",
            ANGULAR_VELOCITY_MIN,
            ANGULAR_VELOCITY_MAX,
        )
    }
}

/// PID gains keyed `P`, `I`, `D`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PidGains {
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "I")]
    pub i: f64,
    #[serde(rename = "D")]
    pub d: f64,
}

/// PID gains snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PidSnapshot {
    #[serde(rename = "PID_values")]
    pub pid_values: PidGains,
}

impl PidSnapshot {
    #[must_use]
    pub fn capture(values: &PidValues) -> Self {
        let (p, i, d) = values.gains();
        Self {
            pid_values: PidGains { p, i, d },
        }
    }

    pub fn apply(&self, values: &PidValues) {
        values.set_gains(self.pid_values.p, self.pid_values.i, self.pid_values.d);
    }
}

impl Snapshot for PidSnapshot {
    fn validate(&self) -> Result<()> {
        // JSON cannot carry NaN or infinity, so any parsed number is accepted
        Ok(())
    }
}

/// Parse and validate a snapshot from JSON text
///
/// # Errors
///
/// - `Json` if the text is not well-formed JSON
/// - `ConfigSchema` if a key is missing, unknown, not a number, or out of bounds
///
/// # Examples
///
/// ```
/// use adcs_bridge::store::snapshot::{parse_snapshot, StepperSnapshot};
///
/// let snapshot: StepperSnapshot =
///     parse_snapshot(r#"{"stepper_values": {"X": 0, "Y": 50.5, "Z": 100}}"#).unwrap();
/// assert_eq!(snapshot.stepper_values.y, 50.5);
///
/// let out_of_range = r#"{"stepper_values": {"X": 150, "Y": 0, "Z": 0}}"#;
/// assert!(parse_snapshot::<StepperSnapshot>(out_of_range).is_err());
/// ```
pub fn parse_snapshot<T: Snapshot>(json: &str) -> Result<T> {
    let snapshot: T = serde_json::from_str(json).map_err(|e| {
        if e.is_data() {
            AdcsError::ConfigSchema(e.to_string())
        } else {
            AdcsError::Json(e)
        }
    })?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Serialize a snapshot as pretty-printed JSON
///
/// # Errors
///
/// Returns `Json` if serialization fails
pub fn to_json<T: Snapshot>(snapshot: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Read, parse and validate a snapshot file
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, otherwise as [`parse_snapshot`]
pub fn load_snapshot<T: Snapshot, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let snapshot = parse_snapshot(&contents)?;
    info!("Loaded snapshot from {}", path.display());
    Ok(snapshot)
}

/// Write a snapshot file, creating parent directories as needed
///
/// # Errors
///
/// Returns `Io` if the file cannot be written
pub fn save_snapshot<T: Snapshot, P: AsRef<Path>>(path: P, snapshot: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_json(snapshot)?)?;
    info!("Saved snapshot to {}", path.display());
    Ok(())
}

fn check_number(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value < min {
        return Err(AdcsError::ConfigSchema(format!(
            "{}: {} is less than the minimum of {}",
            field, value, min
        )));
    }
    if value > max {
        return Err(AdcsError::ConfigSchema(format!(
            "{}: {} is greater than the maximum of {}",
            field, value, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stepper_round_trip_through_state() {
        let state = StepperAxisValues::new();
        state.set_all([10.0, 20.0, 30.0]);

        let json = to_json(&StepperSnapshot::capture(&state)).unwrap();
        let decoded: StepperSnapshot = parse_snapshot(&json).unwrap();

        let restored = StepperAxisValues::new();
        decoded.apply(&restored);
        assert_eq!(restored.values(), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_stepper_out_of_range_rejected() {
        let err = parse_snapshot::<StepperSnapshot>(r#"{"stepper_values":{"X":150,"Y":0,"Z":0}}"#)
            .unwrap_err();
        match err {
            AdcsError::ConfigSchema(msg) => {
                assert!(msg.contains("stepper_values.X"), "message: {}", msg);
                assert!(msg.contains("maximum of 100"), "message: {}", msg);
            }
            other => panic!("Expected ConfigSchema, got: {:?}", other),
        }
    }

    #[test]
    fn test_stepper_negative_rejected() {
        let err = parse_snapshot::<StepperSnapshot>(r#"{"stepper_values":{"X":0,"Y":0,"Z":-1}}"#)
            .unwrap_err();
        assert!(matches!(err, AdcsError::ConfigSchema(ref m) if m.contains("stepper_values.Z")));
    }

    #[test]
    fn test_missing_axis_rejected() {
        let err =
            parse_snapshot::<StepperSnapshot>(r#"{"stepper_values":{"X":1,"Y":2}}"#).unwrap_err();
        assert!(matches!(err, AdcsError::ConfigSchema(ref m) if m.contains("Z")));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let extra_axis = r#"{"stepper_values":{"X":1,"Y":2,"Z":3,"W":4}}"#;
        assert!(matches!(
            parse_snapshot::<StepperSnapshot>(extra_axis),
            Err(AdcsError::ConfigSchema(_))
        ));

        let extra_top = r#"{"stepper_values":{"X":1,"Y":2,"Z":3},"version":2}"#;
        assert!(matches!(
            parse_snapshot::<StepperSnapshot>(extra_top),
            Err(AdcsError::ConfigSchema(_))
        ));
    }

    #[test]
    fn test_non_number_rejected() {
        let json = r#"{"stepper_values":{"X":"50","Y":2,"Z":3}}"#;
        assert!(matches!(parse_snapshot::<StepperSnapshot>(json), Err(AdcsError::ConfigSchema(_))));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(
            parse_snapshot::<StepperSnapshot>(r#"{"stepper_values": {"X": 1,"#),
            Err(AdcsError::Json(_))
        ));
    }

    #[test]
    fn test_pid_snapshot() {
        let snapshot: PidSnapshot =
            parse_snapshot(r#"{"PID_values": {"P": 2, "I": 0.5, "D": -0.1}}"#).unwrap();
        let pid = PidValues::default();
        snapshot.apply(&pid);
        assert_eq!(pid.gains(), (2.0, 0.5, -0.1));

        let missing = r#"{"PID_values": {"P": 2, "I": 0.5}}"#;
        assert!(parse_snapshot::<PidSnapshot>(missing).is_err());
        let extra = r#"{"PID_values": {"P": 2, "I": 0.5, "D": 1, "F": 0}}"#;
        assert!(parse_snapshot::<PidSnapshot>(extra).is_err());
    }

    #[test]
    fn test_motor_snapshot_bounds() {
        let limits = r#"{"motor_values":{"X":-100,"Y":0,"Z":100}}"#;
        assert!(parse_snapshot::<MotorSnapshot>(limits).is_ok());
        let below = r#"{"motor_values":{"X":-101,"Y":0,"Z":0}}"#;
        assert!(parse_snapshot::<MotorSnapshot>(below).is_err());
    }

    #[test]
    fn test_angular_velocity_snapshot_bounds() {
        let json = r#"{"angular_velocity_values":{"X":1.5,"Y":0,"Z":-2}}"#;
        let snapshot: AngularVelocitySnapshot = parse_snapshot(json).unwrap();
        let values = AngularVelocityValues::new();
        snapshot.apply(&values);
        assert_eq!(values.values(), [1.5, 0.0, -2.0]);

        let too_fast = r#"{"angular_velocity_values":{"X":0,"Y":10.5,"Z":0}}"#;
        match parse_snapshot::<AngularVelocitySnapshot>(too_fast) {
            Err(AdcsError::ConfigSchema(msg)) => {
                assert!(msg.contains("angular_velocity_values.Y"), "message: {}", msg);
            }
            other => panic!("Expected ConfigSchema, got: {:?}", other),
        }
    }

    #[test]
    fn test_rejected_non_finite_setpoint_keeps_snapshot_loadable() {
        let state = StepperAxisValues::new();
        state.set(Axis::X, 40.0);
        state.set(Axis::X, f64::NAN);
        state.set(Axis::Y, f64::INFINITY);

        let json = to_json(&StepperSnapshot::capture(&state)).unwrap();
        assert!(!json.contains("null"), "json: {}", json);
        let reloaded: StepperSnapshot = parse_snapshot(&json).unwrap();
        assert_eq!(reloaded.stepper_values.to_array(), [40.0, 0.0, 0.0]);

        let motors = MotorAxisValues::new();
        motors.set_all([f64::NAN, f64::NEG_INFINITY, 12.0]);
        let json = to_json(&MotorSnapshot::capture(&motors)).unwrap();
        let reloaded: MotorSnapshot = parse_snapshot(&json).unwrap();
        assert_eq!(reloaded.motor_values.to_array(), [0.0, 0.0, 12.0]);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("stepper_values.json");

        let state = StepperAxisValues::new();
        state.set_all([1.5, 2.5, 3.5]);
        save_snapshot(&path, &StepperSnapshot::capture(&state)).unwrap();

        let loaded: StepperSnapshot = load_snapshot(&path).unwrap();
        assert_eq!(loaded.stepper_values.to_array(), [1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_snapshot::<PidSnapshot, _>(dir.path().join("missing.json"));
        assert!(matches!(result, Err(AdcsError::Io(_))));
    }
}
