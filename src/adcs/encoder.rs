//! # ADCS Command Encoder
//!
//! Builds outbound ASCII commands with bounds checks.
//!
//! Builders are pure: they return the command text without its terminator
//! and never touch the transport. [`encode_wire_command`] produces the bytes
//! actually written to the port.

use super::protocol::*;
use crate::error::{AdcsError, Result};

/// Build a stepper move command
///
/// # Arguments
///
/// * `index` - Stepper index (0-2)
/// * `amount` - Target position in percent of travel (0.0-100.0)
///
/// # Errors
///
/// Returns `OutOfRange` if `index` or `amount` is outside its range (NaN included)
///
/// # Examples
///
/// ```
/// use adcs_bridge::adcs::encoder::stepper_move;
///
/// assert_eq!(stepper_move(1, 50.0).unwrap(), "stepper 1 move 50.0");
/// assert!(stepper_move(0, 150.0).is_err());
/// ```
pub fn stepper_move(index: usize, amount: f64) -> Result<String> {
    check_index("stepper index", index)?;
    check_range("stepper move amount", amount, STEPPER_AMOUNT_MIN, STEPPER_AMOUNT_MAX)?;

    Ok(format!("stepper {} move {}", index, format_number(amount)))
}

/// Build a motor PWM duty command from a signed speed percentage
///
/// The duty is `PWM_PERIOD * percent / 100`, rounded to the nearest integer.
///
/// # Errors
///
/// Returns `OutOfRange` if `index` is not 0-2 or `percent` is outside -100.0..=100.0
///
/// # Examples
///
/// ```
/// use adcs_bridge::adcs::encoder::motor_set_speed;
///
/// assert_eq!(motor_set_speed(2, 50.0).unwrap(), "pwm duty 2 25000");
/// ```
pub fn motor_set_speed(index: usize, percent: f64) -> Result<String> {
    check_index("motor index", index)?;
    check_range("motor speed percent", percent, MOTOR_PERCENT_MIN, MOTOR_PERCENT_MAX)?;

    let duty = (f64::from(PWM_PERIOD) * (percent / 100.0)).round() as i64;
    Ok(format!("pwm duty {} {}", index, duty))
}

/// Build a motor stop command
///
/// # Errors
///
/// Returns `OutOfRange` if `index` is not 0-2
pub fn motor_stop(index: usize) -> Result<String> {
    check_index("motor index", index)?;
    Ok(format!("pwm duty {} 0", index))
}

/// Start IMU streaming
#[must_use]
pub fn imu_start() -> String {
    "imu start".to_string()
}

/// Stop IMU streaming
#[must_use]
pub fn imu_stop() -> String {
    "imu stop".to_string()
}

/// Append the command terminator, producing the bytes written to the port
#[must_use]
pub fn encode_wire_command(command: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(COMMAND_TERMINATOR);
    frame
}

fn check_index(what: &'static str, index: usize) -> Result<()> {
    if index < NUM_AXES {
        Ok(())
    } else {
        Err(AdcsError::OutOfRange {
            what,
            value: index as f64,
            min: 0.0,
            max: (NUM_AXES - 1) as f64,
        })
    }
}

fn check_range(what: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AdcsError::OutOfRange { what, value, min, max })
    }
}

/// Render a number the way the firmware expects it: whole values keep a
/// trailing `.0`, fractional values print in shortest form.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
