//! # Telemetry Line Decoder
//!
//! Decodes one framed text line into a [`TelemetryEvent`].
//!
//! Prefixes are matched case-sensitively in the order `counter `, `acc`,
//! `gyro`, `angle`, `temp`. Any other line becomes
//! [`TelemetryEvent::Unrecognized`]. Decoding is pure and never panics: bad
//! content yields [`AdcsError::TelemetryParse`], never a partial event.
//!
//! Values are returned as sent. Unit conversion (e.g. g to m/s²) is applied
//! by the pipeline, not here.

use super::protocol::*;
use crate::error::{AdcsError, Result};

/// Decode a single telemetry line
///
/// # Arguments
///
/// * `line` - One line with the delimiter already removed
///
/// # Returns
///
/// * `Result<TelemetryEvent>` - Decoded event, or error if the content is malformed
///
/// # Errors
///
/// Returns error if:
/// - A `counter` line does not carry an unsigned integer
/// - An `acc`/`gyro`/`angle` line lacks a `(x, y, z)` triple of floats
/// - A `temp` line does not carry a float
///
/// # Examples
///
/// ```
/// use adcs_bridge::adcs::decoder::decode_line;
/// use adcs_bridge::adcs::protocol::{TelemetryEvent, Vector3};
///
/// let event = decode_line("angle (1.5, -2, 90)").unwrap();
/// assert_eq!(event, TelemetryEvent::Orientation(Vector3::new(1.5, -2.0, 90.0)));
/// ```
pub fn decode_line(line: &str) -> Result<TelemetryEvent> {
    if line.starts_with(PREFIX_COUNTER.trim_end()) {
        Ok(TelemetryEvent::PacketCounter(parse_counter(line)?))
    } else if line.starts_with(PREFIX_ACCELERATION) {
        Ok(TelemetryEvent::Acceleration(parse_triple(line)?))
    } else if line.starts_with(PREFIX_GYROSCOPE) {
        Ok(TelemetryEvent::AngularVelocity(parse_triple(line)?))
    } else if line.starts_with(PREFIX_ANGLE) {
        Ok(TelemetryEvent::Orientation(parse_triple(line)?))
    } else if let Some(rest) = line.strip_prefix(PREFIX_TEMPERATURE) {
        Ok(TelemetryEvent::Temperature(parse_float(rest, line)?))
    } else {
        Ok(TelemetryEvent::Unrecognized(line.to_string()))
    }
}

/// Packet number after `counter `: ASCII digits only, no sign
fn parse_counter(line: &str) -> Result<u32> {
    let digits = line
        .strip_prefix(PREFIX_COUNTER)
        .map(str::trim)
        .ok_or_else(|| AdcsError::TelemetryParse(format!("missing packet number in {:?}", line)))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AdcsError::TelemetryParse(format!(
            "invalid packet number {:?} in {:?}",
            digits, line
        )));
    }
    digits.parse::<u32>().map_err(|e| {
        AdcsError::TelemetryParse(format!("invalid packet number in {:?}: {}", line, e))
    })
}

/// Extract the parenthesized `(x, y, z)` triple from a line
///
/// Whitespace around each number is ignored. Exactly three values are
/// required.
fn parse_triple(line: &str) -> Result<Vector3> {
    let open = line
        .find('(')
        .ok_or_else(|| AdcsError::TelemetryParse(format!("missing '(' in {:?}", line)))?;
    let close = line[open..]
        .find(')')
        .map(|offset| open + offset)
        .ok_or_else(|| AdcsError::TelemetryParse(format!("missing ')' in {:?}", line)))?;

    let mut values = [0.0f64; 3];
    let mut count = 0;
    for token in line[open + 1..close].split(',') {
        if count == values.len() {
            return Err(AdcsError::TelemetryParse(format!(
                "expected 3 values, got more in {:?}",
                line
            )));
        }
        values[count] = parse_float(token, line)?;
        count += 1;
    }

    if count != values.len() {
        return Err(AdcsError::TelemetryParse(format!(
            "expected 3 values, got {} in {:?}",
            count, line
        )));
    }

    Ok(Vector3::new(values[0], values[1], values[2]))
}

fn parse_float(token: &str, line: &str) -> Result<f64> {
    token.trim().parse::<f64>().map_err(|e| {
        AdcsError::TelemetryParse(format!("invalid number {:?} in {:?}: {}", token.trim(), line, e))
    })
}
