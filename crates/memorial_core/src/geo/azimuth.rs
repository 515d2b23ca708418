//! Azimuth computation and DMS presentation.
//!
//! # Responsibility
//! - Compute survey-convention azimuths between planar (UTM) points.
//! - Keep the spherical bearing as an alternate path for vertices that only
//!   carry geographic coordinates.
//! - Format decimal angles as `D°MM'SS.ss"`.
//!
//! # Invariants
//! - Returned azimuths are in `[0, 360)`; zero points along +northing and
//!   angles grow clockwise toward +easting.

use super::coord::{parse_dms_to_decimal, CoordParseError};

const HUNDREDTHS_PER_DEGREE: u64 = 360_000;
const HUNDREDTHS_PER_MINUTE: u64 = 6_000;
const FULL_TURN_HUNDREDTHS: u64 = 360 * HUNDREDTHS_PER_DEGREE;

/// Azimuth of the line from point 1 to point 2 on the projection plane.
///
/// Coincident points yield `0.0`.
pub fn azimuth_planar(e1: f64, n1: f64, e2: f64, n2: f64) -> f64 {
    normalize_degrees((e2 - e1).atan2(n2 - n1).to_degrees())
}

/// Great-circle initial bearing between two geographic points given in
/// signed decimal degrees.
pub fn azimuth_geographic(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    normalize_degrees(x.atan2(y).to_degrees())
}

/// [`azimuth_geographic`] over coordinate text (DMS or decimal).
pub fn azimuth_geographic_text(
    lat1: &str,
    lon1: &str,
    lat2: &str,
    lon2: &str,
) -> Result<f64, CoordParseError> {
    Ok(azimuth_geographic(
        parse_dms_to_decimal(lat1)?,
        parse_dms_to_decimal(lon1)?,
        parse_dms_to_decimal(lat2)?,
        parse_dms_to_decimal(lon2)?,
    ))
}

/// Formats decimal degrees as `D°MM'SS.ss"`.
///
/// The angle is rounded to the nearest hundredth of a second first, so a
/// value that would print as `60.00"` carries into the minutes (and minutes
/// into degrees).
pub fn format_angle_dms(degrees: f64) -> String {
    let hundredths = to_hundredths(degrees);
    compose_dms(sign_prefix(degrees, hundredths), hundredths)
}

/// Formats decimal degrees with plain truncating decomposition.
///
/// Matches documents produced before rounding carried: `59.999"` prints as
/// `60.00"` and is never folded into the minutes.
pub fn format_angle_dms_legacy(degrees: f64) -> String {
    let magnitude = degrees.abs();
    let whole = magnitude.trunc();
    let minutes_float = (magnitude - whole) * 60.0;
    let minutes = minutes_float.trunc();
    let seconds = (minutes_float - minutes) * 60.0;
    let sign = if degrees < 0.0 && magnitude > 0.0 { "-" } else { "" };
    format!(
        "{sign}{}°{:02}'{:05.2}\"",
        whole as u64, minutes as u64, seconds
    )
}

/// Formats an azimuth, folding a carried `360°00'00.00"` back to zero.
pub fn format_azimuth_dms(azimuth: f64, legacy_rounding: bool) -> String {
    if legacy_rounding {
        return format_angle_dms_legacy(azimuth);
    }
    compose_dms("", to_hundredths(azimuth) % FULL_TURN_HUNDREDTHS)
}

fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can land on 360.0 for tiny negative inputs, and keeps -0.0.
    if normalized >= 360.0 || normalized == 0.0 {
        0.0
    } else {
        normalized
    }
}

fn to_hundredths(degrees: f64) -> u64 {
    (degrees.abs() * HUNDREDTHS_PER_DEGREE as f64).round() as u64
}

fn sign_prefix(degrees: f64, hundredths: u64) -> &'static str {
    if degrees < 0.0 && hundredths > 0 {
        "-"
    } else {
        ""
    }
}

fn compose_dms(sign: &str, hundredths: u64) -> String {
    let whole_degrees = hundredths / HUNDREDTHS_PER_DEGREE;
    let minutes = (hundredths / HUNDREDTHS_PER_MINUTE) % 60;
    let second_hundredths = hundredths % HUNDREDTHS_PER_MINUTE;
    format!(
        "{sign}{whole_degrees}°{minutes:02}'{:02}.{:02}\"",
        second_hundredths / 100,
        second_hundredths % 100
    )
}
