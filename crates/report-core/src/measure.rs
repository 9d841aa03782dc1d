//! Scale calibration and footage conversion
//!
//! Site plans carry no intrinsic scale; the user calibrates each page
//! either by clicking two points a known distance apart or by typing the
//! plan's printed scale ("1 inch = 50 feet"). Either way the result is a
//! feet-per-PDF-unit factor applied to polyline lengths.

use shared_types::{polyline_length, Point};

use crate::error::ReportError;

/// PDF user-space units per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Total polyline length in feet given a feet-per-PDF-unit factor.
pub fn polyline_length_ft(points: &[Point], scale_factor: f64) -> f64 {
    polyline_length(points) * scale_factor
}

/// Scale factor (feet per PDF unit) from two calibration points a known
/// real-world distance apart.
pub fn two_point_scale(
    point_a: Point,
    point_b: Point,
    known_distance_ft: f64,
) -> Result<f64, ReportError> {
    let distance = point_a.distance_to(&point_b);
    if distance == 0.0 {
        return Err(ReportError::CoincidentCalibrationPoints);
    }
    Ok(known_distance_ft / distance)
}

/// Parse a printed map scale like `"1 inch = 50 feet"` into feet per PDF
/// unit. The left side accepts inch/in, foot/ft, and yard/yd; the right
/// side is always feet.
pub fn parse_manual_scale(scale_str: &str) -> Result<f64, ReportError> {
    let invalid = || ReportError::InvalidScaleString(scale_str.to_string());

    let (left, right) = scale_str.split_once('=').ok_or_else(invalid)?;

    let mut left_parts = left.split_whitespace();
    let left_value: f64 = left_parts
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(invalid)?;
    let left_unit = left_parts.next().ok_or_else(invalid)?.to_lowercase();

    let right_value: f64 = right
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(invalid)?;

    let inches = if left_unit.contains("foot") || left_unit == "ft" || left_unit == "feet" {
        left_value * 12.0
    } else if left_unit.contains("yard") || left_unit == "yd" {
        left_value * 36.0
    } else if left_unit.contains("inch") || left_unit == "in" {
        left_value
    } else {
        return Err(invalid());
    };

    if inches == 0.0 {
        return Err(invalid());
    }

    let feet_per_inch = right_value / inches;
    Ok(feet_per_inch / POINTS_PER_INCH)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: calibrating with the measured distance itself yields
        /// a factor that maps that polyline back to the known footage.
        #[test]
        fn calibration_round_trips(
            ax in -500.0f64..500.0, ay in -500.0f64..500.0,
            bx in -500.0f64..500.0, by in -500.0f64..500.0,
            known_ft in 1.0f64..10_000.0,
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            prop_assume!(a.distance_to(&b) > 1e-6);

            let factor = two_point_scale(a, b, known_ft).unwrap();
            let measured = polyline_length_ft(&[a, b], factor);
            prop_assert!((measured - known_ft).abs() < 1e-6);
        }
    }
}
