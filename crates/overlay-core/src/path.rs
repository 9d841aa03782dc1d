//! Arc-length positioning along a polyline
//!
//! Route labels sit at fractional distances along the drawn path rather
//! than at point indices, so a route digitized with many short clicks and
//! one long straight segment labels the same as its simplified twin.

use shared_types::Point;

/// Locate the point at `fraction` of the total arc length of `points`.
///
/// `fraction` is clamped to `[0, 1]`. Degenerate inputs never fail: an
/// empty polyline yields the origin, a single point yields that point,
/// and a zero-length path yields its first point.
pub fn point_at_fraction(points: &[Point], fraction: f64) -> Point {
    let [first, rest @ ..] = points else {
        return Point::ORIGIN;
    };
    if rest.is_empty() {
        return *first;
    }

    let segment_lengths: Vec<f64> = points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .collect();
    let total: f64 = segment_lengths.iter().sum();
    if total == 0.0 {
        return *first;
    }

    let target = total * fraction.clamp(0.0, 1.0);

    // Walk to the segment whose cumulative range contains the target.
    // Accumulated rounding can leave the target a hair past the final
    // cumulative sum, so default to the end of the last segment.
    let mut segment_index = segment_lengths.len() - 1;
    let mut local_t = 1.0;
    let mut accumulated = 0.0;
    for (i, len) in segment_lengths.iter().enumerate() {
        if accumulated + len >= target {
            segment_index = i;
            local_t = if *len > 0.0 {
                (target - accumulated) / len
            } else {
                0.0
            };
            break;
        }
        accumulated += len;
    }

    let a = points[segment_index];
    let b = points[segment_index + 1];
    Point::new(a.x + (b.x - a.x) * local_t, a.y + (b.y - a.y) * local_t)
}
