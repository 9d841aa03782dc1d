//! Geometric primitives shared by the overlay renderer and the
//! measurement code, so both agree on what a route's length is.

use crate::types::Point;

/// Total length of a polyline: the sum of consecutive segment lengths.
/// Polylines with fewer than two points have no segments and length 0.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_3_4_triangle_is_5() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = Point::new(17.5, -3.25);
        assert_eq!(p.distance_to(&p), 0.0);
    }

    #[test]
    fn polyline_length_sums_segments() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(6.0, 8.0),
        ];
        assert_eq!(polyline_length(&points), 10.0);
    }

    #[test]
    fn degenerate_polylines_have_zero_length() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[Point::new(5.0, 5.0)]), 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn coord() -> impl Strategy<Value = f64> {
        -10_000.0f64..10_000.0
    }

    proptest! {
        /// Property: distance is symmetric.
        #[test]
        fn distance_is_symmetric(ax in coord(), ay in coord(), bx in coord(), by in coord()) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            prop_assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-9);
        }

        /// Property: appending a point never shortens a polyline.
        #[test]
        fn length_is_monotonic_in_points(
            xs in prop::collection::vec((coord(), coord()), 2..12),
            extra_x in coord(),
            extra_y in coord(),
        ) {
            let mut points: Vec<Point> = xs.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            let before = polyline_length(&points);
            points.push(Point::new(extra_x, extra_y));
            prop_assert!(polyline_length(&points) >= before - 1e-9);
        }
    }
}
