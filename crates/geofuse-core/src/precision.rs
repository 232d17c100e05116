//! Coordinate rounding and decimal-place measurement.

use crate::models::Geometry;

/// Round to `precision` decimal places, halves toward positive infinity.
///
/// Non-finite values pass through unchanged.
pub fn round_coordinate(value: f64, precision: u8) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(i32::from(precision));
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / factor
}

/// New geometry with every ordinate rounded; the input is left untouched.
pub fn round_geometry(geometry: &Geometry, precision: u8) -> Geometry {
    geometry.map_ordinates(&|v| round_coordinate(v, precision))
}

/// Digits after the decimal point in the shortest round-trip rendering of `value`.
pub fn decimal_places(value: f64) -> usize {
    if !value.is_finite() || value.fract() == 0.0 {
        return 0;
    }
    let rendered = value.to_string();
    rendered
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

/// Largest decimal-place count over all ordinates of `geometry`.
pub fn max_decimal_places(geometry: &Geometry) -> usize {
    let mut max = 0;
    geometry.for_each_ordinate(&mut |v| max = max.max(decimal_places(v)));
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_coordinate() {
        assert_eq!(round_coordinate(1.23456789, 3), 1.235);
        assert_eq!(round_coordinate(-1.5, 0), -1.0);
        assert_eq!(round_coordinate(2.5, 0), 3.0);
        assert_eq!(round_coordinate(-0.125, 2), -0.12);
        assert!(round_coordinate(f64::NAN, 3).is_nan());
        assert_eq!(round_coordinate(f64::INFINITY, 3), f64::INFINITY);
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let samples = [
            0.0,
            1.0,
            -179.999999999,
            12.3456789012,
            -45.67891234,
            0.000001234,
            89.123456789,
            3.14159265358979,
        ];

        for precision in 0..=10u8 {
            for &v in &samples {
                let once = round_coordinate(v, precision);
                let twice = round_coordinate(once, precision);
                assert_eq!(once, twice, "value {v} at precision {precision}");
            }
        }
    }

    #[test]
    fn test_precision_zero_rounds_to_integers() {
        // Zero means "no decimals" here, not "keep full precision".
        let geometry = Geometry::Point {
            coordinates: [2.3522, 48.8566],
        };
        assert_eq!(
            round_geometry(&geometry, 0),
            Geometry::Point {
                coordinates: [2.0, 49.0]
            }
        );
    }

    #[test]
    fn test_round_geometry_recurses() {
        let geometry = Geometry::GeometryCollection {
            geometries: vec![Geometry::MultiPolygon {
                coordinates: vec![vec![vec![[1.23456, 2.34567], [3.0, 4.99999]]]],
            }],
        };
        let rounded = round_geometry(&geometry, 2);

        assert_eq!(
            rounded,
            Geometry::GeometryCollection {
                geometries: vec![Geometry::MultiPolygon {
                    coordinates: vec![vec![vec![[1.23, 2.35], [3.0, 5.0]]]],
                }],
            }
        );
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(1.0), 0);
        assert_eq!(decimal_places(1.5), 1);
        assert_eq!(decimal_places(-12.345), 3);
        assert_eq!(decimal_places(0.000001), 6);
        assert_eq!(decimal_places(f64::NAN), 0);

        let geometry = Geometry::LineString {
            coordinates: vec![[1.25, 2.0], [3.1234, -4.5]],
        };
        assert_eq!(max_decimal_places(&geometry), 4);
    }
}
