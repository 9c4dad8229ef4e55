//! Unit tests for great-circle distance and coordinate validation.

use fogwalker::geo::{distance_meters, lng_tile_size_degrees, Coordinate, ValidationError};

#[test]
fn test_one_millidegree_of_latitude() {
    let a = Coordinate::new(40.0, -74.0);
    let b = Coordinate::new(40.001, -74.0);
    let d = distance_meters(&a, &b);
    assert!((d - 111.2).abs() < 0.1, "got {}", d);
}

#[test]
fn test_known_city_pair() {
    // New York to London is about 5570 km
    let nyc = Coordinate::new(40.7128, -74.0060);
    let london = Coordinate::new(51.5074, -0.1278);
    let km = nyc.distance_to(&london) / 1000.0;
    assert!((km - 5570.0).abs() < 10.0, "got {}", km);
}

#[test]
fn test_distance_is_non_negative_and_finite() {
    let points = [
        Coordinate::new(0.0, 0.0),
        Coordinate::new(89.9999, 179.9999),
        Coordinate::new(-89.9999, -179.9999),
        Coordinate::new(0.0, 180.0),
        Coordinate::new(0.0, -180.0),
    ];
    for a in &points {
        for b in &points {
            let d = distance_meters(a, b);
            assert!(d.is_finite() && d >= 0.0, "{} -> {} gave {}", a, b, d);
        }
    }
}

#[test]
fn test_tile_width_grows_with_latitude() {
    let base = 0.0005;
    let equator = lng_tile_size_degrees(0.0, base);
    let sixty = lng_tile_size_degrees(60.0, base);
    assert!((sixty - 2.0 * equator).abs() < 1e-9);
    assert_eq!(lng_tile_size_degrees(-60.0, base), sixty);
    assert_eq!(
        lng_tile_size_degrees(90.0, base),
        lng_tile_size_degrees(85.0, base)
    );
}

#[test]
fn test_validation_errors() {
    assert_eq!(
        Coordinate::new(0.0, 181.0).validate(),
        Err(ValidationError::LongitudeOutOfRange(181.0))
    );
    assert!(matches!(
        Coordinate::new(f64::INFINITY, 0.0).validate(),
        Err(ValidationError::NonFinite { .. })
    ));
    assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
}
