//! Unit tests for GPX replay parsing.

use fogwalker::location::gpx::{parse_gpx, GpxError};

const TRACK_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning walk</name>
    <trkseg>
      <trkpt lat="40.0" lon="-74.0">
        <time>2024-01-01T08:00:00Z</time>
        <hdop>2.0</hdop>
      </trkpt>
      <trkpt lat="40.001" lon="-74.0">
        <time>2024-01-01T08:01:00Z</time>
        <hdop>20.0</hdop>
      </trkpt>
      <trkpt lat="40.002" lon="-74.0">
        <time>2024-01-01T08:02:00Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

const WAYPOINTS_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <wpt lat="45.5" lon="-122.5"><name>Point 1</name></wpt>
  <wpt lat="45.51" lon="-122.51"><name>Point 2</name></wpt>
</gpx>"#;

const EMPTY_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
</gpx>"#;

#[test]
fn test_parse_track_points() {
    let fixes = parse_gpx(TRACK_GPX.as_bytes()).unwrap();
    assert_eq!(fixes.len(), 3);
    assert_eq!(fixes[1].coord.lat, 40.001);
    assert_eq!(fixes[1].coord.lng, -74.0);
    assert_eq!(fixes[0].accuracy_meters, 10.0);
    assert_eq!(fixes[1].accuracy_meters, 100.0);
    assert_eq!(fixes[2].accuracy_meters, 0.0);
    assert!(fixes[0].timestamp < fixes[1].timestamp);
}

#[test]
fn test_waypoints_fallback() {
    let fixes = parse_gpx(WAYPOINTS_GPX.as_bytes()).unwrap();
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[0].coord.lat, 45.5);
}

#[test]
fn test_empty_and_invalid() {
    assert!(matches!(parse_gpx(EMPTY_GPX.as_bytes()), Err(GpxError::Empty)));
    assert!(matches!(
        parse_gpx(b"not xml at all"),
        Err(GpxError::ParseError(_))
    ));
}
