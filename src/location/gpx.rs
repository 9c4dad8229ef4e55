//! Recorded walks from GPX files, replayed as position fixes.

use super::PositionFix;
use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Horizontal error per unit of HDOP, in meters.
const METERS_PER_HDOP: f64 = 5.0;

/// GPX import errors.
#[derive(Debug, Error)]
pub enum GpxError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No GPS points found in GPX file")]
    Empty,
}

/// Convert gpx Time to chrono DateTime
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<Utc>> {
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_fix(point: gpx::Waypoint, fallback_time: DateTime<Utc>) -> PositionFix {
    let coord = Coordinate::new(point.point().y(), point.point().x());
    // Files without HDOP carry no accuracy estimate; treat them as exact.
    let accuracy_meters = point.hdop.map_or(0.0, |hdop| hdop * METERS_PER_HDOP);
    let timestamp = point
        .time
        .and_then(gpx_time_to_chrono)
        .unwrap_or(fallback_time);
    PositionFix::new(coord, accuracy_meters, timestamp)
}

/// Parse GPX content into fixes in file order.
///
/// Track points are used when present, then route points, then waypoints.
pub fn parse_gpx(content: &[u8]) -> Result<Vec<PositionFix>, GpxError> {
    let gpx_data: gpx::Gpx =
        gpx::read(content).map_err(|e| GpxError::ParseError(format!("GPX parse error: {}", e)))?;
    let now = Utc::now();

    let mut fixes: Vec<PositionFix> = gpx_data
        .tracks
        .into_iter()
        .flat_map(|track| track.segments)
        .flat_map(|segment| segment.points)
        .map(|point| to_fix(point, now))
        .collect();

    if fixes.is_empty() {
        fixes = gpx_data
            .routes
            .into_iter()
            .flat_map(|route| route.points)
            .map(|point| to_fix(point, now))
            .collect();
    }

    if fixes.is_empty() {
        fixes = gpx_data
            .waypoints
            .into_iter()
            .map(|point| to_fix(point, now))
            .collect();
    }

    if fixes.is_empty() {
        return Err(GpxError::Empty);
    }

    tracing::debug!("Parsed {} GPX points", fixes.len());
    Ok(fixes)
}
