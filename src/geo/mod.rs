//! Geodesy primitives for exploration tracking.
//!
//! Great-circle distance between fixes and the latitude correction that keeps
//! grid tiles roughly square on the ground.

pub mod tiles;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tiles::{fog_tiles, tile_id_for, tiles_in_bounds, GridError, TileId};

/// Mean Earth radius used for Haversine distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default latitude pitch of one grid tile, in degrees (about 55 m).
pub const LAT_TILE_SIZE_DEGREES: f64 = 0.0005;

/// Latitude used for the longitude correction beyond which tiles stop widening.
pub const MAX_CORRECTION_LAT_DEGREES: f64 = 85.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, -90..=90
    pub lat: f64,
    /// Longitude in degrees, -180..=180
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and inside their ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(ValidationError::NonFinite {
                lat: self.lat,
                lng: self.lng,
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ValidationError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }

    /// Distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(self, other)
    }

    /// `[lat, lng]` pair as persisted.
    pub fn to_pair(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    /// Build from a persisted `[lat, lng]` pair.
    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Rejected coordinate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Coordinate is not finite: lat={lat}, lng={lng}")]
    NonFinite { lat: f64, lng: f64 },

    #[error("Latitude {0} outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside -180..=180")]
    LongitudeOutOfRange(f64),
}

/// Geographic bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    /// Create bounds from two opposite corners in any order.
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            min_lat: a.lat.min(b.lat),
            max_lat: a.lat.max(b.lat),
            min_lng: a.lng.min(b.lng),
            max_lng: a.lng.max(b.lng),
        }
    }

    /// Half-open containment: min edges inclusive, max edges exclusive.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat < self.max_lat
            && coord.lng >= self.min_lng
            && coord.lng < self.max_lng
    }

    /// Center of the box.
    #[cfg(test)]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Great-circle distance between two coordinates (Haversine formula), in meters.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Longitude width of a tile whose latitude pitch is `base_lat_size`, at the given latitude.
///
/// The width grows with `1 / cos(lat)` so tiles cover a similar ground distance
/// east-west as north-south. Latitudes are clamped to 85° so the result stays
/// finite and positive at the poles.
pub fn lng_tile_size_degrees(representative_lat_degrees: f64, base_lat_size: f64) -> f64 {
    let lat = representative_lat_degrees
        .abs()
        .clamp(0.0, MAX_CORRECTION_LAT_DEGREES);
    base_lat_size / lat.to_radians().cos()
}
