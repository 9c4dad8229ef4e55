//! Equirectangular exploration grid.
//!
//! Rows have a fixed latitude pitch; each row's longitude pitch is widened by
//! the latitude correction evaluated at the row's center.

use super::{lng_tile_size_degrees, Coordinate, GeoBounds};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of one grid cell, rendered canonically as `"{x},{y}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TileId {
    /// Column index, counted in row-corrected longitude pitches from the meridian
    pub x: i64,
    /// Row index, counted in latitude pitches from the equator
    pub y: i64,
}

impl TileId {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Center latitude of this tile's row.
    pub fn representative_lat(&self, base_lat_size: f64) -> f64 {
        row_center_lat(self.y, base_lat_size)
    }

    /// Half-open rectangle covered by this tile.
    pub fn bounds(&self, base_lat_size: f64) -> GeoBounds {
        let width = lng_tile_size_degrees(self.representative_lat(base_lat_size), base_lat_size);
        GeoBounds {
            min_lat: self.y as f64 * base_lat_size,
            max_lat: (self.y + 1) as f64 * base_lat_size,
            min_lng: self.x as f64 * width,
            max_lng: (self.x + 1) as f64 * width,
        }
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for TileId {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| GridError::InvalidTileId(s.to_string()))?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| GridError::InvalidTileId(s.to_string()))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| GridError::InvalidTileId(s.to_string()))?;
        Ok(Self { x, y })
    }
}

impl TryFrom<String> for TileId {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TileId> for String {
    fn from(id: TileId) -> Self {
        id.to_string()
    }
}

/// Grid errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Invalid tile id: {0:?}")]
    InvalidTileId(String),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Viewport covers more than {max} tiles")]
    TooManyTiles { max: usize },
}

fn row_center_lat(y: i64, base_lat_size: f64) -> f64 {
    (y as f64 + 0.5) * base_lat_size
}

fn row_of(lat: f64, base_lat_size: f64) -> i64 {
    (lat / base_lat_size).floor() as i64
}

/// Tile containing `coord` for a grid with latitude pitch `base_lat_size`.
pub fn tile_id_for(coord: &Coordinate, base_lat_size: f64) -> TileId {
    let y = row_of(coord.lat, base_lat_size);
    let width = lng_tile_size_degrees(row_center_lat(y, base_lat_size), base_lat_size);
    let x = (coord.lng / width).floor() as i64;
    TileId { x, y }
}

/// Every tile intersecting `bounds`, row by row from south to north.
///
/// Fails with [`GridError::TooManyTiles`] instead of enumerating more than
/// `max_tiles` cells.
pub fn tiles_in_bounds(
    bounds: &GeoBounds,
    base_lat_size: f64,
    max_tiles: usize,
) -> Result<Vec<TileId>, GridError> {
    let finite = [bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng]
        .iter()
        .all(|v| v.is_finite());
    if !finite || bounds.min_lat > bounds.max_lat || bounds.min_lng > bounds.max_lng {
        return Err(GridError::InvalidBounds(format!("{:?}", bounds)));
    }
    if !(base_lat_size.is_finite() && base_lat_size > 0.0) {
        return Err(GridError::InvalidBounds(format!(
            "tile size {}",
            base_lat_size
        )));
    }

    let first_row = row_of(bounds.min_lat, base_lat_size);
    let last_row = row_of(bounds.max_lat, base_lat_size);

    let mut tiles = Vec::new();
    for y in first_row..=last_row {
        let width = lng_tile_size_degrees(row_center_lat(y, base_lat_size), base_lat_size);
        let first_col = (bounds.min_lng / width).floor() as i64;
        let last_col = (bounds.max_lng / width).floor() as i64;

        // Tiny tile sizes saturate the column casts, so the span itself can overflow.
        let row_len = last_col
            .checked_sub(first_col)
            .and_then(|span| usize::try_from(span).ok())
            .and_then(|span| span.checked_add(1))
            .ok_or(GridError::TooManyTiles { max: max_tiles })?;
        if tiles.len().saturating_add(row_len) > max_tiles {
            return Err(GridError::TooManyTiles { max: max_tiles });
        }
        tiles.extend((first_col..=last_col).map(|x| TileId { x, y }));
    }

    Ok(tiles)
}

/// Tiles in `bounds` that have not been visited yet (the fog overlay).
pub fn fog_tiles(
    bounds: &GeoBounds,
    visited: &HashSet<TileId>,
    base_lat_size: f64,
    max_tiles: usize,
) -> Result<Vec<TileId>, GridError> {
    Ok(tiles_in_bounds(bounds, base_lat_size, max_tiles)?
        .into_iter()
        .filter(|id| !visited.contains(id))
        .collect())
}
