//! Persisted snapshot format shared by the local and remote stores.
//!
//! ```json
//! { "totalDistance": 111.2, "visitedTiles": ["-148000,80000"],
//!   "exploredPath": [[40.0, -74.0]], "unlockedAchievements": ["TILES_10"] }
//! ```

use super::ProgressSnapshot;
use crate::geo::{Coordinate, TileId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire form of a [`ProgressSnapshot`]. Missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedProgress {
    pub total_distance: f64,
    pub visited_tiles: Vec<String>,
    pub explored_path: Vec<[f64; 2]>,
    pub unlocked_achievements: Vec<String>,
}

/// Snapshot decoding errors. Any of these means the stored data is corrupt.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid tile id in snapshot: {0:?}")]
    InvalidTile(String),

    #[error("Invalid total distance: {0}")]
    InvalidDistance(f64),

    #[error("Non-finite path point at index {0}")]
    InvalidPathPoint(usize),
}

impl From<&ProgressSnapshot> for PersistedProgress {
    fn from(snapshot: &ProgressSnapshot) -> Self {
        let mut visited_tiles: Vec<_> = snapshot.visited_tiles.iter().copied().collect();
        visited_tiles.sort();
        let mut unlocked_achievements: Vec<_> =
            snapshot.unlocked_achievements.iter().cloned().collect();
        unlocked_achievements.sort();

        Self {
            total_distance: snapshot.total_distance_meters,
            visited_tiles: visited_tiles.into_iter().map(String::from).collect(),
            explored_path: snapshot
                .explored_path
                .iter()
                .map(|c| c.to_pair())
                .collect(),
            unlocked_achievements,
        }
    }
}

impl TryFrom<PersistedProgress> for ProgressSnapshot {
    type Error = SnapshotError;

    fn try_from(data: PersistedProgress) -> Result<Self, Self::Error> {
        if !data.total_distance.is_finite() || data.total_distance < 0.0 {
            return Err(SnapshotError::InvalidDistance(data.total_distance));
        }

        let visited_tiles = data
            .visited_tiles
            .into_iter()
            .map(|s| s.parse::<TileId>().map_err(|_| SnapshotError::InvalidTile(s)))
            .collect::<Result<_, _>>()?;

        let explored_path = data
            .explored_path
            .into_iter()
            .enumerate()
            .map(|(i, pair)| {
                if pair.iter().all(|v| v.is_finite()) {
                    Ok(Coordinate::from_pair(pair))
                } else {
                    Err(SnapshotError::InvalidPathPoint(i))
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(ProgressSnapshot {
            total_distance_meters: data.total_distance,
            visited_tiles,
            explored_path,
            unlocked_achievements: data.unlocked_achievements.into_iter().collect(),
        })
    }
}

/// Serialize a snapshot to its persisted JSON form.
pub fn encode_snapshot(snapshot: &ProgressSnapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&PersistedProgress::from(snapshot))?)
}

/// Parse persisted JSON back into a snapshot.
pub fn decode_snapshot(json: &str) -> Result<ProgressSnapshot, SnapshotError> {
    let data: PersistedProgress = serde_json::from_str(json)?;
    ProgressSnapshot::try_from(data)
}
