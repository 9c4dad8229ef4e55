//! Progress state machine.
//!
//! Ingests accepted position fixes and grows the snapshot. The tracker trusts
//! every coordinate it is given: accuracy filtering and range validation
//! happen before a fix reaches it.

use super::{ProgressDelta, ProgressSnapshot, TrackerState};
use crate::geo::{distance_meters, tile_id_for, Coordinate, LAT_TILE_SIZE_DEGREES};

/// Owns the canonical [`ProgressSnapshot`].
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    snapshot: ProgressSnapshot,
    state: TrackerState,
    lat_tile_size: f64,
    /// Bumped on every mutation
    version: u64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(LAT_TILE_SIZE_DEGREES)
    }
}

impl ProgressTracker {
    /// Create an empty tracker for a grid with the given latitude pitch.
    pub fn new(lat_tile_size: f64) -> Self {
        Self {
            snapshot: ProgressSnapshot::default(),
            state: TrackerState::Empty,
            lat_tile_size,
            version: 0,
        }
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lat_tile_size(&self) -> f64 {
        self.lat_tile_size
    }

    /// Append a fix to the path, accumulate distance and mark its tile.
    pub fn ingest_fix(&mut self, coord: Coordinate) -> ProgressDelta {
        let distance_increment = match self.snapshot.explored_path.last() {
            Some(previous) => distance_meters(previous, &coord),
            None => 0.0,
        };
        self.snapshot.total_distance_meters += distance_increment;
        self.snapshot.explored_path.push(coord);

        let tile = tile_id_for(&coord, self.lat_tile_size);
        let new_tile = if self.snapshot.visited_tiles.insert(tile) {
            tracing::debug!("Discovered tile {}", tile);
            Some(tile)
        } else {
            None
        };

        self.state = TrackerState::Tracking;
        self.version += 1;

        ProgressDelta {
            distance_increment,
            total_distance_meters: self.snapshot.total_distance_meters,
            new_tile,
            path_len: self.snapshot.explored_path.len(),
            discovered_tiles: self.snapshot.visited_tiles.len(),
        }
    }

    /// Mark an achievement unlocked. Returns `true` only when this call changed state.
    pub fn unlock_achievement(&mut self, id: &str) -> bool {
        if self.snapshot.unlocked_achievements.contains(id) {
            return false;
        }
        self.snapshot.unlocked_achievements.insert(id.to_string());
        self.version += 1;
        true
    }

    /// Clear every field and return to [`TrackerState::Empty`].
    pub fn reset(&mut self) {
        self.snapshot = ProgressSnapshot::default();
        self.state = TrackerState::Empty;
        self.version += 1;
    }

    /// Replace the snapshot wholesale.
    pub fn load_snapshot(&mut self, snapshot: ProgressSnapshot) {
        self.state = if snapshot.explored_path.is_empty() {
            TrackerState::Empty
        } else {
            TrackerState::Tracking
        };
        self.snapshot = snapshot;
        self.version += 1;
    }
}
