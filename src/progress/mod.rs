//! Exploration progress: the snapshot aggregate and the state machine that owns it.

pub mod codec;
pub mod tracker;

use crate::achievements::AchievementUnlocked;
use crate::geo::{Coordinate, TileId};
use std::collections::HashSet;

pub use codec::{decode_snapshot, encode_snapshot, PersistedProgress, SnapshotError};
pub use tracker::ProgressTracker;

/// Achievement identifier, e.g. `"TILES_10"`.
pub type AchievementId = String;

/// Complete progress state at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Cumulative walked distance in meters
    pub total_distance_meters: f64,
    /// Every tile a fix has landed in
    pub visited_tiles: HashSet<TileId>,
    /// Accepted fixes in chronological order
    pub explored_path: Vec<Coordinate>,
    /// Unlocked achievement ids
    pub unlocked_achievements: HashSet<AchievementId>,
}

impl ProgressSnapshot {
    /// Number of discovered tiles.
    pub fn discovered_tiles_count(&self) -> usize {
        self.visited_tiles.len()
    }

    /// Total distance in kilometers.
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_meters / 1000.0
    }

    /// Whether every field is at its empty default.
    pub fn is_empty(&self) -> bool {
        self.total_distance_meters == 0.0
            && self.visited_tiles.is_empty()
            && self.explored_path.is_empty()
            && self.unlocked_achievements.is_empty()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_achievements.contains(id)
    }

    /// Summary figures for stats displays.
    pub fn stats(&self) -> ProgressStats {
        ProgressStats {
            distance_km: (self.total_distance_km() * 100.0).round() / 100.0,
            discovered_tiles: self.discovered_tiles_count(),
            path_len: self.explored_path.len(),
            unlocked: self.unlocked_achievements.len(),
        }
    }
}

/// Display-ready progress figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    /// Distance in km rounded to two decimals
    pub distance_km: f64,
    pub discovered_tiles: usize,
    pub path_len: usize,
    pub unlocked: usize,
}

/// Lifecycle state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// Nothing ingested since creation or the last reset
    #[default]
    Empty,
    /// At least one fix is on the path
    Tracking,
}

/// Outcome of ingesting one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressDelta {
    /// Distance added by this fix in meters
    pub distance_increment: f64,
    /// Total distance after this fix
    pub total_distance_meters: f64,
    /// Tile discovered by this fix, if it was new
    pub new_tile: Option<TileId>,
    /// Path length after this fix
    pub path_len: usize,
    /// Discovered tile count after this fix
    pub discovered_tiles: usize,
}

impl ProgressDelta {
    pub fn new_tile_discovered(&self) -> bool {
        self.new_tile.is_some()
    }

    /// Whether distance or tile coverage changed, which is what gets persisted
    /// and what achievement rules look at.
    pub fn changes_progress(&self) -> bool {
        self.distance_increment > 0.0 || self.new_tile.is_some()
    }
}

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Anonymous on-device storage
    Local,
    /// Remote per-account document
    Remote { account_id: String },
    /// Handed in directly by the caller
    Imported,
}

/// Published after every change to the progress aggregate.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    FixIngested(ProgressDelta),
    AchievementUnlocked(AchievementUnlocked),
    Reset,
    SnapshotLoaded(SnapshotSource),
}
