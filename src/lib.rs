//! Fogwalker - fog-of-war exploration tracking
//!
//! Turns a stream of GPS fixes into a set of discovered grid tiles, cumulative
//! walked distance, the explored path and achievement unlocks. Progress is
//! persisted locally while anonymous and synced to a per-account remote
//! document while signed in.

pub mod achievements;
pub mod geo;
pub mod identity;
pub mod journal;
pub mod location;
pub mod progress;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use achievements::AchievementEvaluator;
pub use geo::{Coordinate, TileId};
pub use identity::{IdentityContext, IdentityUpdate};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use storage::config::AppConfig;
pub use sync::ProgressService;
