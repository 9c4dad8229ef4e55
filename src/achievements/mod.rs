//! Achievement rules evaluated against the progress snapshot.
//!
//! Definitions are stateless; unlock state lives in the snapshot's
//! `unlocked_achievements` set.

pub mod definitions;

use crate::progress::{ProgressSnapshot, ProgressTracker};
use chrono::{DateTime, Utc};

/// Achievement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementCategory {
    /// Tile-count achievements
    Exploration,
    /// Distance-based achievements
    Distance,
}

/// Achievement definition
#[derive(Clone, Copy)]
pub struct Achievement {
    /// Stable identifier stored in snapshots
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Description
    pub description: &'static str,
    /// Icon name
    pub icon: &'static str,
    /// Category
    pub category: AchievementCategory,
    /// Unlock rule
    pub predicate: fn(&ProgressSnapshot) -> bool,
}

impl std::fmt::Debug for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl Achievement {
    /// Whether the rule holds for `snapshot`.
    pub fn is_met(&self, snapshot: &ProgressSnapshot) -> bool {
        (self.predicate)(snapshot)
    }
}

/// A definition paired with its unlock flag, for listing.
#[derive(Debug, Clone, Copy)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub unlocked: bool,
}

/// Achievement unlocked event
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementUnlocked {
    pub id: String,
    pub name: String,
    pub unlocked_at: DateTime<Utc>,
}

impl AchievementUnlocked {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unlocked_at: Utc::now(),
        }
    }
}

/// Applies achievement rules to a tracker.
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    achievements: Vec<Achievement>,
}

impl Default for AchievementEvaluator {
    fn default() -> Self {
        Self::new(definitions::all_achievements())
    }
}

impl AchievementEvaluator {
    pub fn new(achievements: Vec<Achievement>) -> Self {
        Self { achievements }
    }

    /// Get all achievements
    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    /// Locked achievements whose rule currently holds.
    pub fn pending(&self, snapshot: &ProgressSnapshot) -> Vec<&Achievement> {
        self.achievements
            .iter()
            .filter(|a| !snapshot.is_unlocked(a.id) && a.is_met(snapshot))
            .collect()
    }

    /// Unlock every pending achievement on `tracker`.
    ///
    /// Running it twice without a state change unlocks nothing the second time.
    pub fn evaluate(&self, tracker: &mut ProgressTracker) -> Vec<AchievementUnlocked> {
        let ready: Vec<Achievement> = self
            .pending(tracker.snapshot())
            .into_iter()
            .copied()
            .collect();

        ready
            .into_iter()
            .filter(|a| tracker.unlock_achievement(a.id))
            .map(|a| {
                tracing::info!("Achievement unlocked: {} ({})", a.name, a.id);
                AchievementUnlocked::new(a.id, a.name)
            })
            .collect()
    }

    /// Look up a definition by id.
    pub fn find(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Every definition with its unlock flag for `snapshot`.
    pub fn statuses(&self, snapshot: &ProgressSnapshot) -> Vec<AchievementStatus> {
        self.achievements
            .iter()
            .map(|a| AchievementStatus {
                achievement: *a,
                unlocked: snapshot.is_unlocked(a.id),
            })
            .collect()
    }

    /// Get completion percentage
    pub fn completion_percentage(&self, snapshot: &ProgressSnapshot) -> f32 {
        if self.achievements.is_empty() {
            return 0.0;
        }
        let unlocked = self
            .achievements
            .iter()
            .filter(|a| snapshot.is_unlocked(a.id))
            .count();
        (unlocked as f32 / self.achievements.len() as f32) * 100.0
    }
}
