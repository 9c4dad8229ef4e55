//! Achievement definitions.

use super::{Achievement, AchievementCategory};
use crate::progress::ProgressSnapshot;

/// Get all achievement definitions
pub fn all_achievements() -> Vec<Achievement> {
    let mut achievements = Vec::new();
    achievements.extend(exploration_achievements());
    achievements.extend(distance_achievements());
    achievements
}

fn exploration_achievements() -> Vec<Achievement> {
    vec![
        Achievement {
            id: "TILES_10",
            name: "Explorer",
            description: "Explore your first 10 tiles.",
            icon: "award",
            category: AchievementCategory::Exploration,
            predicate: |p: &ProgressSnapshot| p.discovered_tiles_count() >= 10,
        },
        Achievement {
            id: "TILES_100",
            name: "Cartographer",
            description: "Explore 100 tiles.",
            icon: "map",
            category: AchievementCategory::Exploration,
            predicate: |p: &ProgressSnapshot| p.discovered_tiles_count() >= 100,
        },
        Achievement {
            id: "TILES_1000",
            name: "World Wanderer",
            description: "Explore 1,000 tiles.",
            icon: "globe",
            category: AchievementCategory::Exploration,
            predicate: |p: &ProgressSnapshot| p.discovered_tiles_count() >= 1000,
        },
    ]
}

fn distance_achievements() -> Vec<Achievement> {
    vec![
        Achievement {
            id: "DISTANCE_5",
            name: "Stroller",
            description: "Walk a total of 5 km.",
            icon: "flame",
            category: AchievementCategory::Distance,
            predicate: |p: &ProgressSnapshot| p.total_distance_km() >= 5.0,
        },
        Achievement {
            id: "DISTANCE_42",
            name: "Marathoner",
            description: "Walk a total of 42 km.",
            icon: "mountain",
            category: AchievementCategory::Distance,
            predicate: |p: &ProgressSnapshot| p.total_distance_km() >= 42.0,
        },
    ]
}
