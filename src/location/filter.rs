//! Accuracy gate for incoming fixes.

use super::PositionFix;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default accuracy threshold in meters.
pub const DEFAULT_MAX_ACCURACY_METERS: f64 = 50.0;

/// Verdict on a single fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixDecision {
    Accept,
    Reject { accuracy_meters: f64 },
}

/// Accepts fixes whose accuracy radius is finite and within the threshold.
#[derive(Debug, Clone)]
pub struct AccuracyFilter {
    max_accuracy_meters: f64,
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl Default for AccuracyFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACCURACY_METERS)
    }
}

impl AccuracyFilter {
    pub fn new(max_accuracy_meters: f64) -> Self {
        Self {
            max_accuracy_meters,
            accepted: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn max_accuracy_meters(&self) -> f64 {
        self.max_accuracy_meters
    }

    pub fn check(&self, fix: &PositionFix) -> FixDecision {
        let accuracy = fix.accuracy_meters;
        if accuracy.is_finite() && accuracy >= 0.0 && accuracy <= self.max_accuracy_meters {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            FixDecision::Accept
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            FixDecision::Reject {
                accuracy_meters: accuracy,
            }
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
