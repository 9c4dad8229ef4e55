//! Position source adapter.
//!
//! Tracks the watch status of the platform position source and decides which
//! fixes are accurate enough to reach the progress tracker.

pub mod filter;
pub mod gpx;

use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use filter::{AccuracyFilter, FixDecision};

/// One reported GPS position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coord: Coordinate,
    /// Reported horizontal accuracy radius in meters
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(coord: Coordinate, accuracy_meters: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coord,
            accuracy_meters,
            timestamp,
        }
    }
}

/// Watch status of the position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationStatus {
    /// Not watching
    #[default]
    Idle,
    /// Watching, waiting for the first fix
    Initializing,
    /// Receiving fixes
    Tracking,
    /// Permission refused
    Denied,
    /// Source failed
    Error,
}

impl std::fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationStatus::Idle => write!(f, "idle"),
            LocationStatus::Initializing => write!(f, "initializing"),
            LocationStatus::Tracking => write!(f, "tracking"),
            LocationStatus::Denied => write!(f, "denied"),
            LocationStatus::Error => write!(f, "error"),
        }
    }
}

/// Errors reported by the position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Geolocation is not supported")]
    Unsupported,

    #[error("Geolocation permission denied")]
    PermissionDenied,

    #[error("Position information is unavailable")]
    PositionUnavailable,

    #[error("Geolocation request timed out")]
    Timeout,
}

/// Status machine for the position source plus the accuracy gate.
#[derive(Debug, Clone, Default)]
pub struct LocationTracker {
    status: LocationStatus,
    filter: AccuracyFilter,
    last_fix: Option<PositionFix>,
}

impl LocationTracker {
    pub fn new(filter: AccuracyFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn status(&self) -> LocationStatus {
        self.status
    }

    pub fn filter(&self) -> &AccuracyFilter {
        &self.filter
    }

    /// Most recent fix, accepted or not.
    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    /// Begin watching. The first fix moves the status to `Tracking`.
    pub fn start(&mut self) {
        self.status = LocationStatus::Initializing;
        tracing::info!("Location watch started");
    }

    /// Stop watching.
    pub fn stop(&mut self) {
        if self.status != LocationStatus::Idle {
            self.status = LocationStatus::Idle;
            tracing::info!("Location watch stopped");
        }
    }

    /// Handle a fix from the source. Returns the coordinate to ingest when the
    /// fix passes the accuracy gate.
    pub fn on_fix(&mut self, fix: PositionFix) -> Option<Coordinate> {
        if self.last_fix.is_none() {
            tracing::info!(
                "Initial position acquired: {} (±{:.0} m)",
                fix.coord,
                fix.accuracy_meters
            );
        }
        self.last_fix = Some(fix);
        if self.status != LocationStatus::Tracking {
            self.status = LocationStatus::Tracking;
        }

        match self.filter.check(&fix) {
            FixDecision::Accept => Some(fix.coord),
            FixDecision::Reject { accuracy_meters } => {
                tracing::debug!(
                    "Dropping fix with accuracy {:.0} m (limit {:.0} m)",
                    accuracy_meters,
                    self.filter.max_accuracy_meters()
                );
                None
            }
        }
    }

    /// Handle a source error.
    pub fn on_error(&mut self, error: LocationError) {
        tracing::error!("Geolocation error: {}", error);
        self.status = match error {
            LocationError::PermissionDenied => LocationStatus::Denied,
            LocationError::Unsupported
            | LocationError::PositionUnavailable
            | LocationError::Timeout => LocationStatus::Error,
        };
    }
}
