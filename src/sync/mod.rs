//! Progress persistence and identity-driven sync.
//!
//! [`ProgressService`] owns the progress aggregate and decides where its
//! durable copy lives: the local store while anonymous, the remote per-account
//! document while signed in. Writes are debounced so a burst of fixes produces
//! one write.

pub mod debounce;
pub mod service;

use thiserror::Error;

pub use debounce::{Debouncer, PendingWrite, SyncFlag, SyncGuard};
pub use service::{PersistTarget, ProgressService};

/// Sync service errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
