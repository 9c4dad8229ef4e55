//! Storage backends for progress snapshots and configuration.
//!
//! Two channels exist: a synchronous on-device key/value store used while the
//! user is anonymous, and a remote per-account document store used while
//! signed in. Failures on either are reported to the caller, who logs and
//! carries on with the in-memory state.

pub mod config;
pub mod database;
pub mod memory;
pub mod remote;
pub mod schema;

use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

pub use config::{AppConfig, StorageSettings, SyncSettings, TrackingSettings};
pub use database::Database;
pub use memory::MemoryStore;
pub use remote::MemoryRemoteStore;

/// Local key under which the anonymous progress snapshot is stored.
pub const PROGRESS_KEY: &str = "walker_progress_data";

/// Local key under which the discovery journal is stored.
pub const JOURNAL_KEY: &str = "walker_discovery_log_v1";

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::QueryFailed(e.to_string())
    }
}

/// Synchronous on-device key/value store.
pub trait LocalStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Callback invoked with the document JSON whenever a remote document changes.
pub type RemoteCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Remote per-account document store.
pub trait RemoteStore: Send + Sync {
    /// Upsert the account's document.
    fn write(&self, account_id: &str, document: String) -> BoxFuture<'static, Result<(), StorageError>>;

    /// Listen for changes to the account's document.
    ///
    /// Implementations may deliver the current document immediately. The
    /// listener stays active until the returned handle is dropped or
    /// [`RemoteSubscription::unsubscribe`] is called.
    fn subscribe(&self, account_id: &str, callback: RemoteCallback) -> RemoteSubscription;
}

/// Active remote listener. Unsubscribes on drop.
pub struct RemoteSubscription {
    account_id: String,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl RemoteSubscription {
    pub fn new(account_id: impl Into<String>, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            account_id: account_id.into(),
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            tracing::debug!("Unsubscribed remote listener for {}", self.account_id);
        }
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RemoteSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSubscription")
            .field("account_id", &self.account_id)
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
