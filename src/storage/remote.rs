//! In-process remote document store.
//!
//! Stands in for a hosted per-account document database: one JSON document per
//! account, merged on write, pushed to every listener of that account.

use super::{RemoteCallback, RemoteStore, RemoteSubscription, StorageError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RemoteState {
    documents: HashMap<String, serde_json::Value>,
    listeners: HashMap<String, Vec<(u64, RemoteCallback)>>,
}

/// Shared in-memory [`RemoteStore`]. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
    next_listener: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, as when the network drops.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current document JSON for an account.
    pub fn document(&self, account_id: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        state.documents.get(account_id).map(|v| v.to_string())
    }

    /// Replace a document as another device would, notifying listeners.
    pub fn put_document(&self, account_id: &str, document: &str) -> Result<(), StorageError> {
        let value: serde_json::Value = serde_json::from_str(document)
            .map_err(|e| StorageError::RemoteWriteFailed(e.to_string()))?;
        self.store_and_notify(account_id, value, false);
        Ok(())
    }

    /// Number of active listeners for an account.
    pub fn listener_count(&self, account_id: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.listeners.get(account_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn store_and_notify(&self, account_id: &str, value: serde_json::Value, merge: bool) {
        let (document, callbacks) = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            let entry = state
                .documents
                .entry(account_id.to_string())
                .or_insert(serde_json::Value::Null);
            let replacement = match (merge, value) {
                (true, serde_json::Value::Object(fields)) => match entry.as_object_mut() {
                    Some(existing) => {
                        existing.extend(fields);
                        None
                    }
                    None => Some(serde_json::Value::Object(fields)),
                },
                (_, value) => Some(value),
            };
            if let Some(value) = replacement {
                *entry = value;
            }
            let document = entry.to_string();
            let callbacks: Vec<RemoteCallback> = state
                .listeners
                .get(account_id)
                .map(|l| l.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            (document, callbacks)
        };

        // Listeners run outside the lock so they may call back into the store.
        for callback in callbacks {
            callback(document.clone());
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn write(&self, account_id: &str, document: String) -> BoxFuture<'static, Result<(), StorageError>> {
        let store = self.clone();
        let account_id = account_id.to_string();

        async move {
            if store.offline.load(Ordering::SeqCst) {
                return Err(StorageError::RemoteWriteFailed("offline".to_string()));
            }
            let value: serde_json::Value = serde_json::from_str(&document)
                .map_err(|e| StorageError::RemoteWriteFailed(e.to_string()))?;
            store.store_and_notify(&account_id, value, true);
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self, account_id: &str, callback: RemoteCallback) -> RemoteSubscription {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);

        let current = match self.state.lock() {
            Ok(mut state) => {
                state
                    .listeners
                    .entry(account_id.to_string())
                    .or_default()
                    .push((id, Arc::clone(&callback)));
                state.documents.get(account_id).map(|v| v.to_string())
            }
            Err(_) => None,
        };

        // Deliver the existing document first, like a snapshot listener does.
        if let Some(document) = current {
            callback(document);
        }

        let state = Arc::clone(&self.state);
        let key = account_id.to_string();
        RemoteSubscription::new(account_id, move || {
            if let Ok(mut state) = state.lock() {
                if let Some(listeners) = state.listeners.get_mut(&key) {
                    listeners.retain(|(listener_id, _)| *listener_id != id);
                }
            }
        })
    }
}
