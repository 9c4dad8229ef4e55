//! Instrumented stores for persistence tests.

use fogwalker::storage::{
    LocalStore, MemoryStore, RemoteCallback, RemoteStore, RemoteSubscription, StorageError,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Local store that counts successful writes.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LocalStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

/// Remote store whose writes never complete.
#[derive(Default)]
pub struct StalledRemote {
    attempts: AtomicUsize,
}

impl StalledRemote {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl RemoteStore for StalledRemote {
    fn write(&self, _account_id: &str, _document: String) -> BoxFuture<'static, Result<(), StorageError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().boxed()
    }

    fn subscribe(&self, account_id: &str, _callback: RemoteCallback) -> RemoteSubscription {
        RemoteSubscription::new(account_id, || {})
    }
}
