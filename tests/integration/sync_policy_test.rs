//! Integration tests for identity transitions and remote sync.

use super::store_mock::StalledRemote;
use fogwalker::geo::{Coordinate, TileId};
use fogwalker::progress::{
    decode_snapshot, encode_snapshot, ProgressEvent, ProgressSnapshot, SnapshotSource,
};
use fogwalker::storage::{LocalStore, MemoryRemoteStore, MemoryStore, RemoteStore, PROGRESS_KEY};
use fogwalker::sync::PersistTarget;
use fogwalker::{AppConfig, IdentityContext, IdentityUpdate, ProgressService, ProgressTracker};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn anonymous() -> IdentityUpdate {
    IdentityUpdate::ready(IdentityContext::anonymous())
}

fn signed_in(account: &str) -> IdentityUpdate {
    IdentityUpdate::ready(IdentityContext::authenticated(account))
}

fn walk_from(lat: f64, lng: f64, steps: usize) -> ProgressSnapshot {
    let mut tracker = ProgressTracker::default();
    for i in 0..steps {
        tracker.ingest_fix(Coordinate::new(lat + i as f64 * 0.001, lng));
    }
    tracker.snapshot().clone()
}

fn service(local: Arc<MemoryStore>, remote: &MemoryRemoteStore) -> ProgressService {
    let remote: Arc<dyn RemoteStore> = Arc::new(remote.clone());
    ProgressService::new(&AppConfig::default(), local, Some(remote)).unwrap()
}

fn drain(events: &mut tokio::sync::broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_login_hides_anonymous_progress() {
    let anonymous_walk = walk_from(40.0, -74.0, 3);
    let account_walk = walk_from(-33.86, 151.2, 4);

    let local = Arc::new(MemoryStore::new());
    local
        .set(PROGRESS_KEY, &encode_snapshot(&anonymous_walk).unwrap())
        .unwrap();
    let remote = MemoryRemoteStore::new();
    remote
        .put_document("acct-1", &encode_snapshot(&account_walk).unwrap())
        .unwrap();

    let service = service(local.clone(), &remote);
    service.apply_identity(anonymous());
    assert_eq!(service.snapshot().visited_tiles, anonymous_walk.visited_tiles);

    let mut events = service.subscribe_events();
    service.apply_identity(signed_in("acct-1"));

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(ProgressEvent::Reset)));
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::SnapshotLoaded(SnapshotSource::Remote { account_id }) if account_id == "acct-1"
    )));

    let snapshot = service.snapshot();
    assert_eq!(snapshot.visited_tiles, account_walk.visited_tiles);
    assert!(snapshot.visited_tiles.is_disjoint(&anonymous_walk.visited_tiles));
    assert_eq!(
        service.persist_target(),
        Some(PersistTarget::Remote {
            account_id: "acct-1".to_string()
        })
    );
    // The anonymous copy stays on the device
    assert!(local.contains_key(PROGRESS_KEY));
}

#[tokio::test(start_paused = true)]
async fn test_login_without_remote_document_starts_empty() {
    let local = Arc::new(MemoryStore::new());
    local
        .set(PROGRESS_KEY, &encode_snapshot(&walk_from(40.0, -74.0, 2)).unwrap())
        .unwrap();
    let remote = MemoryRemoteStore::new();

    let service = service(local, &remote);
    service.apply_identity(anonymous());
    service.apply_identity(signed_in("fresh"));

    assert!(service.snapshot().is_empty());
    assert_eq!(remote.listener_count("fresh"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signed_in_changes_sync_to_account_document() {
    let local = Arc::new(MemoryStore::new());
    let remote = MemoryRemoteStore::new();
    let service = service(local.clone(), &remote);
    service.apply_identity(signed_in("acct-2"));

    service.ingest_fix(Coordinate::new(48.85, 2.35)).unwrap();
    service.ingest_fix(Coordinate::new(48.851, 2.35)).unwrap();
    assert!(service.is_syncing());
    assert!(remote.document("acct-2").is_none());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!service.is_syncing());

    let stored = decode_snapshot(&remote.document("acct-2").unwrap()).unwrap();
    assert_eq!(stored.visited_tiles, service.snapshot().visited_tiles);
    assert_eq!(stored.explored_path.len(), 2);
    // Own echo does not replace the live snapshot
    assert_eq!(service.snapshot().explored_path.len(), 2);
    assert!(!local.contains_key(PROGRESS_KEY));
}

#[tokio::test(start_paused = true)]
async fn test_remote_push_replaces_snapshot() {
    let remote = MemoryRemoteStore::new();
    let service = service(Arc::new(MemoryStore::new()), &remote);
    service.apply_identity(signed_in("acct-3"));
    service.ingest_fix(Coordinate::new(10.0, 10.0)).unwrap();

    let other_device = walk_from(10.5, 10.5, 12);
    remote
        .put_document("acct-3", &encode_snapshot(&other_device).unwrap())
        .unwrap();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.visited_tiles, other_device.visited_tiles);
    // Twelve tiles unlock the first exploration badge on arrival
    assert!(snapshot.is_unlocked("TILES_10"));
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_is_swallowed() {
    let remote = MemoryRemoteStore::new();
    remote.set_offline(true);
    let service = service(Arc::new(MemoryStore::new()), &remote);
    service.apply_identity(signed_in("acct-4"));

    service.ingest_fix(Coordinate::new(35.68, 139.69)).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!service.is_syncing());
    assert!(remote.document("acct-4").is_none());
    assert_eq!(service.snapshot().explored_path.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_remote_write_times_out() {
    let mut config = AppConfig::default();
    config.sync.write_timeout_secs = 5;
    let remote = Arc::new(StalledRemote::default());
    let service = ProgressService::new(
        &config,
        Arc::new(MemoryStore::new()),
        Some(remote.clone() as Arc<dyn RemoteStore>),
    )
    .unwrap();
    service.apply_identity(signed_in("acct-5"));

    service.ingest_fix(Coordinate::new(1.0, 1.0)).unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(remote.attempts(), 1);
    assert!(service.is_syncing());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!service.is_syncing());
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_local_copy_and_detaches_listener() {
    let local = Arc::new(MemoryStore::new());
    local
        .set(PROGRESS_KEY, &encode_snapshot(&walk_from(40.0, -74.0, 2)).unwrap())
        .unwrap();
    let remote = MemoryRemoteStore::new();
    let service = service(local.clone(), &remote);

    service.apply_identity(anonymous());
    service.apply_identity(signed_in("acct-6"));
    assert_eq!(remote.listener_count("acct-6"), 1);

    service.apply_identity(anonymous());
    assert_eq!(remote.listener_count("acct-6"), 0);
    assert!(!local.contains_key(PROGRESS_KEY));
    assert!(service.snapshot().is_empty());

    // Late pushes for the old account are ignored
    remote
        .put_document("acct-6", &encode_snapshot(&walk_from(0.0, 0.0, 3)).unwrap())
        .unwrap();
    assert!(service.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_detaches_remote_listener() {
    let remote = MemoryRemoteStore::new();
    let service = service(Arc::new(MemoryStore::new()), &remote);
    service.apply_identity(signed_in("acct-8"));
    service.ingest_fix(Coordinate::new(59.33, 18.07)).unwrap();
    assert_eq!(remote.listener_count("acct-8"), 1);

    service.shutdown().await;

    assert_eq!(remote.listener_count("acct-8"), 0);
    assert!(!service.is_syncing());
    // The pending change was flushed before detaching
    let stored = decode_snapshot(&remote.document("acct-8").unwrap()).unwrap();
    assert_eq!(stored.explored_path.len(), 1);

    // Pushes after shutdown no longer reach the service
    remote
        .put_document("acct-8", &encode_snapshot(&walk_from(0.0, 0.0, 3)).unwrap())
        .unwrap();
    assert_eq!(service.snapshot().explored_path.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_account_switch_drops_pending_write() {
    let remote = MemoryRemoteStore::new();
    let service = service(Arc::new(MemoryStore::new()), &remote);

    service.apply_identity(signed_in("alice"));
    service.ingest_fix(Coordinate::new(40.0, -74.0)).unwrap();
    service.apply_identity(signed_in("bob"));
    service.ingest_fix(Coordinate::new(41.0, -75.0)).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(remote.document("alice").is_none());
    let bob = decode_snapshot(&remote.document("bob").unwrap()).unwrap();
    assert_eq!(bob.explored_path, vec![Coordinate::new(41.0, -75.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_pending_anonymous_write_lands_before_login() {
    let local = Arc::new(MemoryStore::new());
    let remote = MemoryRemoteStore::new();
    let service = service(local.clone(), &remote);

    service.apply_identity(anonymous());
    service.ingest_fix(Coordinate::new(40.0, -74.0)).unwrap();
    service.apply_identity(signed_in("acct-7"));

    let stored = decode_snapshot(&local.get(PROGRESS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.explored_path.len(), 1);
    assert!(service.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_identity_listener_waits_for_readiness() {
    let local = Arc::new(MemoryStore::new());
    local
        .set(PROGRESS_KEY, &encode_snapshot(&walk_from(40.0, -74.0, 2)).unwrap())
        .unwrap();
    let remote = MemoryRemoteStore::new();
    let service = service(local, &remote);

    let (tx, rx) = watch::channel(IdentityUpdate::default());
    let listener = service.spawn_identity_listener(rx);
    tokio::task::yield_now().await;
    assert_eq!(service.identity(), None);
    assert_eq!(service.persist_target(), None);

    tx.send(anonymous()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(service.persist_target(), Some(PersistTarget::Local));
    assert_eq!(service.snapshot().discovered_tiles_count(), 2);

    drop(tx);
    listener.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_watchers_see_each_change() {
    let service = service(Arc::new(MemoryStore::new()), &MemoryRemoteStore::new());
    service.apply_identity(anonymous());
    let mut snapshots = service.subscribe_snapshot();

    service.ingest_fix(Coordinate::new(40.0, -74.0)).unwrap();
    assert!(snapshots.has_changed().unwrap());
    let seen: HashSet<TileId> = snapshots.borrow_and_update().visited_tiles.clone();
    assert_eq!(seen.len(), 1);
}
