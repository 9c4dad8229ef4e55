//! Progress service: the single writer for the progress aggregate.

use super::debounce::{Debouncer, SyncFlag};
use super::SyncError;
use crate::achievements::{AchievementEvaluator, AchievementStatus, AchievementUnlocked};
use crate::geo::{Coordinate, ValidationError};
use crate::identity::{IdentityContext, IdentityUpdate};
use crate::progress::{
    decode_snapshot, encode_snapshot, ProgressDelta, ProgressEvent, ProgressSnapshot,
    ProgressStats, ProgressTracker, SnapshotSource, TrackerState,
};
use crate::storage::{
    AppConfig, LocalStore, RemoteCallback, RemoteStore, RemoteSubscription, SyncSettings,
    PROGRESS_KEY,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Event channel capacity.
const EVENT_CAPACITY: usize = 256;

/// Where the durable copy of the snapshot currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistTarget {
    /// Anonymous on-device store
    Local,
    /// Remote document of a signed-in account
    Remote { account_id: String },
}

/// Identity epoch and reset count at the time a write was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WriteStamp {
    epoch: u64,
    resets: u64,
}

struct Core {
    tracker: ProgressTracker,
    evaluator: AchievementEvaluator,
    /// Last identity acted on
    applied: Option<IdentityContext>,
    /// `None` until the identity provider is ready
    target: Option<PersistTarget>,
    /// Bumped on every identity change; stale listeners and writes compare against it
    epoch: u64,
    /// Bumped on every reset so writes of the pre-reset state are dropped
    resets: u64,
    debouncer: Debouncer,
    subscription: Option<RemoteSubscription>,
    /// Decoded form of the last document this service sent to the remote store
    last_written: Option<ProgressSnapshot>,
}

struct Shared {
    core: Mutex<Core>,
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    snapshot_tx: watch::Sender<Arc<ProgressSnapshot>>,
    events_tx: broadcast::Sender<ProgressEvent>,
    syncing: Arc<SyncFlag>,
    settings: SyncSettings,
}

/// Owns the progress tracker, evaluates achievements and persists changes.
///
/// Cloning yields another handle to the same aggregate. Every mutation is
/// serialized through one lock and published as a fresh read-only snapshot.
#[derive(Clone)]
pub struct ProgressService {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ProgressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressService")
            .field("state", &self.state())
            .field("is_syncing", &self.is_syncing())
            .finish_non_exhaustive()
    }
}

impl ProgressService {
    /// Create a service on the current tokio runtime.
    ///
    /// No storage is touched until a ready identity is applied.
    pub fn new(
        config: &AppConfig,
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, SyncError> {
        let runtime = Handle::try_current()?;
        let syncing = Arc::new(SyncFlag::default());
        let debouncer = Debouncer::new(config.sync.debounce(), runtime, Arc::clone(&syncing));
        let (snapshot_tx, _) = watch::channel(Arc::new(ProgressSnapshot::default()));
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let core = Core {
            tracker: ProgressTracker::new(config.tracking.lat_tile_size_degrees),
            evaluator: AchievementEvaluator::default(),
            applied: None,
            target: None,
            epoch: 0,
            resets: 0,
            debouncer,
            subscription: None,
            last_written: None,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                local,
                remote,
                snapshot_tx,
                events_tx,
                syncing,
                settings: config.sync.clone(),
            }),
        })
    }

    /// Validate and ingest one accepted fix.
    ///
    /// Returns without waiting on persistence. Invalid coordinates are
    /// rejected and leave the snapshot untouched.
    pub fn ingest_fix(&self, coord: Coordinate) -> Result<ProgressDelta, ValidationError> {
        coord.validate()?;

        let shared = &self.shared;
        let mut guard = shared.lock();
        let core = &mut *guard;

        let delta = core.tracker.ingest_fix(coord);
        shared.publish(core);
        shared.emit(ProgressEvent::FixIngested(delta));

        if delta.changes_progress() {
            shared.evaluate(core);
            shared.schedule_persist(core);
        }
        Ok(delta)
    }

    /// Unlock an achievement. Returns `true` only when this call changed state.
    pub fn unlock_achievement(&self, id: &str) -> bool {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let core = &mut *guard;

        if !core.tracker.unlock_achievement(id) {
            return false;
        }
        let name = core.evaluator.find(id).map_or(id, |a| a.name);
        tracing::info!("Achievement unlocked: {} ({})", name, id);
        let event = AchievementUnlocked::new(id, name);
        shared.publish(core);
        shared.emit(ProgressEvent::AchievementUnlocked(event));
        shared.schedule_persist(core);
        true
    }

    /// Clear the snapshot. With `clear_durable` the local copy is erased too;
    /// the remote document is never deleted.
    pub fn reset_progress(&self, clear_durable: bool) {
        let mut core = self.shared.lock();
        self.shared.reset(&mut core, clear_durable);
    }

    /// Replace the snapshot wholesale and persist it to the current target.
    pub fn load_snapshot(&self, snapshot: ProgressSnapshot) {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let core = &mut *guard;

        core.tracker.load_snapshot(snapshot);
        shared.publish(core);
        shared.emit(ProgressEvent::SnapshotLoaded(SnapshotSource::Imported));
        shared.evaluate(core);
        shared.schedule_persist(core);
    }

    /// React to an identity provider update.
    ///
    /// Updates before readiness, and repeats of the identity already applied,
    /// are ignored.
    pub fn apply_identity(&self, update: IdentityUpdate) {
        if !update.ready {
            tracing::debug!("Identity provider not ready, deferring storage decision");
            return;
        }

        let shared = &self.shared;
        let (stale_subscription, subscribe_to) = {
            let mut guard = shared.lock();
            let core = &mut *guard;

            if core.applied.as_ref() == Some(&update.context) {
                return;
            }
            let previous = core.applied.replace(update.context.clone());
            core.epoch += 1;

            // Land the last anonymous change here: a job already past its
            // quiet period now carries a stale epoch and will skip its write.
            if let Some(pending) = core.debouncer.take_pending() {
                pending.cancel();
                if core.target == Some(PersistTarget::Local) {
                    shared.write_local_snapshot(core.tracker.snapshot());
                }
            }
            let stale = core.subscription.take();
            core.last_written = None;

            match update.context.remote_account() {
                Some(account_id) => {
                    tracing::info!("Signed in as {}, switching to remote progress", account_id);
                    shared.reset(core, false);
                    if shared.remote.is_some() {
                        core.target = Some(PersistTarget::Remote {
                            account_id: account_id.to_string(),
                        });
                        (stale, Some((account_id.to_string(), core.epoch)))
                    } else {
                        tracing::warn!("No remote store configured, progress stays in memory");
                        core.target = None;
                        (stale, None)
                    }
                }
                None => {
                    if update.context.is_authenticated {
                        tracing::warn!("Authenticated identity without account id, treating as anonymous");
                    }
                    let was_signed_in = previous
                        .as_ref()
                        .is_some_and(|p| p.remote_account().is_some());
                    shared.reset(core, was_signed_in);
                    core.target = Some(PersistTarget::Local);
                    shared.load_local(core);
                    (stale, None)
                }
            }
        };

        drop(stale_subscription);

        if let Some((account_id, epoch)) = subscribe_to {
            Shared::subscribe_remote(&self.shared, &account_id, epoch);
        }
    }

    /// Drive [`apply_identity`](Self::apply_identity) from a watch channel
    /// until its sender is dropped.
    pub fn spawn_identity_listener(
        &self,
        mut updates: watch::Receiver<IdentityUpdate>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                let update = updates.borrow_and_update().clone();
                service.apply_identity(update);
                if updates.changed().await.is_err() {
                    tracing::debug!("Identity stream closed");
                    break;
                }
            }
        })
    }

    /// Run any pending debounced write now and wait for it.
    pub async fn flush(&self) {
        let (pending, target, stamp, guard) = {
            let mut core = self.shared.lock();
            let Some(pending) = core.debouncer.take_pending() else {
                return;
            };
            (
                pending,
                core.target.clone(),
                core.stamp(),
                self.shared.syncing.acquire(),
            )
        };

        if pending.cancel() {
            if let Some(target) = target {
                self.shared.persist(target, stamp).await;
            }
        }
        pending.join().await;
        drop(guard);
    }

    /// Flush pending writes and stop listening for remote changes.
    pub async fn shutdown(&self) {
        self.flush().await;
        let subscription = self.shared.lock().subscription.take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        tracing::info!("Progress service stopped");
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ProgressSnapshot> {
        Arc::clone(&self.shared.snapshot_tx.borrow())
    }

    /// Observe snapshot changes.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<ProgressSnapshot>> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Observe progress events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ProgressEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Whether a write is scheduled or in flight.
    pub fn is_syncing(&self) -> bool {
        self.shared.syncing.is_syncing()
    }

    pub fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.shared.syncing.subscribe()
    }

    pub fn state(&self) -> TrackerState {
        self.shared.lock().tracker.state()
    }

    /// Mutation counter of the underlying tracker.
    pub fn version(&self) -> u64 {
        self.shared.lock().tracker.version()
    }

    pub fn stats(&self) -> ProgressStats {
        self.snapshot().stats()
    }

    /// Every achievement with its unlock flag.
    pub fn achievement_statuses(&self) -> Vec<AchievementStatus> {
        let core = self.shared.lock();
        core.evaluator.statuses(core.tracker.snapshot())
    }

    /// Identity last applied, if any.
    pub fn identity(&self) -> Option<IdentityContext> {
        self.shared.lock().applied.clone()
    }

    /// Current persistence target, `None` before the identity provider is ready.
    pub fn persist_target(&self) -> Option<PersistTarget> {
        self.shared.lock().target.clone()
    }
}

impl Core {
    fn stamp(&self) -> WriteStamp {
        WriteStamp {
            epoch: self.epoch,
            resets: self.resets,
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, core: &Core) {
        self.snapshot_tx
            .send_replace(Arc::new(core.tracker.snapshot().clone()));
    }

    fn emit(&self, event: ProgressEvent) {
        // No receivers is fine
        let _ = self.events_tx.send(event);
    }

    /// Unlock every satisfied achievement and announce each one.
    fn evaluate(&self, core: &mut Core) -> usize {
        let unlocked = core.evaluator.evaluate(&mut core.tracker);
        if unlocked.is_empty() {
            return 0;
        }
        self.publish(core);
        let count = unlocked.len();
        for event in unlocked {
            self.emit(ProgressEvent::AchievementUnlocked(event));
        }
        count
    }

    fn reset(&self, core: &mut Core, clear_durable: bool) {
        if core.debouncer.cancel() {
            tracing::debug!("Dropped pending write on reset");
        }
        core.tracker.reset();
        core.resets += 1;
        tracing::info!("Progress reset (clear local copy: {})", clear_durable);
        self.publish(core);
        self.emit(ProgressEvent::Reset);

        if clear_durable {
            if let Err(e) = self.local.remove(PROGRESS_KEY) {
                tracing::error!("Failed to clear local progress: {}", e);
            }
        }
    }

    /// Load the anonymous snapshot from the local store, purging it if corrupt.
    fn load_local(self: &Arc<Self>, core: &mut Core) {
        let json = match self.local.get(PROGRESS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => {
                tracing::debug!("No local progress stored");
                return;
            }
            Err(e) => {
                tracing::error!("Error loading local progress: {}", e);
                return;
            }
        };

        match decode_snapshot(&json) {
            Ok(snapshot) => {
                tracing::info!(
                    "Loaded local progress: {} tiles, {:.2} km",
                    snapshot.discovered_tiles_count(),
                    snapshot.total_distance_km()
                );
                core.tracker.load_snapshot(snapshot);
                self.publish(core);
                self.emit(ProgressEvent::SnapshotLoaded(SnapshotSource::Local));
                if self.evaluate(core) > 0 {
                    self.schedule_persist(core);
                }
            }
            Err(e) => {
                tracing::warn!("Discarding corrupt local progress: {}", e);
                if let Err(e) = self.local.remove(PROGRESS_KEY) {
                    tracing::error!("Failed to purge local progress: {}", e);
                }
            }
        }
    }

    fn subscribe_remote(shared: &Arc<Shared>, account_id: &str, epoch: u64) {
        let Some(remote) = shared.remote.as_ref() else {
            return;
        };

        let weak = Arc::downgrade(shared);
        let account = account_id.to_string();
        let callback: RemoteCallback = Arc::new(move |document: String| {
            if let Some(shared) = weak.upgrade() {
                shared.on_remote_document(&account, epoch, &document);
            }
        });

        let subscription = remote.subscribe(account_id, callback);
        tracing::debug!("Subscribed to remote progress for {}", account_id);

        let stale = {
            let mut core = shared.lock();
            if core.epoch == epoch {
                core.subscription = Some(subscription);
                None
            } else {
                Some(subscription)
            }
        };
        drop(stale);
    }

    fn on_remote_document(self: &Arc<Self>, account_id: &str, epoch: u64, document: &str) {
        let snapshot = match decode_snapshot(document) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring malformed remote progress for {}: {}", account_id, e);
                return;
            }
        };

        let mut guard = self.lock();
        let core = &mut *guard;
        if core.epoch != epoch {
            tracing::debug!("Dropping remote update for previous identity {}", account_id);
            return;
        }
        if core.last_written.as_ref() == Some(&snapshot) || core.tracker.snapshot() == &snapshot {
            return;
        }

        core.tracker.load_snapshot(snapshot);
        self.publish(core);
        self.emit(ProgressEvent::SnapshotLoaded(SnapshotSource::Remote {
            account_id: account_id.to_string(),
        }));
        if self.evaluate(core) > 0 {
            self.schedule_persist(core);
        }
    }

    fn schedule_persist(self: &Arc<Self>, core: &mut Core) {
        let Some(target) = core.target.clone() else {
            tracing::trace!("No persistence target yet, keeping change in memory");
            return;
        };
        let stamp = core.stamp();
        let shared = Arc::clone(self);
        core.debouncer
            .schedule(move || async move { shared.persist(target, stamp).await });
    }

    /// Write the latest snapshot to `target` unless the identity changed or
    /// the progress was reset since scheduling.
    async fn persist(&self, target: PersistTarget, stamp: WriteStamp) {
        let document = {
            let mut core = self.lock();
            if core.stamp() != stamp {
                tracing::debug!("Skipping write scheduled before an identity change or reset");
                return;
            }
            let document = match encode_snapshot(core.tracker.snapshot()) {
                Ok(document) => document,
                Err(e) => {
                    tracing::error!("Failed to encode progress: {}", e);
                    return;
                }
            };
            if matches!(target, PersistTarget::Remote { .. }) {
                core.last_written = decode_snapshot(&document).ok();
            }
            document
        };

        match target {
            PersistTarget::Local => self.write_local(&document),
            PersistTarget::Remote { account_id } => self.write_remote(&account_id, document).await,
        }
    }

    fn write_local_snapshot(&self, snapshot: &ProgressSnapshot) {
        match encode_snapshot(snapshot) {
            Ok(document) => self.write_local(&document),
            Err(e) => tracing::error!("Failed to encode progress: {}", e),
        }
    }

    fn write_local(&self, document: &str) {
        match self.local.set(PROGRESS_KEY, document) {
            Ok(()) => tracing::debug!("Saved progress locally ({} bytes)", document.len()),
            Err(e) => tracing::error!("Error saving local progress: {}", e),
        }
    }

    async fn write_remote(&self, account_id: &str, document: String) {
        let Some(remote) = self.remote.as_ref() else {
            return;
        };
        let timeout = self.settings.write_timeout();

        match tokio::time::timeout(timeout, remote.write(account_id, document)).await {
            Ok(Ok(())) => tracing::debug!("Synced progress for {}", account_id),
            Ok(Err(e)) => tracing::error!("Error syncing progress for {}: {}", account_id, e),
            Err(_) => tracing::warn!(
                "Progress sync for {} timed out after {:?}",
                account_id,
                timeout
            ),
        }
    }
}
