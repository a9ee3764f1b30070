//! Offline-tolerant reconciliation between the local plant cache and a
//! remote store.
//!
//! The remote store is semi-authoritative at startup and advisory afterwards:
//!
//! - `initialize` replaces the cache with a non-empty remote listing and
//!   otherwise leaves it alone.
//! - `create`, `water` and `delete` always succeed locally. The remote call
//!   is best-effort and its outcome is recorded on the plant's [`SyncState`].
//!
//! Every change is persisted and then published to subscribers.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cache::{CacheError, PlantCache};
use crate::models::{Plant, PlantError, SyncState};
use crate::remote::{NewPlant, RemoteError, RemotePlant, RemoteStore};

/// Result of the startup refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The cache was replaced by this many remote plants.
    Synced(usize),
    /// The store answered with no usable plants; the cache was kept.
    RemoteEmpty,
    /// The store could not be listed; the cache was kept.
    Unavailable(RemoteError),
}

impl InitOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, InitOutcome::Synced(_))
    }
}

/// Counts from a [`Reconciler::push_pending`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Local-only plants the store accepted.
    pub created: usize,
    /// Waterings the store acknowledged.
    pub watered: usize,
    /// Plants whose remote call failed again.
    pub failed: usize,
}

/// Errors surfaced by the engine. Remote failures are never among them.
#[derive(Debug)]
pub enum EngineError {
    /// The local cache could not be written.
    Persist(CacheError),
    /// The requested plant violates the model invariants.
    InvalidPlant(PlantError),
    /// No plant matches the given id or position.
    NotFound(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Persist(e) => write!(f, "Failed to save plants: {}", e),
            EngineError::InvalidPlant(e) => write!(f, "{}", e),
            EngineError::NotFound(what) => write!(f, "Plant not found: {}", what),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Persist(e) => Some(e),
            EngineError::InvalidPlant(e) => Some(e),
            EngineError::NotFound(_) => None,
        }
    }
}

impl From<CacheError> for EngineError {
    fn from(e: CacheError) -> Self {
        EngineError::Persist(e)
    }
}

impl From<PlantError> for EngineError {
    fn from(e: PlantError) -> Self {
        EngineError::InvalidPlant(e)
    }
}

/// Sole owner of the plant cache.
///
/// Other components read snapshots through [`plants`](Self::plants) or
/// follow changes through [`subscribe`](Self::subscribe).
pub struct Reconciler<R> {
    cache: PlantCache,
    remote: R,
    changes: watch::Sender<Vec<Plant>>,
}

impl<R: RemoteStore> Reconciler<R> {
    pub fn new(cache: PlantCache, remote: R) -> Self {
        let (changes, _) = watch::channel(cache.plants().to_vec());
        Self {
            cache,
            remote,
            changes,
        }
    }

    pub fn plants(&self) -> &[Plant] {
        self.cache.plants()
    }

    pub fn get(&self, local_id: Uuid) -> Option<&Plant> {
        self.cache
            .position_of(local_id)
            .and_then(|position| self.cache.get(position))
    }

    /// Plants whose local state has yet to reach the remote store.
    ///
    /// Store records that arrived without an id are not pending; sending them
    /// again would duplicate them remotely.
    pub fn pending(&self) -> Vec<&Plant> {
        self.plants().iter().filter(|p| p.sync.needs_push()).collect()
    }

    /// Receives the full plant list after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Plant>> {
        self.changes.subscribe()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Full refresh from the remote store.
    ///
    /// A non-empty listing replaces the cache wholesale. An empty listing or
    /// a failed call leaves the persisted cache untouched, so a spuriously
    /// empty store never wipes offline data.
    pub async fn initialize(&mut self) -> Result<InitOutcome, EngineError> {
        let records = match self.remote.list_plants().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Remote listing failed, using local cache: {}", e);
                return Ok(InitOutcome::Unavailable(e));
            }
        };

        let now = Utc::now();
        let mut plants: Vec<Plant> = records
            .iter()
            .filter_map(|record| match record.to_plant(now) {
                Ok(plant) => Some(plant),
                Err(e) => {
                    tracing::warn!("Skipping invalid remote plant {:?}: {}", record.id, e);
                    None
                }
            })
            .collect();

        if plants.is_empty() {
            tracing::info!("Remote store returned no plants, keeping local cache");
            return Ok(InitOutcome::RemoteEmpty);
        }

        keep_local_ids(self.cache.plants(), &mut plants);

        let count = plants.len();
        self.cache.replace_all(plants)?;
        self.notify();
        tracing::info!("Replaced local cache with {} remote plant(s)", count);

        Ok(InitOutcome::Synced(count))
    }

    /// Adds a plant watered now.
    ///
    /// If the store accepts it, the echoed record is adopted as-is. Otherwise
    /// the plant is kept locally without a remote id.
    pub async fn create(&mut self, name: &str, interval_days: u32) -> Result<Plant, EngineError> {
        let candidate = Plant::new(name, interval_days)?;

        let plant = match self.remote.create_plant(&NewPlant::from(&candidate)).await {
            Ok(record) => adopt_echo(candidate, &record),
            Err(e) => {
                tracing::warn!("Remote create failed for '{}': {}", candidate.name, e);
                let sync = if e.is_transport() {
                    SyncState::LocalOnly
                } else {
                    SyncState::SyncFailed(e.to_string())
                };
                Plant { sync, ..candidate }
            }
        };

        self.cache.append(plant.clone())?;
        self.notify();
        Ok(plant)
    }

    /// Marks a plant as watered now.
    ///
    /// The local change is persisted before the store is contacted.
    pub async fn water(&mut self, local_id: Uuid) -> Result<Plant, EngineError> {
        let now = Utc::now();
        let plant = self.apply(local_id, |p| p.mark_watered(now))?;
        self.notify();

        let remote_id = match &plant.remote_id {
            Some(remote_id) => remote_id.clone(),
            None => return Ok(plant),
        };

        let sync = match self.remote.mark_watered(&remote_id).await {
            Ok(()) => SyncState::Synced,
            Err(e) => {
                tracing::warn!("Remote water failed for {}: {}", remote_id, e);
                SyncState::SyncFailed(e.to_string())
            }
        };

        let plant = self.apply(local_id, |p| p.sync = sync)?;
        self.notify();
        Ok(plant)
    }

    /// Waters the plant at `position` in the current ordering.
    pub async fn water_at(&mut self, position: usize) -> Result<Plant, EngineError> {
        let local_id = self.id_at(position)?;
        self.water(local_id).await
    }

    /// Removes a plant locally, then asks the store to delete it.
    ///
    /// A failed remote delete is logged and otherwise ignored.
    pub async fn delete(&mut self, local_id: Uuid) -> Result<Plant, EngineError> {
        let position = self.position(local_id)?;
        let removed = self
            .cache
            .remove_at(position)?
            .ok_or_else(|| EngineError::NotFound(local_id.to_string()))?;
        self.notify();

        if let Some(remote_id) = &removed.remote_id {
            if let Err(e) = self.remote.delete_plant(remote_id).await {
                tracing::warn!("Remote delete failed for {}: {}", remote_id, e);
            }
        }

        Ok(removed)
    }

    /// Deletes the plant at `position` in the current ordering.
    pub async fn delete_at(&mut self, position: usize) -> Result<Plant, EngineError> {
        let local_id = self.id_at(position)?;
        self.delete(local_id).await
    }

    /// Sends every unsynced plant to the store once.
    ///
    /// Plants without a remote id are created and adopt the id the store
    /// returns; plants with one have their watering re-sent.
    pub async fn push_pending(&mut self) -> Result<PushReport, EngineError> {
        let pending: Vec<Plant> = self.pending().into_iter().cloned().collect();
        let mut report = PushReport::default();

        for plant in &pending {
            let (remote_id, sync) = match &plant.remote_id {
                None => match self.remote.create_plant(&NewPlant::from(plant)).await {
                    Ok(RemotePlant { id: Some(id), .. }) if !id.is_empty() => {
                        report.created += 1;
                        (Some(id), SyncState::Synced)
                    }
                    Ok(_) => {
                        tracing::warn!("Remote store accepted '{}' without an id", plant.name);
                        report.created += 1;
                        (None, SyncState::NoRemoteId)
                    }
                    Err(e) => {
                        report.failed += 1;
                        (None, SyncState::SyncFailed(e.to_string()))
                    }
                },
                Some(remote_id) => match self.remote.mark_watered(remote_id).await {
                    Ok(()) => {
                        report.watered += 1;
                        (None, SyncState::Synced)
                    }
                    Err(e) => {
                        report.failed += 1;
                        (None, SyncState::SyncFailed(e.to_string()))
                    }
                },
            };

            self.apply(plant.local_id, |p| {
                if remote_id.is_some() {
                    p.remote_id = remote_id;
                }
                p.sync = sync;
            })?;
        }

        if !pending.is_empty() {
            self.notify();
        }
        tracing::info!(
            "Pushed pending plants: {} created, {} watered, {} failed",
            report.created,
            report.watered,
            report.failed
        );

        Ok(report)
    }

    fn position(&self, local_id: Uuid) -> Result<usize, EngineError> {
        self.cache
            .position_of(local_id)
            .ok_or_else(|| EngineError::NotFound(local_id.to_string()))
    }

    fn id_at(&self, position: usize) -> Result<Uuid, EngineError> {
        self.cache
            .get(position)
            .map(|p| p.local_id)
            .ok_or_else(|| EngineError::NotFound(format!("no plant at position {}", position + 1)))
    }

    /// Mutates and persists one plant, returning its new state.
    fn apply<F>(&mut self, local_id: Uuid, mutator: F) -> Result<Plant, EngineError>
    where
        F: FnOnce(&mut Plant),
    {
        let position = self.position(local_id)?;
        self.cache
            .update_at(position, mutator)?
            .cloned()
            .ok_or_else(|| EngineError::NotFound(local_id.to_string()))
    }

    fn notify(&self) {
        self.changes.send_replace(self.cache.plants().to_vec());
    }
}

/// Builds the plant to store from the store's echo of `candidate`.
///
/// A readable echo is adopted as-is apart from the local id, even when it
/// carries no remote id.
fn adopt_echo(candidate: Plant, record: &RemotePlant) -> Plant {
    match record.to_plant(candidate.last_watered_at) {
        Ok(echoed) => Plant {
            local_id: candidate.local_id,
            ..echoed
        },
        Err(e) => Plant {
            sync: SyncState::SyncFailed(format!("remote store echoed an invalid plant: {}", e)),
            ..candidate
        },
    }
}

/// Gives refreshed plants the local id of the cached plant with the same
/// remote id, so local references survive a full refresh.
fn keep_local_ids(existing: &[Plant], refreshed: &mut [Plant]) {
    let mut used = HashSet::new();
    for plant in refreshed.iter_mut() {
        let known = plant.remote_id.as_ref().and_then(|remote_id| {
            existing
                .iter()
                .find(|p| p.remote_id.as_ref() == Some(remote_id))
        });
        if let Some(known) = known {
            if used.insert(known.local_id) {
                plant.local_id = known.local_id;
            }
        }
    }
}
