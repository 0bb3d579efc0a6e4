// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation controller: the single writer of the cache.
//!
//! Handles:
//! - Optimistic create/update/delete with rollback when the remote write fails
//! - Per-entity serialization of mutations
//! - Refresh from the remote store without clobbering in-flight edits
//! - Owner session lifecycle (switching owners discards cached data)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::error::{AppError, WriteOp};
use crate::models::record::parse_batch;
use crate::models::{Entity, ProgressEntry, Workout};
use crate::sync::cache::{CacheStore, Cached};
use crate::sync::gateway::{GatewayError, RemoteGateway};
use crate::sync::mirror::LocalMirror;
use crate::sync::tracker::{Checkpoint, EntityKey, MutationTracker};

/// The active owner. `epoch` increases on every sign-in or sign-out so that
/// work started under an earlier session can tell it is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub owner_id: Option<String>,
    pub epoch: u64,
}

/// Remote gateways, one per entity type.
#[derive(Clone)]
pub struct Gateways {
    pub workouts: Arc<dyn RemoteGateway<Workout>>,
    pub progress: Arc<dyn RemoteGateway<ProgressEntry>>,
}

/// Entities the controller knows how to reconcile.
pub trait Tracked: Cached {
    fn gateway(gateways: &Gateways) -> &dyn RemoteGateway<Self>;
}

impl Tracked for Workout {
    fn gateway(gateways: &Gateways) -> &dyn RemoteGateway<Self> {
        gateways.workouts.as_ref()
    }
}

impl Tracked for ProgressEntry {
    fn gateway(gateways: &Gateways) -> &dyn RemoteGateway<Self> {
        gateways.progress.as_ref()
    }
}

/// Failure of a create, update or delete.
#[derive(Debug, thiserror::Error)]
pub enum MutationError<T> {
    #[error("no active session")]
    NoActiveSession,

    #[error("entity belongs to {found}, active owner is {expected}")]
    OwnerMismatch { expected: String, found: String },

    #[error("{0} not found")]
    NotFound(String),

    /// The optimistic change was rolled back. `restored` is what the cache
    /// holds again for this id (`None` after a failed create).
    #[error("remote {op} of {id} failed: {source}")]
    RemoteWriteFailed {
        op: WriteOp,
        id: String,
        restored: Option<T>,
        #[source]
        source: GatewayError,
    },
}

impl<T> MutationError<T> {
    /// The entity the cache was rolled back to, if any.
    pub fn restored(&self) -> Option<&T> {
        match self {
            MutationError::RemoteWriteFailed { restored, .. } => restored.as_ref(),
            _ => None,
        }
    }
}

impl<T: Serialize> From<MutationError<T>> for AppError {
    fn from(err: MutationError<T>) -> Self {
        match err {
            MutationError::NoActiveSession => AppError::NoActiveSession,
            MutationError::OwnerMismatch { expected, found } => AppError::OwnerMismatch(format!(
                "entity belongs to {}, active owner is {}",
                found, expected
            )),
            MutationError::NotFound(id) => AppError::NotFound(id),
            MutationError::RemoteWriteFailed {
                op,
                id,
                restored,
                source,
            } => {
                let restored = restored.and_then(|entity| match serde_json::to_value(&entity) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "Failed to serialize restored entity");
                        None
                    }
                });
                AppError::RemoteWriteFailed {
                    op,
                    id,
                    restored,
                    source,
                }
            }
        }
    }
}

/// What a refresh did to one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionRefresh {
    /// Reconciled snapshot equals the cache; nothing written.
    Unchanged,
    /// Cache replaced with the reconciled snapshot.
    Replaced,
    /// The owner changed while fetching; snapshot dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub workouts: CollectionRefresh,
    pub progress: CollectionRefresh,
}

/// Owns the cache and mediates every change to it.
pub struct ReconciliationController {
    cache: RwLock<CacheStore>,
    gateways: Gateways,
    tracker: MutationTracker,
    session: watch::Sender<Session>,
    mirror: Option<LocalMirror>,
}

impl ReconciliationController {
    pub fn new(gateways: Gateways) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            cache: RwLock::new(CacheStore::new()),
            gateways,
            tracker: MutationTracker::default(),
            session,
            mirror: None,
        }
    }

    /// Persist workout snapshots to `mirror` and seed new sessions from it.
    pub fn with_mirror(mut self, mirror: LocalMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    // ─── Session Lifecycle ───────────────────────────────────────

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Watch session changes (used by background refresh to stop itself).
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Make `owner_id` the active owner.
    ///
    /// Switching owners discards the cache and all mutation bookkeeping
    /// before anything for the new owner is admitted. Re-entering the current
    /// session is a no-op.
    pub async fn begin_session(&self, owner_id: &str) -> Session {
        let session = {
            let mut cache = self.cache.write().await;
            let current = self.session();
            if current.owner_id.as_deref() == Some(owner_id) {
                return current;
            }
            let session = self.bump_session(Some(owner_id.to_string()));
            cache.reset(owner_id);
            self.tracker.clear();
            session
        };

        tracing::info!(owner_id, epoch = session.epoch, "Session started");
        self.seed_from_mirror(owner_id, session.epoch).await;
        session
    }

    /// Drop the active owner and everything cached for it.
    pub async fn sign_out(&self) -> Session {
        let mut cache = self.cache.write().await;
        let previous = self.session().owner_id;
        let session = self.bump_session(None);
        cache.clear();
        self.tracker.clear();
        tracing::info!(previous_owner = ?previous, epoch = session.epoch, "Session ended");
        session
    }

    fn bump_session(&self, owner_id: Option<String>) -> Session {
        self.session.send_modify(|s| {
            s.owner_id = owner_id;
            s.epoch += 1;
        });
        self.session()
    }

    fn active_owner(&self) -> Option<(String, u64)> {
        let session = self.session.borrow();
        session
            .owner_id
            .as_ref()
            .map(|owner| (owner.clone(), session.epoch))
    }

    fn epoch_is(&self, epoch: u64) -> bool {
        self.session.borrow().epoch == epoch
    }

    async fn seed_from_mirror(&self, owner_id: &str, epoch: u64) {
        let Some(mirror) = &self.mirror else {
            return;
        };

        let documents = match mirror.load(owner_id).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read workout mirror, starting empty");
                return;
            }
        };

        let workouts: Vec<Workout> = parse_batch(&documents, Workout::from_document)
            .into_iter()
            .filter(|w| w.user_id == owner_id)
            .collect();

        let mut cache = self.cache.write().await;
        if !self.epoch_is(epoch) || cache.is_loaded() || !cache.workouts().is_empty() {
            return;
        }
        tracing::debug!(owner_id, count = workouts.len(), "Seeded workouts from mirror");
        cache.collection_mut::<Workout>().replace_all(workouts);
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Snapshot of every cached entity of type `T`, in cache order.
    pub async fn all<T: Tracked>(&self) -> Vec<T> {
        self.cache.read().await.collection::<T>().get_all().to_vec()
    }

    /// Cached entity by id. Absence is not an error.
    pub async fn get<T: Tracked>(&self, id: &str) -> Option<T> {
        self.cache.read().await.collection::<T>().get_by_id(id).cloned()
    }

    pub async fn workouts(&self) -> Vec<Workout> {
        self.all::<Workout>().await
    }

    pub async fn progress_entries(&self) -> Vec<ProgressEntry> {
        self.all::<ProgressEntry>().await
    }

    pub async fn workout(&self, id: &str) -> Option<Workout> {
        self.get::<Workout>(id).await
    }

    pub async fn progress_entry(&self, id: &str) -> Option<ProgressEntry> {
        self.get::<ProgressEntry>(id).await
    }

    /// Whether the active owner's data has been fetched at least once.
    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_loaded()
    }

    /// Whether `id` has an optimistic change waiting on the remote store.
    pub fn is_pending<T: Tracked>(&self, id: &str) -> bool {
        self.tracker.is_pending(&EntityKey::new(T::KIND, id))
    }

    // ─── Mutations ───────────────────────────────────────────────

    /// Create `entity`, assigning an id and owner if it has none.
    pub async fn create<T: Tracked>(&self, mut entity: T) -> Result<T, MutationError<T>> {
        let (owner, epoch) = self.claim_owner(&mut entity)?;
        if entity.id().is_empty() {
            entity.set_id(Uuid::new_v4().to_string());
        }

        let key = EntityKey::new(T::KIND, entity.id());
        let _turn = self.tracker.serialize(&key).await;

        let (prior, pending) = {
            let mut cache = self.cache.write().await;
            if !self.epoch_is(epoch) {
                return Err(MutationError::NoActiveSession);
            }
            let collection = cache.collection_mut::<T>();
            let prior = collection.get_by_id(entity.id()).cloned();
            let pending = self.tracker.begin(key);
            collection.upsert(entity.clone());
            (prior, pending)
        };
        tracing::debug!(kind = T::KIND.as_str(), id = entity.id(), owner = %owner, "Optimistic create applied");

        match T::gateway(&self.gateways).save(&entity).await {
            Ok(()) => {
                drop(pending);
                tracing::info!(kind = T::KIND.as_str(), id = entity.id(), "Create confirmed");
                Ok(entity)
            }
            Err(source) => {
                {
                    let mut cache = self.cache.write().await;
                    if self.epoch_is(epoch) {
                        let collection = cache.collection_mut::<T>();
                        match &prior {
                            Some(prior) => collection.upsert(prior.clone()),
                            None => {
                                collection.remove_by_id(entity.id());
                            }
                        }
                    }
                }
                drop(pending);
                tracing::warn!(kind = T::KIND.as_str(), id = entity.id(), error = %source, "Create failed, rolled back");
                Err(MutationError::RemoteWriteFailed {
                    op: WriteOp::Create,
                    id: entity.id().to_string(),
                    restored: prior,
                    source,
                })
            }
        }
    }

    /// Merge `edit` into the cached entity with the same id.
    ///
    /// Optional fields absent from `edit` keep their cached value locally and
    /// are left untouched remotely. Returns the entity as now cached.
    pub async fn update<T: Tracked>(&self, mut edit: T) -> Result<T, MutationError<T>> {
        let (_, epoch) = self.claim_owner(&mut edit)?;
        let key = EntityKey::new(T::KIND, edit.id());
        let _turn = self.tracker.serialize(&key).await;

        let (prior, applied, pending) = {
            let mut cache = self.cache.write().await;
            if !self.epoch_is(epoch) {
                return Err(MutationError::NoActiveSession);
            }
            let collection = cache.collection_mut::<T>();
            let prior = collection
                .get_by_id(edit.id())
                .cloned()
                .ok_or_else(|| MutationError::NotFound(edit.id().to_string()))?;
            let applied = edit.clone().merged_onto(&prior);
            let pending = self.tracker.begin(key);
            collection.upsert(applied.clone());
            (prior, applied, pending)
        };
        tracing::debug!(kind = T::KIND.as_str(), id = edit.id(), "Optimistic update applied");

        match T::gateway(&self.gateways).edit_merge(&edit).await {
            Ok(()) => {
                drop(pending);
                tracing::info!(kind = T::KIND.as_str(), id = edit.id(), "Update confirmed");
                Ok(applied)
            }
            Err(source) => {
                {
                    let mut cache = self.cache.write().await;
                    if self.epoch_is(epoch) {
                        cache.collection_mut::<T>().upsert(prior.clone());
                    }
                }
                drop(pending);
                tracing::warn!(kind = T::KIND.as_str(), id = edit.id(), error = %source, "Update failed, rolled back");
                Err(MutationError::RemoteWriteFailed {
                    op: WriteOp::Update,
                    id: edit.id().to_string(),
                    restored: Some(prior),
                    source,
                })
            }
        }
    }

    /// Delete the cached entity `id`. Returns the deleted entity.
    pub async fn delete<T: Tracked>(&self, id: &str) -> Result<T, MutationError<T>> {
        let (_, epoch) = self
            .active_owner()
            .ok_or(MutationError::NoActiveSession)?;
        let key = EntityKey::new(T::KIND, id);
        let _turn = self.tracker.serialize(&key).await;

        let (position, removed, pending) = {
            let mut cache = self.cache.write().await;
            if !self.epoch_is(epoch) {
                return Err(MutationError::NoActiveSession);
            }
            let (position, removed) = cache
                .collection_mut::<T>()
                .remove_by_id(id)
                .ok_or_else(|| MutationError::NotFound(id.to_string()))?;
            (position, removed, self.tracker.begin(key))
        };
        tracing::debug!(kind = T::KIND.as_str(), id, "Optimistic delete applied");

        match T::gateway(&self.gateways).delete_by_id(id).await {
            Ok(()) => {
                drop(pending);
                tracing::info!(kind = T::KIND.as_str(), id, "Delete confirmed");
                Ok(removed)
            }
            Err(source) => {
                {
                    let mut cache = self.cache.write().await;
                    if self.epoch_is(epoch) {
                        cache
                            .collection_mut::<T>()
                            .insert_at(position, removed.clone());
                    }
                }
                drop(pending);
                tracing::warn!(kind = T::KIND.as_str(), id, error = %source, "Delete failed, rolled back");
                Err(MutationError::RemoteWriteFailed {
                    op: WriteOp::Delete,
                    id: id.to_string(),
                    restored: Some(removed),
                    source,
                })
            }
        }
    }

    /// Stamp the active owner onto an ownerless entity, or reject one owned
    /// by somebody else.
    fn claim_owner<T: Entity>(&self, entity: &mut T) -> Result<(String, u64), MutationError<T>> {
        let (owner, epoch) = self
            .active_owner()
            .ok_or(MutationError::NoActiveSession)?;
        if entity.owner_id().is_empty() {
            entity.set_owner_id(owner.clone());
        } else if entity.owner_id() != owner {
            return Err(MutationError::OwnerMismatch {
                expected: owner,
                found: entity.owner_id().to_string(),
            });
        }
        Ok((owner, epoch))
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Pull both collections for `owner_id` and reconcile them into the cache.
    ///
    /// A failed fetch leaves that collection untouched and is reported as
    /// `RemoteReadFailed` after the other collection has been applied.
    pub async fn refresh(&self, owner_id: &str) -> Result<RefreshOutcome, AppError> {
        let (owner, epoch) = self.active_owner().ok_or(AppError::NoActiveSession)?;
        if owner != owner_id {
            return Err(AppError::OwnerMismatch(format!(
                "refresh requested for {}, active owner is {}",
                owner_id, owner
            )));
        }

        let since = self.tracker.checkpoint();
        let (workouts, progress) = tokio::join!(
            self.gateways.workouts.fetch_by_owner(owner_id),
            self.gateways.progress.fetch_by_owner(owner_id),
        );

        let mut failure = None;
        let workouts = match workouts {
            Ok(documents) => Some(
                self.apply_snapshot::<Workout>(owner_id, epoch, since, &documents)
                    .await,
            ),
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "Workout refresh failed, keeping cached data");
                failure = Some(e);
                None
            }
        };
        let progress = match progress {
            Ok(documents) => Some(
                self.apply_snapshot::<ProgressEntry>(owner_id, epoch, since, &documents)
                    .await,
            ),
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "Progress refresh failed, keeping cached data");
                failure.get_or_insert(e);
                None
            }
        };

        if matches!(
            workouts,
            Some(CollectionRefresh::Replaced | CollectionRefresh::Unchanged)
        ) {
            self.store_mirror(owner_id, epoch).await;
        }

        match (workouts, progress, failure) {
            (Some(workouts), Some(progress), None) => {
                tracing::debug!(owner_id, ?workouts, ?progress, "Refresh complete");
                Ok(RefreshOutcome { workouts, progress })
            }
            (_, _, Some(e)) => Err(AppError::RemoteReadFailed(e)),
            // Both fetches returned, so both collections were applied.
            _ => Err(AppError::Internal(anyhow::anyhow!(
                "refresh finished without an outcome"
            ))),
        }
    }

    async fn apply_snapshot<T: Tracked>(
        &self,
        owner_id: &str,
        epoch: u64,
        since: Checkpoint,
        documents: &[serde_json::Value],
    ) -> CollectionRefresh {
        let remote: Vec<T> = parse_batch(documents, T::from_document)
            .into_iter()
            .filter(|e| {
                let ours = e.owner_id() == owner_id;
                if !ours {
                    tracing::warn!(kind = T::KIND.as_str(), id = e.id(), "Skipping document owned by someone else");
                }
                ours
            })
            .collect();

        let mut cache = self.cache.write().await;
        if !self.epoch_is(epoch) {
            tracing::debug!(kind = T::KIND.as_str(), owner_id, "Owner changed during refresh, discarding snapshot");
            return CollectionRefresh::Discarded;
        }

        let current = cache.collection::<T>().get_all();
        let merged = reconcile(current, remote, |id| {
            self.tracker
                .is_guarded(&EntityKey::new(T::KIND, id), since)
        });
        let changed = merged.as_slice() != current;

        cache.mark_loaded();
        if !changed {
            return CollectionRefresh::Unchanged;
        }

        tracing::info!(kind = T::KIND.as_str(), owner_id, count = merged.len(), "Cache updated from remote");
        cache.collection_mut::<T>().replace_all(merged);
        CollectionRefresh::Replaced
    }

    async fn store_mirror(&self, owner_id: &str, epoch: u64) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        let workouts = {
            let cache = self.cache.read().await;
            if !self.epoch_is(epoch) {
                return;
            }
            cache.workouts().get_all().to_vec()
        };
        if let Err(e) = mirror.store(owner_id, &workouts).await {
            tracing::warn!(error = %e, "Failed to write workout mirror");
        }
    }
}

/// Merge a fetched snapshot with the local collection.
///
/// Remote order and content win, except for ids where `guarded` holds: those
/// keep the local version (or stay absent if locally deleted), and guarded
/// local entities missing remotely are appended. Duplicate remote ids keep
/// their first occurrence.
fn reconcile<T: Entity>(local: &[T], remote: Vec<T>, guarded: impl Fn(&str) -> bool) -> Vec<T> {
    let local_by_id: HashMap<&str, &T> = local.iter().map(|e| (e.id(), e)).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(remote.len());
    let mut merged = Vec::with_capacity(remote.len());

    for entity in remote {
        if !seen.insert(entity.id().to_string()) {
            continue;
        }
        if guarded(entity.id()) {
            if let Some(local) = local_by_id.get(entity.id()) {
                merged.push((*local).clone());
            }
        } else {
            merged.push(entity);
        }
    }

    for entity in local {
        if guarded(entity.id()) && !seen.contains(entity.id()) {
            merged.push(entity.clone());
        }
    }

    merged
}
