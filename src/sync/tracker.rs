// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-entity mutation bookkeeping.
//!
//! Each entity moves through `Clean -> OptimisticallyApplied -> {Confirmed |
//! RolledBack} -> Clean`. The tracker serializes mutations on the same entity
//! and tells a refresh which entities it must leave alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::EntityKind;

/// Cache key of a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Sequence number marking the moment a refresh started fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(u64);

#[derive(Default)]
pub(crate) struct MutationTracker {
    /// Per-entity FIFO lock serializing mutations on the same key.
    locks: DashMap<EntityKey, Arc<Mutex<()>>>,
    /// Entities whose optimistic change has not resolved yet.
    pending: DashMap<EntityKey, u64>,
    /// Sequence number at which each entity's last mutation resolved.
    settled: DashMap<EntityKey, u64>,
    seq: AtomicU64,
    /// Bumped by `clear`; guards from an earlier session settle as no-ops.
    generation: AtomicU64,
}

impl MutationTracker {
    /// Wait for earlier mutations on `key` to finish.
    ///
    /// tokio's mutex queues waiters fairly, so mutations apply in the order
    /// they were issued.
    pub(crate) async fn serialize(&self, key: &EntityKey) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Mark `key` as optimistically applied. The returned guard settles the
    /// mutation when dropped.
    pub(crate) fn begin(&self, key: EntityKey) -> PendingMutation<'_> {
        let seq = self.next_seq();
        self.pending.insert(key.clone(), seq);
        PendingMutation {
            tracker: self,
            key,
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.seq.load(Ordering::SeqCst))
    }

    /// Whether a refresh that started at `since` must keep the local copy of
    /// `key`: a mutation is still in flight, or one resolved after the
    /// refresh began fetching and the fetched copy may predate it.
    pub(crate) fn is_guarded(&self, key: &EntityKey, since: Checkpoint) -> bool {
        if self.pending.contains_key(key) {
            return true;
        }
        self.settled
            .get(key)
            .is_some_and(|settled_at| *settled_at > since.0)
    }

    pub(crate) fn is_pending(&self, key: &EntityKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Forget everything; used when the owner changes.
    pub(crate) fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.clear();
        self.settled.clear();
        self.locks.clear();
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle(&self, key: &EntityKey, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(id = %key.id, "Ignoring mutation settled after owner change");
            return;
        }
        let seq = self.next_seq();
        self.pending.remove(key);
        self.settled.insert(key.clone(), seq);
    }
}

/// An optimistic change that has not been confirmed or rolled back yet.
pub(crate) struct PendingMutation<'a> {
    tracker: &'a MutationTracker,
    key: EntityKey,
    generation: u64,
}

impl Drop for PendingMutation<'_> {
    fn drop(&mut self) {
        self.tracker.settle(&self.key, self.generation);
    }
}
