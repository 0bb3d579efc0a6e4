// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Owner-scoped local mirror of workouts and progress entries.
//!
//! The store itself is synchronous and holds no locks; the reconciliation
//! controller owns it behind an async `RwLock` and is its only writer.

use std::collections::HashMap;

use crate::models::{Entity, ProgressEntry, Workout};

/// Ordered collection with at most one entity per id.
#[derive(Debug, Clone)]
pub struct EntityCollection<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: Entity> EntityCollection<T> {
    /// Replace in place if the id exists, otherwise append.
    pub fn upsert(&mut self, entity: T) {
        let existing = self.positions.get(entity.id()).copied();
        match existing {
            Some(pos) => self.items[pos] = entity,
            None => {
                self.positions.insert(entity.id().to_string(), self.items.len());
                self.items.push(entity);
            }
        }
    }

    /// Remove by id, returning the entity and the position it occupied.
    pub fn remove_by_id(&mut self, id: &str) -> Option<(usize, T)> {
        let pos = self.positions.remove(id)?;
        let removed = self.items.remove(pos);
        self.reindex_from(pos);
        Some((pos, removed))
    }

    /// Insert at `pos` (clamped to the end). An existing entity with the same
    /// id is replaced in place instead.
    pub fn insert_at(&mut self, pos: usize, entity: T) {
        if self.positions.contains_key(entity.id()) {
            self.upsert(entity);
            return;
        }
        let pos = pos.min(self.items.len());
        self.items.insert(pos, entity);
        self.reindex_from(pos);
    }

    /// Swap in a new snapshot. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, entities: Vec<T>) {
        self.items.clear();
        self.positions.clear();
        for entity in entities {
            if self.positions.contains_key(entity.id()) {
                tracing::warn!(kind = %T::KIND, id = entity.id(), "Dropping duplicate id in snapshot");
                continue;
            }
            self.positions
                .insert(entity.id().to_string(), self.items.len());
            self.items.push(entity);
        }
    }

    pub fn get_all(&self) -> &[T] {
        &self.items
    }

    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, item) in self.items.iter().enumerate().skip(start) {
            self.positions.insert(item.id().to_string(), pos);
        }
    }
}

/// Cache contents for the active owner.
#[derive(Debug, Default)]
pub struct CacheStore {
    owner_id: Option<String>,
    /// Set by the first successful remote fetch for this owner.
    loaded: bool,
    workouts: EntityCollection<Workout>,
    progress: EntityCollection<ProgressEntry>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Discard everything and scope the store to a new owner.
    pub fn reset(&mut self, owner_id: &str) {
        self.clear();
        self.owner_id = Some(owner_id.to_string());
    }

    /// Discard everything, including the owner.
    pub fn clear(&mut self) {
        self.owner_id = None;
        self.loaded = false;
        self.workouts.clear();
        self.progress.clear();
    }

    pub fn workouts(&self) -> &EntityCollection<Workout> {
        &self.workouts
    }

    pub fn progress(&self) -> &EntityCollection<ProgressEntry> {
        &self.progress
    }

    pub fn collection<T: Cached>(&self) -> &EntityCollection<T> {
        T::collection(self)
    }

    pub fn collection_mut<T: Cached>(&mut self) -> &mut EntityCollection<T> {
        T::collection_mut(self)
    }
}

/// Entities that have a home in the [`CacheStore`].
pub trait Cached: Entity {
    fn collection(store: &CacheStore) -> &EntityCollection<Self>;
    fn collection_mut(store: &mut CacheStore) -> &mut EntityCollection<Self>;
}

impl Cached for Workout {
    fn collection(store: &CacheStore) -> &EntityCollection<Self> {
        &store.workouts
    }

    fn collection_mut(store: &mut CacheStore) -> &mut EntityCollection<Self> {
        &mut store.workouts
    }
}

impl Cached for ProgressEntry {
    fn collection(store: &CacheStore) -> &EntityCollection<Self> {
        &store.progress
    }

    fn collection_mut(store: &mut CacheStore) -> &mut EntityCollection<Self> {
        &mut store.progress
    }
}
