// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote store contract used by the reconciliation controller.
//!
//! Gateways return raw documents from `fetch_by_owner`; typing happens at the
//! validation boundary in [`crate::models::record`]. Errors are mapped into
//! [`GatewayError`] once, inside each adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::models::Entity;

/// Failure reported by a remote gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("remote store rejected the request: {0}")]
    Rejected(String),

    #[error("remote document not found: {0}")]
    NotFound(String),

    #[error("remote store not connected (offline mode)")]
    Offline,
}

/// The four remote operations the core depends on, per entity type.
///
/// No call is atomic with any other and back-to-back calls carry no ordering
/// guarantee; sequencing is the controller's job.
#[async_trait]
pub trait RemoteGateway<T: Entity>: Send + Sync {
    /// Write the whole document under its id.
    async fn save(&self, entity: &T) -> Result<(), GatewayError>;

    /// All documents belonging to `owner_id`, unvalidated.
    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Vec<Value>, GatewayError>;

    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError>;

    /// Overwrite only the fields named by [`Entity::merge_fields`].
    async fn edit_merge(&self, entity: &T) -> Result<(), GatewayError>;
}

/// Operation recorded by [`MemoryGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOp {
    Save,
    FetchByOwner,
    DeleteById,
    EditMerge,
}

/// Call log entry: the operation and the id or owner it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub op: GatewayOp,
    pub target: String,
}

/// In-process document store implementing [`RemoteGateway`] for any entity.
///
/// Used for offline mode and tests. Supports injected failures, pausing
/// writes or fetches mid-flight, and a call log.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    documents: Mutex<Vec<Value>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<VecDeque<(GatewayOp, GatewayError)>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
    write_gate: Arc<tokio::sync::Mutex<()>>,
    fetch_gate: Arc<tokio::sync::Mutex<()>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a stored document, bypassing the call log.
    pub fn put_document(&self, document: Value) {
        let id = document_id(&document);
        let mut docs = lock(&self.inner.documents);
        match docs.iter_mut().find(|d| document_id(d) == id) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
    }

    pub fn remove_document(&self, id: &str) {
        lock(&self.inner.documents).retain(|d| document_id(d).as_deref() != Some(id));
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        lock(&self.inner.documents)
            .iter()
            .find(|d| document_id(d).as_deref() == Some(id))
            .cloned()
    }

    pub fn documents(&self) -> Vec<Value> {
        lock(&self.inner.documents).clone()
    }

    /// Make the next call of `op` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        lock(&self.inner.failures).push_back((op, error));
    }

    /// Fail every call with [`GatewayError::Offline`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Block all writes until the returned guard is dropped.
    pub async fn pause_writes(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.inner.write_gate.clone().lock_owned().await
    }

    /// Hold fetches after they are counted until the returned guard is
    /// dropped.
    pub async fn pause_fetches(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.inner.fetch_gate.clone().lock_owned().await
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.inner.calls).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    fn record(&self, op: GatewayOp, target: &str) -> Result<(), GatewayError> {
        lock(&self.inner.calls).push(GatewayCall {
            op,
            target: target.to_string(),
        });

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Offline);
        }

        let mut failures = lock(&self.inner.failures);
        if let Some(pos) = failures.iter().position(|(o, _)| *o == op) {
            if let Some((_, err)) = failures.remove(pos) {
                return Err(err);
            }
        }
        Ok(())
    }

    async fn wait_for_writes(&self) {
        let _gate = self.inner.write_gate.lock().await;
    }
}

#[async_trait]
impl<T: Entity> RemoteGateway<T> for MemoryGateway {
    async fn save(&self, entity: &T) -> Result<(), GatewayError> {
        self.wait_for_writes().await;
        self.record(GatewayOp::Save, entity.id())?;
        let document = to_document(entity)?;
        self.put_document(document);
        Ok(())
    }

    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Vec<Value>, GatewayError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        drop(self.inner.fetch_gate.lock().await);
        self.record(GatewayOp::FetchByOwner, owner_id)?;
        Ok(lock(&self.inner.documents)
            .iter()
            .filter(|d| d.get("userId").and_then(Value::as_str) == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError> {
        self.wait_for_writes().await;
        self.record(GatewayOp::DeleteById, id)?;
        self.remove_document(id);
        Ok(())
    }

    async fn edit_merge(&self, entity: &T) -> Result<(), GatewayError> {
        self.wait_for_writes().await;
        self.record(GatewayOp::EditMerge, entity.id())?;

        let patch = to_document(entity)?;
        let mut docs = lock(&self.inner.documents);
        let existing = docs
            .iter_mut()
            .find(|d| document_id(d).as_deref() == Some(entity.id()));

        match existing {
            Some(Value::Object(target)) => {
                for field in entity.merge_fields() {
                    if let Some(value) = patch.get(field) {
                        target.insert(field.to_string(), value.clone());
                    }
                }
            }
            _ => docs.push(patch),
        }
        Ok(())
    }
}

fn to_document<T: Entity>(entity: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(entity).map_err(|e| GatewayError::Rejected(e.to_string()))
}

fn document_id(document: &Value) -> Option<String> {
    document.get("id").and_then(Value::as_str).map(String::from)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panic while holding one of these locks leaves plain data behind;
    // keep serving it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
