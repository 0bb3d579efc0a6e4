// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offline-first synchronization between the local cache and the remote store.

pub mod cache;
pub mod controller;
pub mod gateway;
pub mod mirror;
pub mod poller;
pub mod tracker;

pub use cache::{CacheStore, Cached, EntityCollection};
pub use controller::{
    CollectionRefresh, Gateways, MutationError, ReconciliationController, RefreshOutcome, Session,
    Tracked,
};
pub use gateway::{GatewayCall, GatewayError, GatewayOp, MemoryGateway, RemoteGateway};
pub use mirror::{LocalMirror, MirrorError};
pub use poller::{spawn_background_refresh, RefreshHandle};
pub use tracker::{Checkpoint, EntityKey};
