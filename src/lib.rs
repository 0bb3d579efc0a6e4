// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lift-Tracker: offline-first workout and body-progress tracking
//!
//! This crate keeps an owner-scoped local cache of workouts and progress
//! entries in sync with a remote document store, and derives per-exercise
//! strength metrics and body-progress series from the cached data.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod sync;
pub mod time_utils;

use config::Config;
use std::sync::Arc;
use sync::{RefreshHandle, ReconciliationController};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub controller: Arc<ReconciliationController>,
    /// Background refresh for the active session, if any
    pub refresh_task: tokio::sync::Mutex<Option<RefreshHandle>>,
}

impl AppState {
    pub fn new(config: Config, controller: ReconciliationController) -> Self {
        Self {
            config,
            controller: Arc::new(controller),
            refresh_task: tokio::sync::Mutex::new(None),
        }
    }
}
