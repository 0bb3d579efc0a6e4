// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic background refresh for the active owner.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::AppError;
use crate::sync::controller::ReconciliationController;

/// Handle to a running background refresh task.
///
/// Dropping the handle stops the task.
pub struct RefreshHandle {
    owner_id: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background refresh task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Refresh `owner_id` every `interval` until stopped or the session changes.
///
/// The first refresh runs immediately. Failures are logged and retried on
/// the next tick; the cache keeps its last good snapshot meanwhile.
pub fn spawn_background_refresh(
    controller: Arc<ReconciliationController>,
    owner_id: &str,
    interval: Duration,
) -> Result<RefreshHandle, AppError> {
    if interval.is_zero() {
        return Err(AppError::BadRequest(
            "refresh interval must be positive".to_string(),
        ));
    }

    let mut session_rx = controller.subscribe();
    let session = session_rx.borrow_and_update().clone();
    if session.owner_id.as_deref() != Some(owner_id) {
        return Err(AppError::NoActiveSession);
    }

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let owner = owner_id.to_string();
    let epoch = session.epoch;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(owner_id = %owner, interval_secs = interval.as_secs_f64(), "Background refresh started");

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!(owner_id = %owner, "Background refresh stopped");
                    break;
                }
                changed = session_rx.changed() => {
                    if changed.is_err() || session_rx.borrow_and_update().epoch != epoch {
                        tracing::info!(owner_id = %owner, "Session changed, stopping background refresh");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match controller.refresh(&owner).await {
                        Ok(outcome) => {
                            tracing::debug!(owner_id = %owner, ?outcome, "Background refresh tick");
                        }
                        Err(AppError::NoActiveSession | AppError::OwnerMismatch(_)) => {
                            tracing::info!(owner_id = %owner, "Owner no longer active, stopping background refresh");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(owner_id = %owner, error = %e, "Background refresh failed");
                        }
                    }
                }
            }
        }
    });

    Ok(RefreshHandle {
        owner_id: owner_id.to_string(),
        shutdown: Some(shutdown_tx),
        task: Some(task),
    })
}
