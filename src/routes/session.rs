// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle and manual refresh.

use crate::error::Result;
use crate::routes::{active_owner, validate_body};
use crate::sync::{spawn_background_refresh, RefreshOutcome};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/session",
            get(get_session).post(start_session).delete(end_session),
        )
        .route("/api/refresh", post(refresh_now))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub owner_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub owner_id: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub epoch: u64,
    /// Whether the owner's data has been fetched at least once
    pub loaded: bool,
}

async fn session_response(state: &AppState) -> SessionResponse {
    let session = state.controller.session();
    SessionResponse {
        owner_id: session.owner_id,
        epoch: session.epoch,
        loaded: state.controller.is_loaded().await,
    }
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

/// Make `ownerId` the active owner and start its background refresh.
async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    validate_body(&body)?;

    let mut refresh_task = state.refresh_task.lock().await;
    let same_owner = refresh_task
        .as_ref()
        .is_some_and(|h| h.owner_id() == body.owner_id && !h.is_finished());

    if !same_owner {
        if let Some(previous) = refresh_task.take() {
            previous.stop().await;
        }
        state.controller.begin_session(&body.owner_id).await;
        *refresh_task = Some(spawn_background_refresh(
            state.controller.clone(),
            &body.owner_id,
            state.config.refresh_interval,
        )?);
    }
    drop(refresh_task);

    Ok(Json(session_response(&state).await))
}

/// Sign out: stop background refresh and discard cached data.
async fn end_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    if let Some(handle) = state.refresh_task.lock().await.take() {
        handle.stop().await;
    }
    state.controller.sign_out().await;
    Json(session_response(&state).await)
}

/// Refresh the active owner's data immediately.
async fn refresh_now(State(state): State<Arc<AppState>>) -> Result<Json<RefreshOutcome>> {
    let owner = active_owner(&state)?;
    let outcome = state.controller.refresh(&owner).await?;
    Ok(Json(outcome))
}
