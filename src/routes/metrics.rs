// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chart data derived from the cached workouts and progress entries.

use crate::error::{AppError, Result};
use crate::models::{BodyMetricPoint, DerivedMetricPoint, TimeRange};
use crate::routes::active_owner;
use crate::services::metrics;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/metrics/exercises", get(list_exercises))
        .route("/api/metrics/exercises/{name}", get(get_exercise_progress))
        .route("/api/metrics/body", get(get_body_progress))
}

#[derive(Deserialize)]
struct RangeQuery {
    /// One of 1m, 3m, 6m, 1y, all (default)
    #[serde(default)]
    range: TimeRange,
}

/// Bad query strings get the same JSON error body as every other 400.
fn parse_range(
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<TimeRange> {
    query
        .map(|Query(q)| q.range)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Distinct exercise names across all cached workouts.
async fn list_exercises(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    active_owner(&state)?;
    let workouts = state.controller.workouts().await;
    Ok(Json(metrics::exercise_names(&workouts)))
}

/// Per-workout strength series for one exercise.
async fn get_exercise_progress(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Vec<DerivedMetricPoint>>> {
    active_owner(&state)?;
    let range = parse_range(query)?;
    let workouts = state.controller.workouts().await;
    let points = metrics::exercise_progress(&workouts, &name);
    let in_range = metrics::filter_by_range(&points, range, chrono::Utc::now());

    tracing::debug!(
        exercise = %name,
        range = ?range,
        total = points.len(),
        shown = in_range.len(),
        "Computed exercise progress"
    );
    Ok(Json(in_range.to_vec()))
}

/// Body-weight, body-fat and measurement series.
async fn get_body_progress(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Vec<BodyMetricPoint>>> {
    active_owner(&state)?;
    let range = parse_range(query)?;
    let entries = state.controller.progress_entries().await;
    let points = metrics::body_progress(&entries);
    Ok(Json(
        metrics::filter_by_range(&points, range, chrono::Utc::now()).to_vec(),
    ))
}
