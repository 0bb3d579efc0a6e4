// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout and progress-entry routes for the active owner.
//!
//! Reads are served from the local cache. Writes go through the
//! reconciliation controller, which applies them optimistically and rolls
//! back if the remote store rejects them.

use crate::error::{AppError, Result};
use crate::models::{Exercise, ExerciseSet, Measurements, ProgressEntry, Workout};
use crate::routes::{active_owner, validate_body};
use crate::time_utils::parse_document_date;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts", get(list_workouts).post(create_workout))
        .route(
            "/api/workouts/{id}",
            get(get_workout).put(update_workout).delete(delete_workout),
        )
        .route("/api/progress", get(list_progress).post(create_progress))
        .route(
            "/api/progress/{id}",
            get(get_progress).put(update_progress).delete(delete_progress),
        )
}

fn validate_date(value: &str) -> std::result::Result<(), ValidationError> {
    match parse_document_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("date")
            .with_message("expected RFC 3339 or YYYY-MM-DD".into())),
    }
}

fn parse_date(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_document_date(value)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}'", value)))
}

fn child_id(id: Option<String>) -> String {
    id.filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ─── Workouts ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRequest {
    /// Client-chosen id for creates; ignored on update
    #[validate(length(min = 1, max = 128))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[serde(default)]
    #[validate(nested)]
    pub exercises: Vec<ExerciseRequest>,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Deserialize, Validate)]
pub struct ExerciseRequest {
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub sets: Vec<SetRequest>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SetRequest {
    pub id: Option<String>,
    #[validate(range(max = 10000))]
    pub reps: u32,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
}

impl WorkoutRequest {
    fn into_workout(self, id: String) -> Result<Workout> {
        Ok(Workout {
            id,
            user_id: String::new(),
            name: self.name,
            date: parse_date(&self.date)?,
            exercises: self
                .exercises
                .into_iter()
                .map(|e| Exercise {
                    id: child_id(e.id),
                    name: e.name,
                    sets: e
                        .sets
                        .into_iter()
                        .map(|s| ExerciseSet {
                            id: child_id(s.id),
                            reps: s.reps,
                            weight: s.weight,
                        })
                        .collect(),
                    notes: e.notes,
                })
                .collect(),
            category: self.category,
            completed: self.completed,
        })
    }
}

async fn list_workouts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Workout>>> {
    active_owner(&state)?;
    Ok(Json(state.controller.workouts().await))
}

async fn get_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Workout>> {
    active_owner(&state)?;
    state
        .controller
        .workout(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Workout {} not found", id)))
}

async fn create_workout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WorkoutRequest>,
) -> Result<(StatusCode, Json<Workout>)> {
    validate_body(&body)?;
    let id = body.id.clone().unwrap_or_default();
    let workout = state.controller.create(body.into_workout(id)?).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

async fn update_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<WorkoutRequest>,
) -> Result<Json<Workout>> {
    validate_body(&body)?;
    let workout = state.controller.update(body.into_workout(id)?).await?;
    Ok(Json(workout))
}

async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.controller.delete::<Workout>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Progress Entries ────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    #[validate(length(min = 1, max = 128))]
    pub id: Option<String>,
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[validate(range(min = 0.0))]
    pub weight: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub body_fat: f64,
    #[serde(default)]
    pub measurements: Measurements,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl ProgressRequest {
    fn into_entry(self, id: String) -> Result<ProgressEntry> {
        Ok(ProgressEntry {
            id,
            user_id: String::new(),
            date: parse_date(&self.date)?,
            weight: self.weight,
            body_fat: self.body_fat,
            measurements: self.measurements,
            photos: self.photos,
        })
    }
}

async fn list_progress(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProgressEntry>>> {
    active_owner(&state)?;
    Ok(Json(state.controller.progress_entries().await))
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProgressEntry>> {
    active_owner(&state)?;
    state
        .controller
        .progress_entry(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Progress entry {} not found", id)))
}

async fn create_progress(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProgressRequest>,
) -> Result<(StatusCode, Json<ProgressEntry>)> {
    validate_body(&body)?;
    let id = body.id.clone().unwrap_or_default();
    let entry = state.controller.create(body.into_entry(id)?).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ProgressEntry>> {
    validate_body(&body)?;
    let entry = state.controller.update(body.into_entry(id)?).await?;
    Ok(Json(entry))
}

async fn delete_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.controller.delete::<ProgressEntry>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
