// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use lift_tracker::config::Config;
use lift_tracker::db::FirestoreDb;
use lift_tracker::models::{Exercise, ExerciseSet, Measurements, ProgressEntry, Workout};
use lift_tracker::routes::create_router;
use lift_tracker::sync::{Gateways, MemoryGateway, ReconciliationController};
use lift_tracker::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// In-memory stand-ins for the two remote collections.
#[allow(dead_code)]
pub struct TestRemote {
    pub workouts: MemoryGateway,
    pub progress: MemoryGateway,
}

#[allow(dead_code)]
impl TestRemote {
    pub fn new() -> Self {
        Self {
            workouts: MemoryGateway::new(),
            progress: MemoryGateway::new(),
        }
    }

    pub fn gateways(&self) -> Gateways {
        Gateways {
            workouts: Arc::new(self.workouts.clone()),
            progress: Arc::new(self.progress.clone()),
        }
    }

    pub fn controller(&self) -> Arc<ReconciliationController> {
        Arc::new(ReconciliationController::new(self.gateways()))
    }
}

/// Create a test app backed by in-memory gateways.
/// Returns the router, the shared state and the remote stand-ins.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TestRemote) {
    let remote = TestRemote::new();
    let controller = ReconciliationController::new(remote.gateways());
    let state = Arc::new(AppState::new(Config::test_default(), controller));
    (create_router(state.clone()), state, remote)
}

#[allow(dead_code)]
pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Workout with a single exercise made of `(reps, weight)` sets.
#[allow(dead_code)]
pub fn workout(id: &str, owner: &str, date: DateTime<Utc>, exercise: &str, sets: &[(u32, f64)]) -> Workout {
    Workout {
        id: id.to_string(),
        user_id: owner.to_string(),
        name: format!("{} day", exercise),
        date,
        exercises: vec![Exercise {
            id: "e1".to_string(),
            name: exercise.to_string(),
            sets: sets
                .iter()
                .enumerate()
                .map(|(i, (reps, weight))| ExerciseSet {
                    id: format!("s{}", i),
                    reps: *reps,
                    weight: Some(*weight),
                })
                .collect(),
            notes: None,
        }],
        category: None,
        completed: None,
    }
}

#[allow(dead_code)]
pub fn progress_entry(id: &str, owner: &str, date: DateTime<Utc>, weight: f64) -> ProgressEntry {
    ProgressEntry {
        id: id.to_string(),
        user_id: owner.to_string(),
        date,
        weight,
        body_fat: 18.0,
        measurements: Measurements {
            chest: 100.0,
            waist: 80.0,
            arms: 35.0,
        },
        photos: vec![],
    }
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
