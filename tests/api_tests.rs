// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests against in-memory gateways.

use axum::http::StatusCode;
use lift_tracker::sync::{GatewayError, GatewayOp};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, json_request};

async fn start_session(app: &axum::Router, owner: &str) {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/session", json!({ "ownerId": owner })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn bench_workout(date: &str, sets: serde_json::Value) -> serde_json::Value {
    json!({
        "name": "Push",
        "date": date,
        "exercises": [{ "name": "Bench Press", "sets": sets }]
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = create_test_app();
    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_requires_session() {
    let (app, _, _) = create_test_app();
    let response = app
        .oneshot(empty_request("GET", "/api/workouts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "no_active_session");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (app, state, _) = create_test_app();
    start_session(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/session"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ownerId"], "alice");
    assert!(state.refresh_task.lock().await.is_some());

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/session"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ownerId"], serde_json::Value::Null);
    assert!(state.refresh_task.lock().await.is_none());
}

#[tokio::test]
async fn test_session_rejects_empty_owner() {
    let (app, _, _) = create_test_app();
    let response = app
        .oneshot(json_request("POST", "/api/session", json!({ "ownerId": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workout_crud() {
    let (app, _, remote) = create_test_app();
    start_session(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/workouts",
            bench_workout("2023-01-05", json!([{ "reps": 5, "weight": 135 }])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["userId"], "alice");
    assert_eq!(created["date"], "2023-01-05T00:00:00Z");
    assert!(remote.workouts.document(&id).is_some());

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/workouts/{}", id),
            json!({ "name": "Push (heavy)", "date": "2023-01-05", "exercises": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Push (heavy)");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/workouts/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request("GET", &format!("/api/workouts/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_rejects_invalid_body() {
    let (app, _, _) = create_test_app();
    start_session(&app, "alice").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/workouts",
            bench_workout("not a date", json!([])),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_write_returns_bad_gateway_and_rolls_back() {
    let (app, state, remote) = create_test_app();
    start_session(&app, "alice").await;
    remote
        .progress
        .fail_next(GatewayOp::Save, GatewayError::Unavailable("timeout".into()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/progress",
            json!({ "date": "2023-02-01", "weight": 80.5, "bodyFat": 17.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "remote_write_failed");
    assert!(state.controller.progress_entries().await.is_empty());
}

#[tokio::test]
async fn test_failed_update_returns_restored_workout() {
    let (app, state, remote) = create_test_app();
    start_session(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/workouts",
            json!({ "id": "w1", "name": "Legs", "date": "2023-01-05", "category": "strength" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    remote
        .workouts
        .fail_next(GatewayOp::EditMerge, GatewayError::Rejected("denied".into()));

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/workouts/w1",
            json!({ "name": "Legs (heavy)", "date": "2023-01-05" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "remote_write_failed");
    assert_eq!(body["restored"]["id"], "w1");
    assert_eq!(body["restored"]["name"], "Legs");
    assert_eq!(body["restored"]["category"], "strength");
    assert_eq!(state.controller.workout("w1").await.unwrap().name, "Legs");
}

#[tokio::test]
async fn test_failed_create_has_no_restored_entity() {
    let (app, _, remote) = create_test_app();
    start_session(&app, "alice").await;
    remote
        .workouts
        .fail_next(GatewayOp::Save, GatewayError::Unavailable("timeout".into()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/workouts",
            json!({ "name": "Legs", "date": "2023-01-05" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_json(response).await.get("restored").is_none());
}

#[tokio::test]
async fn test_exercise_metrics() {
    let (app, _, _) = create_test_app();
    start_session(&app, "alice").await;

    for (date, sets) in [
        ("2023-01-01", json!([{ "reps": 10, "weight": 135 }, { "reps": 8, "weight": 155 }])),
        ("2023-01-08", json!([{ "reps": 6, "weight": 175 }])),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/workouts", bench_workout(date, sets)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/metrics/exercises"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!(["Bench Press"]));

    let response = app
        .oneshot(empty_request(
            "GET",
            "/api/metrics/exercises/bench%20press?range=all",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let points = body_json(response).await;
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["maxWeight"], 155.0);
    assert_eq!(points[0]["maxVolume"], 1350.0);
    assert_eq!(points[1]["maxReps"], 6);
    let one_rep_max = points[1]["estimatedOneRepMax"].as_f64().unwrap();
    assert!((one_rep_max - 209.448).abs() < 0.01);
}

#[tokio::test]
async fn test_metrics_reject_unknown_range() {
    let (app, _, _) = create_test_app();
    start_session(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/metrics/body?range=2w"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["details"].is_string());

    let response = app
        .oneshot(empty_request(
            "GET",
            "/api/metrics/exercises/squat?range=forever",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_manual_refresh_reports_outcome() {
    let (app, _, remote) = create_test_app();
    start_session(&app, "alice").await;
    remote.workouts.put_document(json!({
        "id": "w1", "userId": "alice", "name": "Legs", "date": "2023-01-05", "exercises": []
    }));

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/api/workouts"))
        .await
        .unwrap();
    let workouts = body_json(response).await;
    assert_eq!(workouts.as_array().unwrap().len(), 1);
}
