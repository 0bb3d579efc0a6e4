// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lift-Tracker API Server
//!
//! Serves an owner's workouts, body-progress entries and derived strength
//! metrics from a local cache kept in sync with Firestore.

use lift_tracker::{
    config::Config,
    db::FirestoreDb,
    sync::{Gateways, LocalMirror, MemoryGateway, ReconciliationController},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, offline = config.offline_mode, "Starting Lift-Tracker API");

    let gateways = if config.offline_mode {
        tracing::warn!("Offline mode: using in-memory document store");
        Gateways {
            workouts: Arc::new(MemoryGateway::new()),
            progress: Arc::new(MemoryGateway::new()),
        }
    } else {
        let db = FirestoreDb::new(&config.gcp_project_id).await?;
        Gateways {
            workouts: Arc::new(db.clone()),
            progress: Arc::new(db),
        }
    };

    let mut controller = ReconciliationController::new(gateways);
    if let Some(path) = &config.local_mirror_path {
        tracing::info!(path = %path.display(), "Workout mirror enabled");
        controller = controller.with_mirror(LocalMirror::new(path));
    }

    let state = Arc::new(AppState::new(config.clone(), controller));
    let app = lift_tracker::routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = state.refresh_task.lock().await.take() {
        handle.stop().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lift_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
