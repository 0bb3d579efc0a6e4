// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

use crate::models::EntityKind;

/// Collection names as constants.
pub mod collections {
    pub const WORKOUTS: &str = "workouts";
    /// Body progress entries (weight, body fat, measurements)
    pub const PROGRESS: &str = "progress";
}

/// Collection holding documents of `kind`.
pub fn collection_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Workout => collections::WORKOUTS,
        EntityKind::ProgressEntry => collections::PROGRESS,
    }
}
