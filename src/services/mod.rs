// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod metrics;

pub use metrics::{
    body_progress, estimate_one_rep_max, exercise_names, exercise_progress,
    exercise_progress_from_documents, filter_by_range,
};
