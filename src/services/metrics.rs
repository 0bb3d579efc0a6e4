// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise and body-progression analytics.
//!
//! Pure functions over workout and progress snapshots. Nothing here touches
//! the cache; callers pass in cloned collections.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::record::{parse_batch, parse_workout, DateFallback};
use crate::models::{
    BodyMetricPoint, DerivedMetricPoint, Exercise, ProgressEntry, TimeRange, Timestamped, Workout,
};
use crate::time_utils::format_display_date;

/// Divisor of the one-rep-max estimate: `weight * reps / 30.48 + weight`.
pub const ONE_REP_MAX_DIVISOR: f64 = 30.48;

/// Estimated one-rep max for a single set.
pub fn estimate_one_rep_max(weight: f64, reps: u32) -> f64 {
    (weight * f64::from(reps) / ONE_REP_MAX_DIVISOR) + weight
}

/// Per-workout metrics for `exercise_name`, oldest first.
///
/// Workouts without a matching exercise are skipped. Workouts sharing a date
/// keep their input order.
pub fn exercise_progress(workouts: &[Workout], exercise_name: &str) -> Vec<DerivedMetricPoint> {
    let mut points: Vec<DerivedMetricPoint> = workouts
        .iter()
        .filter_map(|w| {
            w.find_exercise(exercise_name)
                .map(|exercise| occurrence_metrics(w.date, exercise))
        })
        .collect();

    // sort_by_key is stable
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Same as [`exercise_progress`] but starting from raw stored documents.
///
/// Documents with an unparsable date are charted at `now`; any other
/// malformed document is dropped without affecting the rest.
pub fn exercise_progress_from_documents(
    documents: &[Value],
    exercise_name: &str,
    now: DateTime<Utc>,
) -> Vec<DerivedMetricPoint> {
    let workouts = parse_batch(documents, |doc| {
        parse_workout(doc, DateFallback::SubstituteNow(now))
    });
    exercise_progress(&workouts, exercise_name)
}

fn occurrence_metrics(date: DateTime<Utc>, exercise: &Exercise) -> DerivedMetricPoint {
    let mut max_weight = 0.0_f64;
    let mut max_reps = 0_u32;
    let mut estimated_one_rep_max = 0.0_f64;
    let mut max_volume = 0.0_f64;

    for set in &exercise.sets {
        let weight = set.weight.filter(|w| w.is_finite() && *w > 0.0);

        if let Some(w) = weight {
            max_weight = max_weight.max(w);
        }
        if set.reps > 0 {
            max_reps = max_reps.max(set.reps);
        }
        if let (Some(w), true) = (weight, set.reps > 0) {
            estimated_one_rep_max = estimated_one_rep_max.max(estimate_one_rep_max(w, set.reps));
            max_volume = max_volume.max(w * f64::from(set.reps));
        }
    }

    DerivedMetricPoint {
        timestamp: date,
        display_date: format_display_date(date),
        max_weight,
        estimated_one_rep_max,
        max_reps,
        max_volume,
    }
}

/// Points strictly newer than `now - range`.
///
/// Expects `points` in ascending time order, as produced by this module, and
/// returns the matching suffix.
pub fn filter_by_range<T: Timestamped>(points: &[T], range: TimeRange, now: DateTime<Utc>) -> &[T] {
    match range.cutoff(now) {
        None => points,
        Some(cutoff) => {
            let start = points.partition_point(|p| p.timestamp() <= cutoff);
            &points[start..]
        }
    }
}

/// Distinct exercise names across all workouts.
///
/// Names are compared ignoring case; the first spelling seen is kept.
pub fn exercise_names(workouts: &[Workout]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names: Vec<String> = workouts
        .iter()
        .flat_map(|w| w.exercises.iter())
        .filter(|e| !e.name.trim().is_empty())
        .filter(|e| seen.insert(e.name.to_lowercase()))
        .map(|e| e.name.clone())
        .collect();

    names.sort_by_key(|name| name.to_lowercase());
    names
}

/// Body-progression chart points, oldest first.
///
/// Several entries on the same day are all kept, in input order.
pub fn body_progress(entries: &[ProgressEntry]) -> Vec<BodyMetricPoint> {
    let mut points: Vec<BodyMetricPoint> = entries
        .iter()
        .map(|e| BodyMetricPoint {
            entry_id: e.id.clone(),
            timestamp: e.date,
            display_date: format_display_date(e.date),
            weight: e.weight,
            body_fat: e.body_fat,
            chest: e.measurements.chest,
            waist: e.measurements.waist,
            arms: e.measurements.arms,
        })
        .collect();

    points.sort_by_key(|p| p.timestamp);
    points
}
