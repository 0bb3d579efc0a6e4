// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Validation boundary for documents coming from the remote store or the
//! local mirror.
//!
//! Stored documents are loosely shaped JSON written by older clients, so
//! nothing is trusted by cast: each document either becomes a well-typed
//! entity or a [`MalformedRecord`] that callers skip.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{EntityKind, Exercise, ExerciseSet, Measurements, ProgressEntry, Workout};
use crate::time_utils::parse_document_date;

/// A document that could not be turned into an entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed {kind} record {}: {reason}", .id.as_deref().unwrap_or("<no id>"))]
pub struct MalformedRecord {
    pub kind: EntityKind,
    pub id: Option<String>,
    pub reason: String,
}

/// What to do with a workout whose date does not parse.
#[derive(Debug, Clone, Copy)]
pub enum DateFallback {
    /// Treat the document as malformed.
    Reject,
    /// Keep the document and use the given processing time as its date.
    SubstituteNow(DateTime<Utc>),
}

/// Parse a workout document.
pub fn parse_workout(value: &Value, dates: DateFallback) -> Result<Workout, MalformedRecord> {
    let malformed = |id: Option<&str>, reason: &str| MalformedRecord {
        kind: EntityKind::Workout,
        id: id.map(String::from),
        reason: reason.to_string(),
    };

    let doc = value
        .as_object()
        .ok_or_else(|| malformed(None, "document is not an object"))?;
    let id = required_id(doc).ok_or_else(|| malformed(None, "missing id"))?;
    let id = id.as_str();
    let user_id = doc
        .get("userId")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(Some(id), "missing userId"))?;

    let date = match doc.get("date").and_then(Value::as_str).and_then(parse_document_date) {
        Some(date) => date,
        None => match dates {
            DateFallback::Reject => return Err(malformed(Some(id), "unparsable date")),
            DateFallback::SubstituteNow(now) => {
                tracing::debug!(workout_id = id, "Unparsable workout date, using now");
                now
            }
        },
    };

    let raw_exercises = doc
        .get("exercises")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(Some(id), "exercises is not an array"))?;

    let mut exercises = Vec::with_capacity(raw_exercises.len());
    for (index, raw) in raw_exercises.iter().enumerate() {
        let exercise = raw
            .as_object()
            .ok_or_else(|| malformed(Some(id), "exercise is not an object"))?;
        let name = exercise
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(Some(id), "exercise without a name"))?;
        let raw_sets = exercise
            .get("sets")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(Some(id), "sets is not an array"))?;

        let mut sets = Vec::with_capacity(raw_sets.len());
        for (set_index, raw_set) in raw_sets.iter().enumerate() {
            let set = raw_set
                .as_object()
                .ok_or_else(|| malformed(Some(id), "set is not an object"))?;
            sets.push(ExerciseSet {
                id: child_id(set, set_index),
                reps: set.get("reps").map(lenient_reps).unwrap_or(0),
                weight: set.get("weight").and_then(lenient_number),
            });
        }

        exercises.push(Exercise {
            id: child_id(exercise, index),
            name: name.to_string(),
            sets,
            notes: exercise
                .get("notes")
                .and_then(Value::as_str)
                .map(String::from),
        });
    }

    Ok(Workout {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        date,
        exercises,
        category: doc
            .get("category")
            .and_then(Value::as_str)
            .map(String::from),
        completed: doc.get("completed").and_then(Value::as_bool),
    })
}

/// Parse a progress entry document. Dates are always required here.
pub fn parse_progress_entry(value: &Value) -> Result<ProgressEntry, MalformedRecord> {
    let malformed = |id: Option<&str>, reason: &str| MalformedRecord {
        kind: EntityKind::ProgressEntry,
        id: id.map(String::from),
        reason: reason.to_string(),
    };

    let doc = value
        .as_object()
        .ok_or_else(|| malformed(None, "document is not an object"))?;
    let id = required_id(doc).ok_or_else(|| malformed(None, "missing id"))?;
    let id = id.as_str();
    let user_id = doc
        .get("userId")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(Some(id), "missing userId"))?;
    let date = doc
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_document_date)
        .ok_or_else(|| malformed(Some(id), "unparsable date"))?;
    let weight = doc
        .get("weight")
        .and_then(lenient_number)
        .ok_or_else(|| malformed(Some(id), "weight is not a number"))?;
    let body_fat = doc
        .get("bodyFat")
        .and_then(lenient_number)
        .ok_or_else(|| malformed(Some(id), "bodyFat is not a number"))?;

    let measurements = match doc.get("measurements") {
        None | Some(Value::Null) => Measurements::default(),
        Some(Value::Object(m)) => {
            let field = |name: &str| m.get(name).and_then(lenient_number).unwrap_or(0.0);
            Measurements {
                chest: field("chest"),
                waist: field("waist"),
                arms: field("arms"),
            }
        }
        Some(_) => return Err(malformed(Some(id), "measurements is not an object")),
    };

    let photos = doc
        .get("photos")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ProgressEntry {
        id: id.to_string(),
        user_id: user_id.to_string(),
        date,
        weight,
        body_fat,
        measurements,
        photos,
    })
}

/// Parse a batch, logging and dropping malformed documents.
pub fn parse_batch<T, F>(documents: &[Value], parse: F) -> Vec<T>
where
    F: Fn(&Value) -> Result<T, MalformedRecord>,
{
    documents
        .iter()
        .filter_map(|doc| match parse(doc) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(kind = %e.kind, id = ?e.id, reason = %e.reason, "Skipping malformed record");
                None
            }
        })
        .collect()
}

fn required_id(doc: &Map<String, Value>) -> Option<String> {
    match doc.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Child IDs only need to be unique within the parent, so the position is a
/// usable stand-in when a client never assigned one.
fn child_id(doc: &Map<String, Value>, index: usize) -> String {
    required_id(doc).unwrap_or_else(|| index.to_string())
}

/// Numbers, or numeric strings left behind by form inputs.
fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn lenient_reps(value: &Value) -> u32 {
    match lenient_number(value) {
        Some(n) if n >= 1.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}
