// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// Stored workout document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    /// Document ID (unique within the owner's collection)
    pub id: String,
    /// Owner identifier
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Workout date; only the calendar day is meaningful
    pub date: DateTime<Utc>,
    /// Exercises in the order they were performed
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// An exercise within a workout. IDs are only unique within the parent workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    /// Free text; matched case-insensitively by the metric engine
    pub name: String,
    pub sets: Vec<ExerciseSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A single set. A missing weight means bodyweight or unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: String,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Entity for Workout {
    const KIND: EntityKind = EntityKind::Workout;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }

    fn set_owner_id(&mut self, owner_id: String) {
        self.user_id = owner_id;
    }

    fn merge_fields(&self) -> Vec<&'static str> {
        let mut fields = vec!["id", "userId", "name", "date", "exercises"];
        if self.category.is_some() {
            fields.push("category");
        }
        if self.completed.is_some() {
            fields.push("completed");
        }
        fields
    }

    fn merged_onto(mut self, prior: &Self) -> Self {
        if self.category.is_none() {
            self.category = prior.category.clone();
        }
        if self.completed.is_none() {
            self.completed = prior.completed;
        }
        self
    }

    fn from_document(value: &serde_json::Value) -> Result<Self, super::MalformedRecord> {
        super::record::parse_workout(value, super::record::DateFallback::Reject)
    }
}

impl Workout {
    /// First exercise whose name matches `name`, ignoring case.
    pub fn find_exercise(&self, name: &str) -> Option<&Exercise> {
        let wanted = name.to_lowercase();
        self.exercises
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
    }
}
