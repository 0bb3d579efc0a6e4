// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Body progression entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// A body-progression snapshot. Several entries may share a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: String,
    /// Owner identifier
    pub user_id: String,
    pub date: DateTime<Utc>,
    /// Body weight
    pub weight: f64,
    /// Body-fat percentage
    pub body_fat: f64,
    pub measurements: Measurements,
    /// Photo references (URLs or placeholders)
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Tape measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub chest: f64,
    pub waist: f64,
    pub arms: f64,
}

impl Entity for ProgressEntry {
    const KIND: EntityKind = EntityKind::ProgressEntry;

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
        vec![
            "id",
            "userId",
            "date",
            "weight",
            "bodyFat",
            "measurements",
            "photos",
        ]
    }

    fn merged_onto(self, _prior: &Self) -> Self {
        self
    }

    fn from_document(value: &serde_json::Value) -> Result<Self, super::MalformedRecord> {
        super::record::parse_progress_entry(value)
    }
}
