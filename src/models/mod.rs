// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod metrics;
pub mod progress;
pub mod record;
pub mod workout;

pub use metrics::{BodyMetricPoint, DerivedMetricPoint, TimeRange, Timestamped};
pub use progress::{Measurements, ProgressEntry};
pub use record::MalformedRecord;
pub use workout::{Exercise, ExerciseSet, Workout};

use serde::Serialize;
use std::fmt;

/// The top-level document types kept in sync with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Workout,
    ProgressEntry,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Workout => "workout",
            EntityKind::ProgressEntry => "progress_entry",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document owned by a single user and addressed by a globally unique id.
pub trait Entity: Clone + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn owner_id(&self) -> &str;
    fn set_owner_id(&mut self, owner_id: String);

    /// Top-level document fields written by a merge edit of this value.
    fn merge_fields(&self) -> Vec<&'static str>;

    /// Apply this edit on top of `prior` with merge semantics: fields the
    /// edit leaves absent keep their prior value.
    fn merged_onto(self, prior: &Self) -> Self;

    /// Validate a raw stored document.
    fn from_document(value: &serde_json::Value) -> Result<Self, MalformedRecord>;
}
