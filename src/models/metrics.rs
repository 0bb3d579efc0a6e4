// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Derived chart points. Computed on demand, never persisted.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-workout performance for one exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DerivedMetricPoint {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    pub display_date: String,
    pub max_weight: f64,
    pub estimated_one_rep_max: f64,
    pub max_reps: u32,
    pub max_volume: f64,
}

/// One body-progression entry as a chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BodyMetricPoint {
    pub entry_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    pub display_date: String,
    pub weight: f64,
    pub body_fat: f64,
    pub chest: f64,
    pub waist: f64,
    pub arms: f64,
}

/// Anything that sits on a chart time axis.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for DerivedMetricPoint {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for BodyMetricPoint {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Chart time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TimeRange {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Start of the window, exclusive. `None` means unbounded.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            TimeRange::OneMonth => 1,
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::OneYear => 12,
            TimeRange::All => return None,
        };
        // Out-of-range subtraction only happens near the minimum representable
        // date, where everything is inside the window anyway.
        Some(
            now.checked_sub_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(TimeRange::OneMonth),
            "3m" => Ok(TimeRange::ThreeMonths),
            "6m" => Ok(TimeRange::SixMonths),
            "1y" => Ok(TimeRange::OneYear),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range '{}'", other)),
        }
    }
}
