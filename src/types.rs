//! Core types for the Launch Curve pipeline
//!
//! This module defines the data structures that flow through each stage:
//! raw per-entity observations, normalized launch-anchored observations, and
//! the per-batch outcome handed to presentation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of recorded traffic for a single entity.
///
/// Days with no traffic are absent from the raw series rather than present
/// with a zero count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Calendar day of the observation
    pub date: NaiveDate,
    /// Unique visits recorded that day (signed so bad sources can be detected)
    pub count: i64,
}

impl RawObservation {
    pub fn new(date: NaiveDate, count: i64) -> Self {
        Self { date, count }
    }
}

/// One calendar day of an entity's launch-anchored, gap-filled series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedObservation {
    /// Offset in days from the detected launch date
    pub days_live: u32,
    /// Calendar day this offset denotes
    pub date: NaiveDate,
    /// Traffic that day (zero when the raw series had no row)
    pub count: u64,
    /// Running total of `count` from launch through this day
    pub cumulative_count: u64,
}

/// Raw daily series for a single entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySeries {
    /// Entity key (page path or other dimension value)
    pub entity: String,
    /// Observations, expected ascending by date
    pub observations: Vec<RawObservation>,
}

impl EntitySeries {
    pub fn new(entity: impl Into<String>, observations: Vec<RawObservation>) -> Self {
        Self {
            entity: entity.into(),
            observations,
        }
    }

    /// Sum of all raw counts, widened so no series of `i64` counts can overflow
    pub fn total_count(&self) -> i128 {
        self.observations.iter().map(|o| i128::from(o.count)).sum()
    }

    /// Sort observations ascending by date (stable, duplicates are kept)
    pub fn sort_by_date(&mut self) {
        self.observations.sort_by_key(|o| o.date);
    }
}

/// Normalized curve for a single entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCurve {
    pub entity: String,
    /// Detected launch date (days_live = 0)
    pub launch_date: NaiveDate,
    pub observations: Vec<NormalizedObservation>,
}

impl EntityCurve {
    /// Cumulative count on the last day of the curve
    pub fn final_cumulative(&self) -> u64 {
        self.observations
            .last()
            .map(|o| o.cumulative_count)
            .unwrap_or(0)
    }
}

/// Kind of entity-scoped failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    InvalidInputSeries,
    NoQualifyingLaunchDay,
    CountOverflow,
}

/// Entity dropped from a batch because its normalization failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub entity: String,
    pub kind: SkipKind,
    pub message: String,
}

/// Entity left out of a batch for falling under the total-volume cutoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedEntity {
    pub entity: String,
    pub total_count: i128,
}

/// Result of normalizing a batch of entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Successfully normalized curves, in input order
    pub curves: Vec<EntityCurve>,
    pub skipped: Vec<SkippedEntity>,
    pub excluded: Vec<ExcludedEntity>,
}

impl BatchOutcome {
    /// Look up the curve for an entity
    pub fn curve(&self, entity: &str) -> Option<&EntityCurve> {
        self.curves.iter().find(|c| c.entity == entity)
    }

    /// Total number of entities seen by the batch
    pub fn entity_count(&self) -> usize {
        self.curves.len() + self.skipped.len() + self.excluded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_count_of_max_counts() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = EntitySeries::new(
            "/a",
            date.iter_days()
                .take(3)
                .map(|d| RawObservation::new(d, i64::MAX))
                .collect(),
        );
        assert_eq!(series.total_count(), 3 * i128::from(i64::MAX));
    }
}
