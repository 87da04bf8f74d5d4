//! Configuration
//!
//! Thresholds and the date window are carried in explicit values passed to the
//! processor, never held in global state. A `BatchConfig` round-trips through
//! JSON so it can be stored next to the data it was applied to.

use crate::error::ComputeError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default first-day threshold: the launch day must record more than this
pub const DEFAULT_MIN_FIRST_DAY_COUNT: u64 = 10;

/// Default output horizon in days after launch
pub const DEFAULT_MAX_DAYS_LIVE: u32 = 30;

/// Parameters of the per-entity normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// A day must record strictly more than this to count as launch
    pub min_first_day_count: u64,
    /// Rows with days_live above this are dropped
    pub max_days_live: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_first_day_count: DEFAULT_MIN_FIRST_DAY_COUNT,
            max_days_live: DEFAULT_MAX_DAYS_LIVE,
        }
    }
}

/// Inclusive calendar range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ComputeError> {
        if start > end {
            return Err(ComputeError::ConfigError(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What to do when a single entity cannot be normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the entity as skipped, log a warning, keep going
    #[default]
    Skip,
    /// Abort the whole run on the first failing entity
    FailRun,
}

/// Configuration for a batch of entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub normalizer: NormalizerConfig,
    /// Entities whose total raw count is below this are not processed
    pub min_total_count: u64,
    /// Rows outside this window are dropped before grouping
    pub date_range: Option<DateRange>,
    pub on_failure: FailurePolicy,
    /// Worker threads for the fan-out; `None` uses the global pool
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            min_total_count: 0,
            date_range: None,
            on_failure: FailurePolicy::default(),
            workers: None,
        }
    }
}

impl BatchConfig {
    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ComputeError> {
        if let Some(range) = &self.date_range {
            DateRange::new(range.start, range.end)?;
        }
        if self.workers == Some(0) {
            return Err(ComputeError::ConfigError(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
