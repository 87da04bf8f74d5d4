//! Traffic row definition

use crate::error::ComputeError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "traffic.daily_row.v1";

/// Date formats accepted on input: ISO and the report API's compact form
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// One row of a daily traffic report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRow {
    /// Entity key (page path or other dimension value)
    #[serde(alias = "page", alias = "page_path")]
    pub entity: String,
    /// Calendar day, `YYYY-MM-DD` or `YYYYMMDD`
    pub date: String,
    /// Unique visits recorded for the entity that day
    #[serde(alias = "unique_pageviews", alias = "visits")]
    pub count: i64,
}

impl TrafficRow {
    pub fn new(entity: impl Into<String>, date: impl Into<String>, count: i64) -> Self {
        Self {
            entity: entity.into(),
            date: date.into(),
            count,
        }
    }

    /// Parsed calendar day of the row
    pub fn parsed_date(&self) -> Result<NaiveDate, ComputeError> {
        parse_date(&self.date)
    }

    /// Validate the row shape.
    ///
    /// Ordering and sign are checked per entity by the normalizer.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entity.trim().is_empty() {
            return Err(ValidationError::EmptyEntity);
        }
        if parse_date(&self.date).is_err() {
            return Err(ValidationError::InvalidDate(self.date.clone()));
        }
        Ok(())
    }
}

/// Parse a report date in any accepted format
pub fn parse_date(raw: &str) -> Result<NaiveDate, ComputeError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ComputeError::DateParseError(format!("unrecognized date '{raw}'")))
}

/// Validation errors for traffic rows
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Entity name is empty")]
    EmptyEntity,

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}
