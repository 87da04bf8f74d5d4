//! Error types for Launch Curve

use crate::types::SkipKind;
use thiserror::Error;

/// Errors that can occur during normalization
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input rows: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid input series at row {index}: {reason}")]
    InvalidInputSeries { index: usize, reason: String },

    #[error("No day exceeds the first-day threshold of {threshold} ({observations} observations)")]
    NoQualifyingLaunchDay { threshold: u64, observations: usize },

    #[error("Cumulative count overflows at day {days_live} after launch")]
    CountOverflow { days_live: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Entity {entity} failed: {source}")]
    EntityFailed {
        entity: String,
        #[source]
        source: Box<ComputeError>,
    },

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    /// Kind of entity-scoped failure, `None` for errors that concern the whole run
    pub fn skip_kind(&self) -> Option<SkipKind> {
        match self {
            ComputeError::InvalidInputSeries { .. } => Some(SkipKind::InvalidInputSeries),
            ComputeError::NoQualifyingLaunchDay { .. } => Some(SkipKind::NoQualifyingLaunchDay),
            ComputeError::CountOverflow { .. } => Some(SkipKind::CountOverflow),
            _ => None,
        }
    }
}
