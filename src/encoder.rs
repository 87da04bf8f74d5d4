//! Report encoding
//!
//! This module encodes batch outcomes for the presentation layer, either as a
//! stamped JSON report or as flat per-day records.

use crate::config::BatchConfig;
use crate::error::ComputeError;
use crate::types::{BatchOutcome, EntityCurve, ExcludedEntity, SkippedEntity};
use crate::{PRODUCER_NAME, VERSION};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// One output row: an entity on one day since launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveRecord {
    pub entity: String,
    pub days_live: u32,
    pub date: NaiveDate,
    pub count: u64,
    pub cumulative_count: u64,
}

impl CurveRecord {
    /// Flatten curves into records, entity by entity
    pub fn flatten(curves: &[EntityCurve]) -> Vec<CurveRecord> {
        curves
            .iter()
            .flat_map(|curve| {
                curve.observations.iter().map(move |o| CurveRecord {
                    entity: curve.entity.clone(),
                    days_live: o.days_live,
                    date: o.date,
                    count: o.count,
                    cumulative_count: o.cumulative_count,
                })
            })
            .collect()
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// Complete batch report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveReport {
    pub report_version: String,
    pub producer: Producer,
    pub generated_at_utc: String,
    pub config: BatchConfig,
    pub curves: Vec<EntityCurve>,
    pub skipped: Vec<SkippedEntity>,
    pub excluded: Vec<ExcludedEntity>,
}

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `CurveRecord` per line
    Ndjson,
    /// Full report, compact
    Json,
    /// Full report, indented
    JsonPretty,
}

/// Encoder stamping reports with a per-run identifier
pub struct ReportEncoder {
    run_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique run ID
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific run ID
    pub fn with_run_id(run_id: String) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Build the report for an outcome
    pub fn report(&self, outcome: &BatchOutcome, config: &BatchConfig) -> CurveReport {
        CurveReport {
            report_version: REPORT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            generated_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            curves: outcome.curves.clone(),
            skipped: outcome.skipped.clone(),
            excluded: outcome.excluded.clone(),
        }
    }

    /// Encode an outcome in the requested format
    pub fn encode(
        &self,
        outcome: &BatchOutcome,
        config: &BatchConfig,
        format: OutputFormat,
    ) -> Result<String, ComputeError> {
        match format {
            OutputFormat::Ndjson => {
                let mut out = String::new();
                for record in CurveRecord::flatten(&outcome.curves) {
                    out.push_str(&serde_json::to_string(&record)?);
                    out.push('\n');
                }
                Ok(out)
            }
            OutputFormat::Json => serde_json::to_string(&self.report(outcome, config))
                .map_err(|e| ComputeError::EncodingError(e.to_string())),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(&self.report(outcome, config))
                    .map_err(|e| ComputeError::EncodingError(e.to_string()))
            }
        }
    }
}
