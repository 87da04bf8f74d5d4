//! Adapter for converting traffic rows to per-entity series
//!
//! Rows arrive as one flat multi-entity report. They are grouped by entity
//! here; ordering within each entity is left as delivered so the normalizer
//! can reject malformed series instead of having them silently repaired.

use crate::config::DateRange;
use crate::error::ComputeError;
use crate::schema::row::{TrafficRow, ValidationError};
use crate::types::{EntitySeries, RawObservation};
use std::collections::HashMap;

/// Adapter for converting traffic rows to entity series
pub struct RowAdapter;

impl RowAdapter {
    /// Parse a JSON string containing an array of rows
    pub fn parse_array(json: &str) -> Result<Vec<TrafficRow>, ComputeError> {
        let rows: Vec<TrafficRow> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON) containing rows
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TrafficRow>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TrafficRow>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Group rows into per-entity series.
    ///
    /// Entities keep first-appearance order. Rows outside `date_range` are
    /// dropped; an entity left with no rows is dropped with them.
    pub fn group_by_entity(
        rows: &[TrafficRow],
        date_range: Option<&DateRange>,
    ) -> Result<Vec<EntitySeries>, ComputeError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut series: Vec<EntitySeries> = Vec::new();

        for (row_num, row) in rows.iter().enumerate() {
            if let Err(e) = row.validate() {
                return Err(ComputeError::ParseError(format!(
                    "Invalid row {}: {}",
                    row_num + 1,
                    e
                )));
            }

            let date = row.parsed_date()?;
            if let Some(range) = date_range {
                if !range.contains(date) {
                    continue;
                }
            }

            let slot = *index.entry(row.entity.as_str()).or_insert_with(|| {
                series.push(EntitySeries::new(row.entity.clone(), Vec::new()));
                series.len() - 1
            });
            series[slot]
                .observations
                .push(RawObservation::new(date, row.count));
        }

        Ok(series)
    }

    /// Validate a batch of rows
    pub fn validate_rows(rows: &[TrafficRow]) -> Vec<RowValidationResult> {
        rows.iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                row.validate().err().map(|error| RowValidationResult {
                    index: idx,
                    entity: row.entity.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// Row that failed validation
#[derive(Debug)]
pub struct RowValidationResult {
    pub index: usize,
    pub entity: String,
    pub error: ValidationError,
}
