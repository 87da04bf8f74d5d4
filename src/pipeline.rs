//! Pipeline orchestration
//!
//! This module provides the public API for Launch Curve.
//! It fans the normalizer out over independent entities and collects the
//! results by entity key.

use crate::config::{BatchConfig, FailurePolicy};
use crate::error::ComputeError;
use crate::normalizer::{validate_series, LaunchNormalizer};
use crate::schema::RowAdapter;
use crate::types::{BatchOutcome, EntityCurve, EntitySeries, ExcludedEntity, SkippedEntity};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

/// Normalize every entity in `entities` on the global worker pool.
///
/// # Example
/// ```ignore
/// let outcome = normalize_entities(&series, &BatchConfig::default())?;
/// for curve in &outcome.curves {
///     println!("{} launched {}", curve.entity, curve.launch_date);
/// }
/// ```
pub fn normalize_entities(
    entities: &[EntitySeries],
    config: &BatchConfig,
) -> Result<BatchOutcome, ComputeError> {
    config.validate()?;
    run_batch(entities, config)
}

/// Parse NDJSON rows, group them and normalize each entity.
pub fn ndjson_to_curves(ndjson: &str, config: &BatchConfig) -> Result<BatchOutcome, ComputeError> {
    let rows = RowAdapter::parse_ndjson(ndjson)?;
    let entities = RowAdapter::group_by_entity(&rows, config.date_range.as_ref())?;
    normalize_entities(&entities, config)
}

/// Reusable processor holding a validated config and its worker pool.
pub struct LaunchProcessor {
    config: BatchConfig,
    pool: Option<ThreadPool>,
}

impl Default for LaunchProcessor {
    fn default() -> Self {
        Self {
            config: BatchConfig::default(),
            pool: None,
        }
    }
}

impl LaunchProcessor {
    /// Create a processor; builds a dedicated pool when `workers` is set
    pub fn new(config: BatchConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        let pool = match config.workers {
            Some(n) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("lcurve-worker-{i}"))
                    .build()
                    .map_err(|e| ComputeError::ConfigError(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Normalize a batch of entity series
    pub fn process(&self, entities: &[EntitySeries]) -> Result<BatchOutcome, ComputeError> {
        match &self.pool {
            Some(pool) => pool.install(|| run_batch(entities, &self.config)),
            None => run_batch(entities, &self.config),
        }
    }
}

/// Per-entity result of the fan-out
enum EntityStep {
    Curve(EntityCurve),
    Excluded(i128),
    Failed(ComputeError),
}

fn run_batch(entities: &[EntitySeries], config: &BatchConfig) -> Result<BatchOutcome, ComputeError> {
    debug!(entities = entities.len(), "starting batch");

    let steps: Vec<EntityStep> = entities
        .par_iter()
        .map(|series| process_one(series, config))
        .collect();

    let mut outcome = BatchOutcome::default();
    for (series, step) in entities.iter().zip(steps) {
        match step {
            EntityStep::Curve(curve) => outcome.curves.push(curve),
            EntityStep::Excluded(total) => outcome.excluded.push(ExcludedEntity {
                entity: series.entity.clone(),
                total_count: total,
            }),
            EntityStep::Failed(err) => match config.on_failure {
                FailurePolicy::FailRun => {
                    return Err(ComputeError::EntityFailed {
                        entity: series.entity.clone(),
                        source: Box::new(err),
                    });
                }
                FailurePolicy::Skip => {
                    warn!(entity = %series.entity, error = %err, "skipping entity");
                    outcome.skipped.push(skipped(series, err)?);
                }
            },
        }
    }

    debug!(
        normalized = outcome.curves.len(),
        skipped = outcome.skipped.len(),
        excluded = outcome.excluded.len(),
        "batch complete"
    );
    Ok(outcome)
}

/// Validate, apply the volume cutoff, then normalize.
///
/// Validation comes first so a malformed series is reported as such rather
/// than as low volume.
fn process_one(series: &EntitySeries, config: &BatchConfig) -> EntityStep {
    if let Err(err) = validate_series(&series.observations) {
        return EntityStep::Failed(err);
    }

    let total = series.total_count();
    if total < i128::from(config.min_total_count) {
        debug!(entity = %series.entity, total = %total, "below total-volume cutoff");
        return EntityStep::Excluded(total);
    }

    match LaunchNormalizer::normalize_entity(series, &config.normalizer) {
        Ok(curve) => {
            info!(
                entity = %curve.entity,
                launch = %curve.launch_date,
                days = curve.observations.len(),
                "normalized entity"
            );
            EntityStep::Curve(curve)
        }
        Err(err) => EntityStep::Failed(err),
    }
}

fn skipped(series: &EntitySeries, err: ComputeError) -> Result<SkippedEntity, ComputeError> {
    match err.skip_kind() {
        Some(kind) => Ok(SkippedEntity {
            entity: series.entity.clone(),
            kind,
            message: err.to_string(),
        }),
        None => Err(err),
    }
}
