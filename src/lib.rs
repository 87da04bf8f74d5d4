//! Launch Curve - launch-anchored daily traffic curves
//!
//! Launch Curve turns a multi-entity daily traffic report into one curve per
//! entity through a deterministic pipeline: row adaptation → per-entity
//! grouping → launch normalization (fan-out) → summaries → encoding.
//!
//! Each entity's curve starts on its detected launch date (the first day above
//! a traffic threshold), has one row per calendar day with zero-filled gaps,
//! and carries a running cumulative total up to a fixed horizon.

pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod summary;
pub mod types;

pub use config::{BatchConfig, DateRange, FailurePolicy, NormalizerConfig};
pub use error::ComputeError;
pub use normalizer::{normalize, LaunchNormalizer};
pub use pipeline::{ndjson_to_curves, normalize_entities, LaunchProcessor};

// Schema exports
pub use schema::{RowAdapter, TrafficRow, SCHEMA_VERSION};

pub use summary::{CohortCurve, EntitySummary};
pub use types::{BatchOutcome, EntityCurve, EntitySeries, NormalizedObservation, RawObservation};

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "launch-curve";
