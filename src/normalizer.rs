//! Launch normalization
//!
//! This module turns one entity's raw daily series into a launch-anchored curve:
//! - Launch detection (first day strictly above the threshold)
//! - Truncation of the pre-launch tail
//! - Calendar gap fill with zero-traffic days
//! - Running cumulative total
//! - Horizon cut at `max_days_live`

use crate::config::NormalizerConfig;
use crate::error::ComputeError;
use crate::types::{EntityCurve, EntitySeries, NormalizedObservation, RawObservation};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Normalizer for converting raw per-entity series to launch-anchored curves
pub struct LaunchNormalizer;

impl LaunchNormalizer {
    /// Normalize a raw series with the given config
    pub fn normalize(
        series: &[RawObservation],
        config: &NormalizerConfig,
    ) -> Result<Vec<NormalizedObservation>, ComputeError> {
        normalize(series, config.min_first_day_count, config.max_days_live)
    }

    /// Normalize an entity's series into a curve tagged with its launch date
    pub fn normalize_entity(
        series: &EntitySeries,
        config: &NormalizerConfig,
    ) -> Result<EntityCurve, ComputeError> {
        let (launch_date, observations) = normalize_from_launch(
            &series.observations,
            config.min_first_day_count,
            config.max_days_live,
        )?;
        Ok(EntityCurve {
            entity: series.entity.clone(),
            launch_date,
            observations,
        })
    }
}

/// Check ordering, uniqueness and sign of a raw series.
pub fn validate_series(series: &[RawObservation]) -> Result<(), ComputeError> {
    for (index, obs) in series.iter().enumerate() {
        if obs.count < 0 {
            return Err(ComputeError::InvalidInputSeries {
                index,
                reason: format!("negative count {} on {}", obs.count, obs.date),
            });
        }
        if index == 0 {
            continue;
        }
        let prev = series[index - 1].date;
        if obs.date == prev {
            return Err(ComputeError::InvalidInputSeries {
                index,
                reason: format!("duplicate date {}", obs.date),
            });
        }
        if obs.date < prev {
            return Err(ComputeError::InvalidInputSeries {
                index,
                reason: format!("date {} follows later date {}", obs.date, prev),
            });
        }
    }
    Ok(())
}

/// Index of the first observation whose count strictly exceeds the threshold
pub fn detect_launch(series: &[RawObservation], min_first_day_count: u64) -> Option<usize> {
    series
        .iter()
        .position(|obs| obs.count > 0 && obs.count as u64 > min_first_day_count)
}

/// Normalize one entity's raw series.
///
/// The series must be ascending by date with unique dates and non-negative
/// counts. The result has one row per calendar day from the launch date to the
/// last raw date, cut at `max_days_live`.
pub fn normalize(
    series: &[RawObservation],
    min_first_day_count: u64,
    max_days_live: u32,
) -> Result<Vec<NormalizedObservation>, ComputeError> {
    normalize_from_launch(series, min_first_day_count, max_days_live).map(|(_, curve)| curve)
}

fn normalize_from_launch(
    series: &[RawObservation],
    min_first_day_count: u64,
    max_days_live: u32,
) -> Result<(NaiveDate, Vec<NormalizedObservation>), ComputeError> {
    validate_series(series)?;

    let launch_idx = detect_launch(series, min_first_day_count).ok_or(
        ComputeError::NoQualifyingLaunchDay {
            threshold: min_first_day_count,
            observations: series.len(),
        },
    )?;

    let live = &series[launch_idx..];
    let launch_date = live[0].date;
    let last_date = live[live.len() - 1].date;

    let by_date: HashMap<_, _> = live.iter().map(|obs| (obs.date, obs.count as u64)).collect();

    // Days strictly past the horizon are never enumerated.
    let span = (last_date - launch_date).num_days();
    let days = span.min(i64::from(max_days_live)) as usize + 1;

    let mut curve = Vec::with_capacity(days);
    let mut cumulative = 0u64;
    for (offset, date) in launch_date.iter_days().take(days).enumerate() {
        let days_live = offset as u32;
        let count = by_date.get(&date).copied().unwrap_or(0);
        cumulative = cumulative
            .checked_add(count)
            .ok_or(ComputeError::CountOverflow { days_live })?;
        curve.push(NormalizedObservation {
            days_live,
            date,
            count,
            cumulative_count: cumulative,
        });
    }

    Ok((launch_date, curve))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn obs(n: u32, count: i64) -> RawObservation {
        RawObservation::new(day(n), count)
    }

    fn triples(curve: &[NormalizedObservation]) -> Vec<(u32, u64, u64)> {
        curve
            .iter()
            .map(|o| (o.days_live, o.count, o.cumulative_count))
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let series = vec![obs(1, 1), obs(2, 3), obs(4, 5)];
        let curve = normalize(&series, 2, 10).unwrap();

        assert_eq!(triples(&curve), vec![(0, 3, 3), (1, 0, 3), (2, 5, 8)]);
        assert_eq!(curve[0].date, day(2));
        assert_eq!(curve[1].date, day(3));
    }

    #[test]
    fn test_threshold_is_strict() {
        let series = vec![obs(1, 2), obs(2, 3)];
        let curve = normalize(&series, 2, 10).unwrap();
        assert_eq!(curve[0].date, day(2));
    }

    #[test]
    fn test_zero_threshold_skips_zero_rows() {
        let series = vec![obs(1, 0), obs(3, 1)];
        let curve = normalize(&series, 0, 10).unwrap();
        assert_eq!(curve[0].date, day(3));
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn test_horizon_truncation() {
        let series: Vec<_> = (1..=20).map(|n| obs(n, 10)).collect();
        let curve = normalize(&series, 5, 6).unwrap();

        assert_eq!(curve.len(), 7);
        assert_eq!(curve.last().unwrap().days_live, 6);
        assert_eq!(curve.last().unwrap().cumulative_count, 70);
    }

    #[test]
    fn test_zero_horizon_keeps_launch_day() {
        let series = vec![obs(1, 50), obs(2, 60)];
        let curve = normalize(&series, 5, 0).unwrap();
        assert_eq!(triples(&curve), vec![(0, 50, 50)]);
    }

    #[test]
    fn test_no_rows_fabricated_past_last_date() {
        let series = vec![obs(5, 100), obs(9, 1)];
        let curve = normalize(&series, 10, 365).unwrap();

        assert_eq!(curve.len(), 5);
        assert_eq!(curve.last().unwrap().date, day(9));
    }

    #[test]
    fn test_gap_fill_and_cumulative() {
        let series = vec![obs(1, 20), obs(4, 7), obs(5, 1), obs(9, 3)];
        let curve = normalize(&series, 10, 30).unwrap();

        let offsets: Vec<u32> = curve.iter().map(|o| o.days_live).collect();
        assert_eq!(offsets, (0..=8).collect::<Vec<_>>());

        for missing in [1usize, 2, 5, 6, 7] {
            assert_eq!(curve[missing].count, 0);
        }

        let mut running = 0;
        for o in &curve {
            running += o.count;
            assert_eq!(o.cumulative_count, running);
        }
        assert_eq!(running, 31);
    }

    #[test]
    fn test_launch_crosses_month_boundary() {
        let series = vec![
            RawObservation::new(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(), 40),
            RawObservation::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 4),
        ];
        let curve = normalize(&series, 10, 30).unwrap();

        // 2024 is a leap year
        assert_eq!(curve.len(), 3);
        assert_eq!(
            curve[1].date,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(curve[1].count, 0);
    }

    #[test]
    fn test_no_qualifying_launch_day() {
        let series = vec![obs(1, 1), obs(2, 2)];
        let err = normalize(&series, 2, 10).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::NoQualifyingLaunchDay {
                threshold: 2,
                observations: 2
            }
        ));
    }

    #[test]
    fn test_empty_series() {
        let err = normalize(&[], 0, 10).unwrap_err();
        assert!(matches!(err, ComputeError::NoQualifyingLaunchDay { .. }));
    }

    #[test]
    fn test_invalid_series() {
        let unsorted = vec![obs(2, 5), obs(1, 5)];
        let duplicate = vec![obs(1, 5), obs(1, 6)];
        let negative = vec![obs(1, 5), obs(2, -1)];

        for series in [unsorted, duplicate, negative] {
            let err = normalize(&series, 0, 10).unwrap_err();
            assert!(matches!(
                err,
                ComputeError::InvalidInputSeries { index: 1, .. }
            ));
        }
    }

    #[test]
    fn test_invalid_rows_before_launch_still_rejected() {
        let series = vec![obs(1, -3), obs(2, 50)];
        assert!(normalize(&series, 10, 10).is_err());
    }

    #[test]
    fn test_cumulative_overflow_is_an_error() {
        let series = vec![obs(1, i64::MAX), obs(2, i64::MAX), obs(3, i64::MAX)];
        let err = normalize(&series, 0, 10).unwrap_err();
        assert!(matches!(err, ComputeError::CountOverflow { days_live: 2 }));
    }

    #[test]
    fn test_large_counts_within_range() {
        let series = vec![obs(1, i64::MAX), obs(2, i64::MAX)];
        let curve = normalize(&series, 0, 10).unwrap();
        assert_eq!(curve[1].cumulative_count, 2 * i64::MAX as u64);
    }

    #[test]
    fn test_normalize_entity_reports_launch_date() {
        let series = EntitySeries::new("/a", vec![obs(1, 1), obs(4, 12), obs(6, 3)]);
        let curve = LaunchNormalizer::normalize_entity(&series, &NormalizerConfig::default())
            .unwrap();

        assert_eq!(curve.entity, "/a");
        assert_eq!(curve.launch_date, day(4));
        assert_eq!(curve.observations[0].date, curve.launch_date);
        assert_eq!(curve.final_cumulative(), 15);
    }

    #[test]
    fn test_idempotent() {
        let series = vec![obs(1, 1), obs(3, 30), obs(6, 2), obs(7, 9)];
        let config = NormalizerConfig {
            min_first_day_count: 5,
            max_days_live: 3,
        };

        let first = LaunchNormalizer::normalize(&series, &config).unwrap();
        let second = LaunchNormalizer::normalize(&series, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(triples(&first), vec![(0, 30, 30), (1, 0, 30), (2, 0, 30), (3, 2, 32)]);
    }
}
