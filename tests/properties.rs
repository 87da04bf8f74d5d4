//! Property-based invariant tests for the launch normalizer.
//!
//! For any ascending series with unique dates and non-negative counts:
//! 1. days_live is unbroken from 0, bounded by the data and the horizon.
//! 2. cumulative_count is the running sum of count.
//! 3. days_live = 0 is the first day strictly above the threshold.
//! 4. Calendar days missing from the raw series carry count = 0.
//! 5. Normalization is idempotent.
//! 6. A batch yields the same curve per entity as a single call.

use chrono::{Duration, NaiveDate};
use launch_curve::{
    normalize, normalize_entities, BatchConfig, ComputeError, EntitySeries, FailurePolicy,
    NormalizerConfig, RawObservation, RowAdapter,
};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

/// Ascending, unique-date series built from day gaps of 1..=4
fn series_strategy(max_len: usize) -> impl Strategy<Value = Vec<RawObservation>> {
    proptest::collection::vec((1i64..=4, 0i64..=40), 0..=max_len).prop_map(|steps| {
        let mut date = NaiveDate::from_ymd_opt(2023, 12, 20).unwrap();
        steps
            .into_iter()
            .map(|(gap, count)| {
                date += Duration::days(gap);
                RawObservation::new(date, count)
            })
            .collect()
    })
}

fn threshold_strategy() -> impl Strategy<Value = u64> {
    0u64..=30
}

fn horizon_strategy() -> impl Strategy<Value = u32> {
    0u32..=60
}

// ─── 1–5. Per-series invariants ───────────────────────────────────────

proptest! {
    #[test]
    fn curve_invariants_hold(
        series in series_strategy(60),
        threshold in threshold_strategy(),
        horizon in horizon_strategy(),
    ) {
        let Some(launch) = series.iter().find(|o| o.count as u64 > threshold) else {
            let err = normalize(&series, threshold, horizon).unwrap_err();
            prop_assert!(
                matches!(err, ComputeError::NoQualifyingLaunchDay { .. }),
                "Expected missing launch, got {}", err
            );
            return Ok(());
        };
        let curve = normalize(&series, threshold, horizon).unwrap();

        prop_assert_eq!(curve[0].date, launch.date);
        prop_assert_eq!(curve[0].count, launch.count as u64);

        let last = series.last().unwrap().date;
        let span = (last - launch.date).num_days() as u32;
        prop_assert_eq!(curve.len() as u32, span.min(horizon) + 1);

        let mut running = 0;
        for (i, row) in curve.iter().enumerate() {
            prop_assert_eq!(row.days_live, i as u32);
            prop_assert_eq!(row.date, launch.date + Duration::days(i as i64));

            let raw = series.iter().find(|o| o.date == row.date);
            prop_assert_eq!(row.count, raw.map(|o| o.count as u64).unwrap_or(0));

            running += row.count;
            prop_assert_eq!(row.cumulative_count, running);
        }

        prop_assert_eq!(normalize(&series, threshold, horizon).unwrap(), curve);
    }
}

// ─── 6. Batch matches single calls ────────────────────────────────────

proptest! {
    #[test]
    fn batch_matches_individual_calls(
        batch in proptest::collection::vec(series_strategy(30), 1..=20),
        threshold in threshold_strategy(),
        horizon in horizon_strategy(),
    ) {
        let entities: Vec<EntitySeries> = batch
            .into_iter()
            .enumerate()
            .map(|(i, observations)| EntitySeries::new(format!("/page/{i}"), observations))
            .collect();

        let config = BatchConfig {
            normalizer: NormalizerConfig {
                min_first_day_count: threshold,
                max_days_live: horizon,
            },
            ..Default::default()
        };
        let outcome = normalize_entities(&entities, &config).unwrap();

        prop_assert_eq!(outcome.entity_count(), entities.len());
        for series in &entities {
            match normalize(&series.observations, threshold, horizon) {
                Ok(expected) => {
                    let curve = outcome.curve(&series.entity).unwrap();
                    prop_assert_eq!(&curve.observations, &expected);
                }
                Err(_) => prop_assert!(
                    outcome.skipped.iter().any(|s| s.entity == series.entity),
                    "{} neither normalized nor skipped", series.entity
                ),
            }
        }
    }
}

#[test]
fn test_unsorted_report_fails_run_only_under_fail_policy() {
    let ndjson = r#"{"entity": "/a", "date": "2024-01-02", "count": 40}
{"entity": "/a", "date": "2024-01-01", "count": 40}
{"entity": "/b", "date": "2024-01-01", "count": 40}"#;

    let rows = RowAdapter::parse_ndjson(ndjson).unwrap();
    let entities = RowAdapter::group_by_entity(&rows, None).unwrap();

    let skip = normalize_entities(&entities, &BatchConfig::default()).unwrap();
    assert_eq!(skip.curves.len(), 1);
    assert_eq!(skip.skipped.len(), 1);

    let fail = BatchConfig {
        on_failure: FailurePolicy::FailRun,
        ..Default::default()
    };
    assert!(normalize_entities(&entities, &fail).is_err());

    let mut sorted = entities.clone();
    sorted.iter_mut().for_each(EntitySeries::sort_by_date);
    let outcome = normalize_entities(&sorted, &fail).unwrap();
    assert_eq!(outcome.curve("/a").unwrap().final_cumulative(), 80);
}
