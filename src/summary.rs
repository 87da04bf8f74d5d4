//! Curve summaries
//!
//! Per-entity statistics over a normalized curve, and a cohort curve that
//! averages all entities at each day since launch.

use crate::types::EntityCurve;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline numbers for one entity's curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity: String,
    pub launch_date: NaiveDate,
    /// Days covered by the curve (launch day included)
    pub days_covered: u32,
    /// Total traffic within the horizon
    pub total_count: u64,
    pub launch_day_count: u64,
    pub peak_count: u64,
    /// First day the peak was reached
    pub peak_days_live: u32,
    /// Launch-day traffic as a fraction of total (0-1)
    pub launch_day_share: f64,
}

impl EntitySummary {
    pub fn from_curve(curve: &EntityCurve) -> Self {
        let total_count = curve.final_cumulative();
        let launch_day_count = curve.observations.first().map(|o| o.count).unwrap_or(0);

        let (peak_days_live, peak_count) = curve
            .observations
            .iter()
            .fold((0u32, 0u64), |(best_day, best), o| {
                if o.count > best {
                    (o.days_live, o.count)
                } else {
                    (best_day, best)
                }
            });

        let launch_day_share = if total_count > 0 {
            launch_day_count as f64 / total_count as f64
        } else {
            0.0
        };

        Self {
            entity: curve.entity.clone(),
            launch_date: curve.launch_date,
            days_covered: curve.observations.len() as u32,
            total_count,
            launch_day_count,
            peak_count,
            peak_days_live,
            launch_day_share,
        }
    }
}

/// Cross-entity aggregate at one offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortPoint {
    pub days_live: u32,
    /// Entities whose curve reaches this offset
    pub entities: usize,
    pub mean_count: f64,
    pub mean_cumulative: f64,
    pub median_cumulative: f64,
}

/// Average launch curve across entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortCurve {
    pub points: Vec<CohortPoint>,
}

impl CohortCurve {
    /// Aggregate curves by days_live.
    ///
    /// Entities only contribute to offsets their curve actually reaches.
    pub fn from_curves(curves: &[EntityCurve]) -> Self {
        let max_len = curves
            .iter()
            .map(|c| c.observations.len())
            .max()
            .unwrap_or(0);

        let points = (0..max_len)
            .map(|offset| {
                let rows: Vec<_> = curves
                    .iter()
                    .filter_map(|c| c.observations.get(offset))
                    .collect();
                let n = rows.len() as f64;
                let counts: f64 = rows.iter().map(|o| o.count as f64).sum();
                let mut cumulative: Vec<f64> =
                    rows.iter().map(|o| o.cumulative_count as f64).collect();

                CohortPoint {
                    days_live: offset as u32,
                    entities: rows.len(),
                    mean_count: counts / n,
                    mean_cumulative: cumulative.iter().sum::<f64>() / n,
                    median_cumulative: median(&mut cumulative),
                }
            })
            .collect();

        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedObservation;

    fn curve(entity: &str, counts: &[u64]) -> EntityCurve {
        let launch_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut cumulative = 0;
        let observations = launch_date
            .iter_days()
            .zip(counts)
            .enumerate()
            .map(|(i, (date, &count))| {
                cumulative += count;
                NormalizedObservation {
                    days_live: i as u32,
                    date,
                    count,
                    cumulative_count: cumulative,
                }
            })
            .collect();
        EntityCurve {
            entity: entity.to_string(),
            launch_date,
            observations,
        }
    }

    #[test]
    fn test_entity_summary() {
        let summary = EntitySummary::from_curve(&curve("/a", &[20, 0, 50, 50, 5]));

        assert_eq!(summary.days_covered, 5);
        assert_eq!(summary.total_count, 125);
        assert_eq!(summary.launch_day_count, 20);
        assert_eq!(summary.peak_count, 50);
        assert_eq!(summary.peak_days_live, 2);
        assert!((summary.launch_day_share - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_cohort_curve_uneven_lengths() {
        let cohort = CohortCurve::from_curves(&[
            curve("/a", &[10, 0, 6]),
            curve("/b", &[20]),
            curve("/c", &[30, 3]),
        ]);

        assert_eq!(cohort.points.len(), 3);

        let day0 = &cohort.points[0];
        assert_eq!(day0.entities, 3);
        assert!((day0.mean_count - 20.0).abs() < 1e-9);
        assert!((day0.median_cumulative - 20.0).abs() < 1e-9);

        let day1 = &cohort.points[1];
        assert_eq!(day1.entities, 2);
        assert!((day1.mean_cumulative - 21.5).abs() < 1e-9);
        assert!((day1.median_cumulative - 21.5).abs() < 1e-9);

        assert_eq!(cohort.points[2].entities, 1);
        assert!((cohort.points[2].mean_cumulative - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cohort() {
        assert!(CohortCurve::from_curves(&[]).is_empty());
    }
}
