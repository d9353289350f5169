//! Continuity of flow along a transect group: monthly flows per mile of
//! each sub-transect and the coefficient of variation across the children.

use crate::error::{DataError, DataResult};
use crate::hierarchy::{MonthlyTotal, TimeBuckets};
use crate::stats;
use chrono::NaiveDate;
use tft_utils::dates::{last_day_of_month, ROW_DATE_FORMAT};

pub const DEFAULT_COV_THRESHOLD: f64 = 3.0;
pub const FEET_PER_MILE: f64 = 5280.0;

/// Volume per mile of transect.
pub fn normalize(total: f64, distance: f64) -> f64 {
    total / (distance / FEET_PER_MILE)
}

/// Clamp a finite COV into `[0, threshold]`. Non-finite values pass through.
pub fn clamp_cov(cov: f64, threshold: f64) -> f64 {
    if cov.is_finite() {
        cov.clamp(0.0, threshold)
    } else {
        cov
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovStats {
    pub mean: f64,
    pub std_dev: f64,
    pub cov: f64,
}

impl CovStats {
    /// Mean, population standard deviation and clamped COV of `values`.
    /// An empty slice or a zero mean yields non-finite values.
    pub fn compute(values: &[f64], threshold: f64) -> Self {
        let mean = stats::mean(values).unwrap_or(f64::NAN);
        let std_dev = stats::population_std_dev(values).unwrap_or(f64::NAN);
        Self {
            mean,
            std_dev,
            cov: clamp_cov(std_dev / mean, threshold),
        }
    }

    pub fn cov_100(&self) -> f64 {
        self.cov * 100.0
    }
}

/// Monthly totals of one sub-transect.
#[derive(Debug, Clone, PartialEq)]
pub struct TransectSeries {
    pub label: String,
    pub distance: f64,
    pub is_parent: bool,
    pub totals: Vec<MonthlyTotal>,
}

impl TransectSeries {
    pub fn new(label: impl Into<String>, distance: f64, is_parent: bool, totals: Vec<MonthlyTotal>) -> Self {
        Self {
            label: label.into(),
            distance,
            is_parent,
            totals,
        }
    }

    pub fn from_buckets(label: impl Into<String>, distance: f64, is_parent: bool, buckets: &TimeBuckets) -> Self {
        Self::new(label, distance, is_parent, buckets.monthly_totals())
    }

    pub fn months(&self) -> Vec<(i32, u32)> {
        self.totals.iter().map(|t| (t.year, t.month)).collect()
    }

    pub fn normalized(&self) -> Vec<f64> {
        self.totals
            .iter()
            .map(|t| normalize(t.total, self.distance))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityRow {
    /// Last day of the month.
    pub date: NaiveDate,
    pub parents: Vec<f64>,
    pub children: Vec<f64>,
    pub stats: CovStats,
    /// Absolute COV difference from the target, once scored.
    pub diff: Option<f64>,
}

impl ContinuityRow {
    pub fn date_label(&self) -> String {
        self.date.format(ROW_DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationScore {
    pub sum: f64,
    pub average: f64,
    pub count: usize,
    pub index: f64,
}

/// Row-wise absolute COV differences between two runs.
pub fn deviation_score(
    target: &[f64],
    alternative: &[f64],
    threshold: f64,
) -> DataResult<(DeviationScore, Vec<f64>)> {
    if target.len() != alternative.len() {
        return Err(DataError::RowCountMismatch {
            target: target.len(),
            alternative: alternative.len(),
        });
    }
    let deltas: Vec<f64> = target
        .iter()
        .zip(alternative)
        .map(|(t, a)| (t - a).abs())
        .collect();
    let sum: f64 = deltas.iter().sum();
    let count = deltas.len();
    let average = sum / count as f64;
    Ok((
        DeviationScore {
            sum,
            average,
            count,
            index: threshold - average,
        },
        deltas,
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityTable {
    pub parent_labels: Vec<String>,
    pub child_labels: Vec<String>,
    pub rows: Vec<ContinuityRow>,
    pub threshold: f64,
    /// Non-finite statistics and zero-distance transects.
    pub warnings: Vec<String>,
}

impl ContinuityTable {
    /// Build from the monthly series of every sub-transect of a group.
    /// All series must cover the same months.
    pub fn build(series: &[TransectSeries], threshold: f64) -> DataResult<Self> {
        let months = series.first().map(TransectSeries::months).unwrap_or_default();
        if let Some(other) = series.iter().find(|s| s.months() != months) {
            return Err(DataError::MonthAxisMismatch {
                label: other.label.clone(),
            });
        }
        let flat: Vec<f64> = series
            .iter()
            .flat_map(|s| s.totals.iter().map(|t| t.total))
            .collect();
        let transects: Vec<(String, f64, bool)> = series
            .iter()
            .map(|s| (s.label.clone(), s.distance, s.is_parent))
            .collect();
        Self::from_flat(&months, &flat, &transects, threshold)
    }

    /// Reshape a concatenation of per-transect monthly totals (transect
    /// major, in `transects` order) into month rows.
    pub fn from_flat(
        months: &[(i32, u32)],
        flat: &[f64],
        transects: &[(String, f64, bool)],
        threshold: f64,
    ) -> DataResult<Self> {
        if flat.len() != months.len() * transects.len() {
            return Err(DataError::StructureMismatch {
                values: flat.len(),
                months: months.len(),
                transects: transects.len(),
            });
        }
        let mut warnings = Vec::new();
        for (label, distance, _) in transects {
            if *distance == 0.0 {
                warnings.push(format!("transect {label} has zero length; its flows are not finite"));
            }
        }

        let mut rows = Vec::with_capacity(months.len());
        for (m, &(year, month)) in months.iter().enumerate() {
            let date = last_day_of_month(year, month).ok_or(DataError::InvalidMonth { year, month })?;
            let mut parents = Vec::new();
            let mut children = Vec::new();
            for (t, (_, distance, is_parent)) in transects.iter().enumerate() {
                let flow = normalize(flat[t * months.len() + m], *distance);
                if *is_parent {
                    parents.push(flow);
                } else {
                    children.push(flow);
                }
            }
            let stats = CovStats::compute(&children, threshold);
            if !stats.cov.is_finite() {
                warnings.push(format!(
                    "{}: COV is {} (mean {}, std-dev {})",
                    date.format(ROW_DATE_FORMAT),
                    stats.cov,
                    stats.mean,
                    stats.std_dev
                ));
            }
            rows.push(ContinuityRow {
                date,
                parents,
                children,
                stats,
                diff: None,
            });
        }
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let labels = |parent: bool| -> Vec<String> {
            transects
                .iter()
                .filter(|(_, _, is_parent)| *is_parent == parent)
                .map(|(label, _, _)| label.clone())
                .collect()
        };
        Ok(Self {
            parent_labels: labels(true),
            child_labels: labels(false),
            rows,
            threshold,
            warnings,
        })
    }

    pub fn covs(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.stats.cov).collect()
    }

    /// Score this (alternative) table against `target` and record the
    /// per-row differences.
    pub fn score_against(&mut self, target: &ContinuityTable) -> DataResult<DeviationScore> {
        let (score, deltas) = deviation_score(&target.covs(), &self.covs(), self.threshold)?;
        for (row, delta) in self.rows.iter_mut().zip(deltas) {
            row.diff = Some(delta);
        }
        Ok(score)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn finite_cov_stays_within_threshold(values in prop::collection::vec(-1e6f64..1e6, 1..12)) {
            let stats = CovStats::compute(&values, DEFAULT_COV_THRESHOLD);
            if stats.cov.is_finite() {
                prop_assert!((0.0..=DEFAULT_COV_THRESHOLD).contains(&stats.cov));
            }
        }

        #[test]
        fn identical_runs_score_the_threshold(covs in prop::collection::vec(0.0f64..3.0, 1..24)) {
            let (score, _) = deviation_score(&covs, &covs, DEFAULT_COV_THRESHOLD).unwrap();
            prop_assert_eq!(score.sum, 0.0);
            prop_assert_eq!(score.index, DEFAULT_COV_THRESHOLD);
        }
    }
}
