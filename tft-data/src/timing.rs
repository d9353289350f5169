//! Timing of flow within water years: the share of the annual volume that
//! passes in each month, compared against a target run.

use crate::hierarchy::MonthlyTotal;
use crate::stats;
use std::collections::BTreeMap;
use tft_utils::dates::{water_year_for_month, WATER_YEAR_MONTHS};

/// Monthly shares of one complete water year, November first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterYearProportions {
    pub water_year: i32,
    pub proportions: [f64; 12],
}

/// Proportions of every complete water year, plus the water years dropped
/// for having fewer than 12 months.
pub fn water_year_proportions(totals: &[MonthlyTotal]) -> (Vec<WaterYearProportions>, Vec<i32>) {
    let mut years: BTreeMap<i32, BTreeMap<u32, f64>> = BTreeMap::new();
    for total in totals {
        *years
            .entry(water_year_for_month(total.year, total.month))
            .or_default()
            .entry(total.month)
            .or_default() += total.total;
    }

    let mut complete = Vec::new();
    let mut skipped = Vec::new();
    for (water_year, months) in years {
        if months.len() != WATER_YEAR_MONTHS.len() {
            skipped.push(water_year);
            continue;
        }
        let annual: f64 = months.values().sum();
        let mut proportions = [0.0; 12];
        for (slot, month) in proportions.iter_mut().zip(WATER_YEAR_MONTHS) {
            *slot = months.get(&month).copied().unwrap_or(0.0) / annual;
        }
        complete.push(WaterYearProportions {
            water_year,
            proportions,
        });
    }
    (complete, skipped)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRow {
    pub water_year: i32,
    /// Alternative minus target proportion, November first.
    pub deviations: [f64; 12],
    /// One minus the summed absolute deviations.
    pub index: f64,
}

impl TimingRow {
    /// The 12 deviations followed by the index.
    pub fn values(&self) -> [f64; 13] {
        let mut values = [0.0; 13];
        values[..12].copy_from_slice(&self.deviations);
        values[12] = self.index;
        values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingTable {
    pub label: String,
    pub rows: Vec<TimingRow>,
    /// Incomplete water years of the alternative.
    pub incomplete_years: Vec<i32>,
    /// Complete water years of the alternative absent from the target.
    pub unmatched_years: Vec<i32>,
}

impl TimingTable {
    pub fn build(label: impl Into<String>, target: &[MonthlyTotal], alternative: &[MonthlyTotal]) -> Self {
        let label = label.into();
        let (target, _) = water_year_proportions(target);
        let target: BTreeMap<i32, [f64; 12]> = target
            .into_iter()
            .map(|year| (year.water_year, year.proportions))
            .collect();
        let (alternative, incomplete_years) = water_year_proportions(alternative);

        let mut rows = Vec::new();
        let mut unmatched_years = Vec::new();
        for year in alternative {
            let Some(expected) = target.get(&year.water_year) else {
                unmatched_years.push(year.water_year);
                continue;
            };
            let mut deviations = [0.0; 12];
            for (i, deviation) in deviations.iter_mut().enumerate() {
                *deviation = year.proportions[i] - expected[i];
            }
            let index = 1.0 - deviations.iter().map(|d| d.abs()).sum::<f64>();
            rows.push(TimingRow {
                water_year: year.water_year,
                deviations,
                index,
            });
        }
        if !incomplete_years.is_empty() {
            log::warn!("transect {label}: skipped incomplete water years {incomplete_years:?}");
        }
        if !unmatched_years.is_empty() {
            log::warn!("transect {label}: target has no water years {unmatched_years:?}");
        }
        Self {
            label,
            rows,
            incomplete_years,
            unmatched_years,
        }
    }
}

/// Percentiles of one month column, for box plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boxplot {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

pub const SUMMARY_LABELS: [&str; 8] = [
    "Average", "Minimum", "0.10", "0.25", "0.50", "0.75", "0.90", "Maximum",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    /// One row per entry of [`SUMMARY_LABELS`], over the 13 table columns.
    pub rows: Vec<(&'static str, [f64; 13])>,
    /// Per month, November first.
    pub boxplots: Vec<Boxplot>,
}

impl TimingSummary {
    /// None when the table has no rows.
    pub fn from_table(table: &TimingTable) -> Option<Self> {
        if table.rows.is_empty() {
            return None;
        }
        let columns: Vec<Vec<f64>> = (0..13)
            .map(|c| table.rows.iter().map(|row| row.values()[c]).collect())
            .collect();
        let quantile = |q: f64| -> [f64; 13] {
            let mut out = [0.0; 13];
            for (slot, column) in out.iter_mut().zip(&columns) {
                *slot = stats::percentile(column, q).unwrap_or(f64::NAN);
            }
            out
        };
        let reduce = |f: fn(&[f64]) -> Option<f64>| -> [f64; 13] {
            let mut out = [0.0; 13];
            for (slot, column) in out.iter_mut().zip(&columns) {
                *slot = f(column).unwrap_or(f64::NAN);
            }
            out
        };

        let rows = vec![
            (SUMMARY_LABELS[0], reduce(stats::mean)),
            (SUMMARY_LABELS[1], reduce(stats::min)),
            (SUMMARY_LABELS[2], quantile(0.10)),
            (SUMMARY_LABELS[3], quantile(0.25)),
            (SUMMARY_LABELS[4], quantile(0.50)),
            (SUMMARY_LABELS[5], quantile(0.75)),
            (SUMMARY_LABELS[6], quantile(0.90)),
            (SUMMARY_LABELS[7], reduce(stats::max)),
        ];
        let boxplots = (0..12)
            .map(|month| Boxplot {
                p10: rows[2].1[month],
                p25: rows[3].1[month],
                p50: rows[4].1[month],
                p75: rows[5].1[month],
                p90: rows[6].1[month],
            })
            .collect();
        Some(Self { rows, boxplots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monthly totals for water years `first..=last`, Nov through Oct.
    fn water_years(first: i32, last: i32, volume: impl Fn(i32, u32) -> f64) -> Vec<MonthlyTotal> {
        let mut totals = Vec::new();
        for water_year in first..=last {
            for month in WATER_YEAR_MONTHS {
                let year = if month >= 11 { water_year - 1 } else { water_year };
                totals.push(MonthlyTotal {
                    year,
                    month,
                    total: volume(water_year, month),
                });
            }
        }
        totals
    }

    #[test]
    fn test_proportions_of_complete_year() {
        let totals = water_years(2001, 2001, |_, month| month as f64);
        let (years, skipped) = water_year_proportions(&totals);
        assert!(skipped.is_empty());
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].water_year, 2001);
        // November is first, 11 / 78
        assert!((years[0].proportions[0] - 11.0 / 78.0).abs() < 1e-12);
        assert!((years[0].proportions.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_eleven_month_year_is_excluded() {
        let mut totals = water_years(2001, 2002, |_, _| 1.0);
        // drop March 2002
        totals.retain(|t| !(t.year == 2002 && t.month == 3));
        let (years, skipped) = water_year_proportions(&totals);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].water_year, 2001);
        assert_eq!(skipped, vec![2002]);

        let table = TimingTable::build("1_2", &totals, &totals);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.incomplete_years, vec![2002]);
    }

    #[test]
    fn test_identical_runs_score_one() {
        let totals = water_years(2001, 2003, |year, month| (year as f64) * 0.5 + month as f64);
        let table = TimingTable::build("1_2", &totals, &totals);
        assert_eq!(table.rows.len(), 3);
        for row in &table.rows {
            assert!(row.deviations.iter().all(|d| *d == 0.0));
            assert_eq!(row.index, 1.0);
            assert_eq!(row.values()[12], 1.0);
        }
    }

    #[test]
    fn test_deviation_against_target() {
        let target = water_years(2001, 2001, |_, _| 1.0);
        // everything in November
        let alternative = water_years(2001, 2002, |_, month| if month == 11 { 12.0 } else { 0.0 });
        let table = TimingTable::build("1_2", &target, &alternative);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.unmatched_years, vec![2002]);
        let row = table.rows[0];
        assert!((row.deviations[0] - 11.0 / 12.0).abs() < 1e-12);
        assert!((row.deviations[1] + 1.0 / 12.0).abs() < 1e-12);
        assert!((row.index - (1.0 - 22.0 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn test_summary_rows_and_boxplots() {
        let target = water_years(2001, 2005, |_, _| 1.0);
        let alternative = water_years(2001, 2005, |year, month| {
            if month == 11 {
                1.0 + (year - 2000) as f64
            } else {
                1.0
            }
        });
        let table = TimingTable::build("1_2", &target, &alternative);
        let summary = TimingSummary::from_table(&table).unwrap();
        let labels: Vec<&str> = summary.rows.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, SUMMARY_LABELS.to_vec());
        assert_eq!(summary.boxplots.len(), 12);

        let november: Vec<f64> = table.rows.iter().map(|row| row.deviations[0]).collect();
        assert_eq!(summary.rows[1].1[0], stats::min(&november).unwrap());
        assert_eq!(summary.rows[7].1[0], stats::max(&november).unwrap());
        assert_eq!(summary.boxplots[0].p50, stats::percentile(&november, 0.5).unwrap());
        assert!(summary.boxplots[0].p10 <= summary.boxplots[0].p90);

        let empty = TimingTable::build("1_2", &target, &[]);
        assert!(TimingSummary::from_table(&empty).is_none());
    }
}
