//! Time buckets holding per-timestep net volumes of one transect.
//!
//! Every bucket is a [`Series`]: the net volume of each recorded timestep
//! (`all`) plus the same steps split by flow category (`values`). Buckets
//! are only ever appended to.

use crate::season::SeasonRange;
use crate::stats;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tft_mesh::FlowCategory;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub all: Vec<f64>,
    pub values: BTreeMap<FlowCategory, Vec<f64>>,
}

impl Series {
    /// Append one timestep. `all` receives the sum over the categories.
    pub fn push(&mut self, nets: &[(FlowCategory, f64)]) {
        self.all.push(nets.iter().map(|(_, net)| net).sum());
        for (category, net) in nets {
            self.values.entry(category.clone()).or_default().push(*net);
        }
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.all.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        stats::mean(&self.all)
    }

    pub fn category_total(&self, category: &FlowCategory) -> Option<f64> {
        self.values.get(category).map(|values| values.iter().sum())
    }

    pub fn category_mean(&self, category: &FlowCategory) -> Option<f64> {
        self.values.get(category).and_then(|values| stats::mean(values))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthBucket {
    pub series: Series,
    pub days: BTreeMap<u32, Series>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearBucket {
    pub series: Series,
    pub months: BTreeMap<u32, MonthBucket>,
}

/// Season sums, per occurrence (`years`, keyed by range year) and pooled
/// across all years (`ranges`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonBuckets {
    pub ranges: Vec<SeasonRange>,
    pub years: BTreeMap<i32, BTreeMap<SeasonRange, Series>>,
    pub totals: BTreeMap<SeasonRange, Series>,
}

impl SeasonBuckets {
    fn push(&mut self, date: NaiveDate, nets: &[(FlowCategory, f64)]) {
        for range in self.ranges.iter().filter(|range| range.contains_date(date)) {
            self.years
                .entry(range.range_year(date))
                .or_default()
                .entry(*range)
                .or_default()
                .push(nets);
            self.totals.entry(*range).or_default().push(nets);
        }
    }
}

/// Calendar month total of one transect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeBuckets {
    /// Year, then month, then day.
    pub years: BTreeMap<i32, YearBucket>,
    /// Calendar months pooled across years.
    pub months: BTreeMap<u32, Series>,
    pub seasons: Option<SeasonBuckets>,
    /// Column order of the transect, sorted by name.
    pub categories: Vec<FlowCategory>,
    /// True when segment edges were folded into the manning-circle column.
    pub with_segments: bool,
}

impl TimeBuckets {
    pub fn new(categories: Vec<FlowCategory>, seasons: &[SeasonRange]) -> Self {
        Self {
            categories,
            seasons: (!seasons.is_empty()).then(|| SeasonBuckets {
                ranges: seasons.to_vec(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Record the per-category net volumes of one timestep.
    pub fn record(&mut self, date: NaiveDate, nets: &[(FlowCategory, f64)]) {
        let year = self.years.entry(date.year()).or_default();
        year.series.push(nets);
        let month = year.months.entry(date.month()).or_default();
        month.series.push(nets);
        month.days.entry(date.day()).or_default().push(nets);
        self.months.entry(date.month()).or_default().push(nets);
        if let Some(seasons) = self.seasons.as_mut() {
            seasons.push(date, nets);
        }
    }

    pub fn year(&self, year: i32) -> Option<&YearBucket> {
        self.years.get(&year)
    }

    pub fn month(&self, year: i32, month: u32) -> Option<&MonthBucket> {
        self.year(year)?.months.get(&month)
    }

    pub fn day(&self, year: i32, month: u32, day: u32) -> Option<&Series> {
        self.month(year, month)?.days.get(&day)
    }

    /// Number of recorded timesteps.
    pub fn len(&self) -> usize {
        self.years.values().map(|year| year.series.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Chronological month totals.
    pub fn monthly_totals(&self) -> Vec<MonthlyTotal> {
        self.years
            .iter()
            .flat_map(|(&year, bucket)| {
                bucket.months.iter().map(move |(&month, bucket)| MonthlyTotal {
                    year,
                    month,
                    total: bucket.series.total(),
                })
            })
            .collect()
    }

    pub fn yearly_totals(&self) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .map(|(&year, bucket)| (year, bucket.series.total()))
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn months_add_up_to_years(volumes in prop::collection::vec(-1e3f64..1e3, 1..800)) {
            let start = NaiveDate::from_ymd_opt(1999, 7, 1).unwrap();
            let mut buckets = TimeBuckets::new(vec![FlowCategory::DarcyCircle], &[]);
            for (offset, volume) in volumes.iter().enumerate() {
                let date = start + chrono::Days::new(offset as u64);
                buckets.record(date, &[(FlowCategory::DarcyCircle, *volume)]);
            }
            prop_assert_eq!(buckets.len(), volumes.len());
            for bucket in buckets.years.values() {
                let months: f64 = bucket.months.values().map(|m| m.series.total()).sum();
                prop_assert!((months - bucket.series.total()).abs() < 1e-6);
            }
        }
    }
}
