//! Summary reports over the time buckets of one transect.

use crate::error::{DataError, DataResult};
use crate::hierarchy::{Series, TimeBuckets};
use std::fmt;
use std::str::FromStr;
use tft_mesh::FlowCategory;
use tft_utils::dates::month_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    TimeSeries,
    Daily,
    MonthlyTotals,
    MonthlyAverages,
    AverageMonth,
    YearlyTotals,
    YearlyAverages,
    SeasonalTotals,
    SeasonalAverages,
}

impl ReportKind {
    pub const ALL: [ReportKind; 9] = [
        ReportKind::TimeSeries,
        ReportKind::Daily,
        ReportKind::MonthlyTotals,
        ReportKind::MonthlyAverages,
        ReportKind::AverageMonth,
        ReportKind::YearlyTotals,
        ReportKind::YearlyAverages,
        ReportKind::SeasonalTotals,
        ReportKind::SeasonalAverages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::TimeSeries => "time-series",
            ReportKind::Daily => "daily",
            ReportKind::MonthlyTotals => "monthly-totals",
            ReportKind::MonthlyAverages => "monthly-averages",
            ReportKind::AverageMonth => "average-month",
            ReportKind::YearlyTotals => "yearly-totals",
            ReportKind::YearlyAverages => "yearly-averages",
            ReportKind::SeasonalTotals => "seasonal-totals",
            ReportKind::SeasonalAverages => "seasonal-averages",
        }
    }

    /// Appended to the run name to form the output file name.
    pub fn suffix(&self) -> &'static str {
        match self {
            ReportKind::TimeSeries => "_time_series.csv",
            ReportKind::Daily => "_daily.csv",
            ReportKind::MonthlyTotals => "_monthly_totals.csv",
            ReportKind::MonthlyAverages => "_monthly_averages.csv",
            ReportKind::AverageMonth => "_average_month.csv",
            ReportKind::YearlyTotals => "_yearly_totals.csv",
            ReportKind::YearlyAverages => "_yearly_averages.csv",
            ReportKind::SeasonalTotals => "_seasonal_totals.csv",
            ReportKind::SeasonalAverages => "_seasonal_averages.csv",
        }
    }

    /// Heading of the row label column.
    pub fn label_heading(&self) -> &'static str {
        match self {
            ReportKind::AverageMonth => "MONTH",
            ReportKind::SeasonalTotals | ReportKind::SeasonalAverages => "SEASON DATES",
            _ => "DATE",
        }
    }

    pub fn needs_seasons(&self) -> bool {
        matches!(self, ReportKind::SeasonalTotals | ReportKind::SeasonalAverages)
    }

    /// Check that every kind has a distinct file suffix.
    pub fn validate_table() -> DataResult<()> {
        for (i, first) in Self::ALL.iter().enumerate() {
            if let Some(second) = Self::ALL[i + 1..]
                .iter()
                .find(|other| other.suffix() == first.suffix())
            {
                return Err(DataError::DuplicateReportSuffix {
                    first: first.to_string(),
                    second: second.to_string(),
                    suffix: first.suffix(),
                });
            }
        }
        Ok(())
    }

    /// Parse a comma separated list such as `"daily,yearly-totals"`.
    pub fn parse_list(list: &str) -> DataResult<Vec<ReportKind>> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse::<ReportKind>)
            .collect()
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| DataError::UnknownReport {
                name: s.to_string(),
            })
    }
}

/// One row of a summary report. `values` follows the requested column
/// order; a category the transect does not have is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub total: f64,
}

#[derive(Clone, Copy)]
enum Reduce {
    Sum,
    Mean,
}

impl Reduce {
    fn row(self, label: String, series: &Series, columns: &[FlowCategory]) -> SummaryRow {
        let values = columns
            .iter()
            .map(|category| match self {
                Reduce::Sum => series.category_total(category),
                Reduce::Mean => series.category_mean(category),
            })
            .collect();
        let total = match self {
            Reduce::Sum => series.total(),
            Reduce::Mean => series.mean().unwrap_or(0.0),
        };
        SummaryRow {
            label,
            values,
            total,
        }
    }
}

/// Rows of report `kind` for the given column layout.
///
/// Seasonal kinds produce no rows when no seasons were configured.
pub fn summarize(kind: ReportKind, buckets: &TimeBuckets, columns: &[FlowCategory]) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    match kind {
        ReportKind::TimeSeries => {
            for (year, month, day, series) in days(buckets) {
                for step in 0..series.len() {
                    let values = columns
                        .iter()
                        .map(|category| series.values.get(category).and_then(|v| v.get(step).copied()))
                        .collect();
                    rows.push(SummaryRow {
                        label: format!("{month:02}/{day:02}/{year}"),
                        values,
                        total: series.all[step],
                    });
                }
            }
        }
        ReportKind::Daily => {
            for (year, month, day, series) in days(buckets) {
                rows.push(Reduce::Sum.row(format!("{month:02}/{day:02}/{year}"), series, columns));
            }
        }
        ReportKind::MonthlyTotals | ReportKind::MonthlyAverages => {
            let reduce = if kind == ReportKind::MonthlyTotals {
                Reduce::Sum
            } else {
                Reduce::Mean
            };
            for (year, bucket) in &buckets.years {
                for (month, bucket) in &bucket.months {
                    rows.push(reduce.row(format!("{month:02}/{year}"), &bucket.series, columns));
                }
            }
        }
        ReportKind::AverageMonth => {
            for (month, series) in &buckets.months {
                rows.push(Reduce::Mean.row(month_name(*month).to_string(), series, columns));
            }
        }
        ReportKind::YearlyTotals | ReportKind::YearlyAverages => {
            let reduce = if kind == ReportKind::YearlyTotals {
                Reduce::Sum
            } else {
                Reduce::Mean
            };
            for (year, bucket) in &buckets.years {
                rows.push(reduce.row(year.to_string(), &bucket.series, columns));
            }
        }
        ReportKind::SeasonalTotals => {
            if let Some(seasons) = &buckets.seasons {
                for (year, ranges) in &seasons.years {
                    for (range, series) in ranges {
                        rows.push(Reduce::Sum.row(range.label(*year), series, columns));
                    }
                }
            }
        }
        ReportKind::SeasonalAverages => {
            if let Some(seasons) = &buckets.seasons {
                for (range, series) in &seasons.totals {
                    rows.push(Reduce::Mean.row(range.to_string(), series, columns));
                }
            }
        }
    }
    rows
}

fn days(buckets: &TimeBuckets) -> impl Iterator<Item = (i32, u32, u32, &Series)> {
    buckets.years.iter().flat_map(|(&year, bucket)| {
        bucket.months.iter().flat_map(move |(&month, bucket)| {
            bucket
                .days
                .iter()
                .map(move |(&day, series)| (year, month, day, series))
        })
    })
}
