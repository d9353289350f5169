//! Monthly totals files: the target baseline of a transect group, and the
//! export written for every processed run.
//!
//! Columns: `transect,distance,year,month,total`. Rows of one transect
//! need not be contiguous; they are grouped by transect label in order of
//! first appearance.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tft_data::{DataError, MonthlyTotal, TransectSeries};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub transect: String,
    pub distance: f64,
    pub year: i32,
    pub month: u32,
    pub total: f64,
}

/// A label such as "12_13_14" with more than two nodes is a parent transect.
pub fn is_parent_label(label: &str) -> bool {
    label.split('_').count() > 2
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetData {
    series: Vec<TransectSeries>,
}

impl TargetData {
    pub fn new(series: Vec<TransectSeries>) -> Self {
        Self { series }
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut series: Vec<TransectSeries> = Vec::new();
        for (line, result) in rdr.deserialize::<MonthlyRecord>().enumerate() {
            let record = result.with_context(|| format!("Malformed monthly totals row {}", line + 2))?;
            let total = MonthlyTotal {
                year: record.year,
                month: record.month,
                total: record.total,
            };
            match series.iter_mut().find(|s| s.label == record.transect) {
                Some(existing) => existing.totals.push(total),
                None => {
                    let is_parent = is_parent_label(&record.transect);
                    series.push(TransectSeries::new(record.transect, record.distance, is_parent, vec![total]));
                }
            }
        }
        for s in &mut series {
            s.totals.sort_by_key(|t| (t.year, t.month));
        }
        Ok(Self { series })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open target {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read target {}", path.display()))
    }

    pub fn series(&self) -> &[TransectSeries] {
        &self.series
    }

    pub fn get(&self, label: &str) -> Option<&TransectSeries> {
        self.series.iter().find(|s| s.label == label)
    }

    /// Series for `labels`, in that order.
    pub fn ordered(&self, labels: &[String]) -> Result<Vec<TransectSeries>, DataError> {
        labels
            .iter()
            .map(|label| {
                self.get(label).cloned().ok_or_else(|| DataError::MissingTransect {
                    label: label.clone(),
                })
            })
            .collect()
    }

    pub fn write<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        write_monthly_totals(writer, &self.series)
    }
}

pub fn write_monthly_totals<W: Write>(writer: W, series: &[TransectSeries]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in series {
        for total in &s.totals {
            wtr.serialize(MonthlyRecord {
                transect: s.label.clone(),
                distance: s.distance,
                year: total.year,
                month: total.month,
                total: total.total,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}
