//! CSV writers for reports, continuity and timing tables.

use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tft_data::continuity::DeviationScore;
use tft_data::report::{summarize, ReportKind};
use tft_data::timing::TimingSummary;
use tft_data::{ContinuityTable, DataError, DataResult, TimeBuckets, TimestepSink, TimingTable};
use tft_mesh::{FlowCategory, ResolvedTransect};
use tft_utils::dates::{month_name, WATER_YEAR_MONTHS};

/// File name stem of one run: `<label>_<run>` when a label is given,
/// otherwise `<group>_<run>`.
pub fn file_stem(label: Option<&str>, group: &str, run: &str) -> String {
    match label {
        Some(label) if !label.is_empty() => format!("{label}_{run}"),
        _ => format!("{group}_{run}"),
    }
}

pub fn create(dir: &Path, name: &str) -> anyhow::Result<(PathBuf, File)> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok((path, file))
}

fn number(value: f64) -> String {
    format!("{value:.4}")
}

/// Header cells of a report for the given columns.
pub fn report_header(kind: ReportKind, columns: &[FlowCategory], with_segments: bool, units: &str) -> Vec<String> {
    std::iter::once(kind.label_heading().to_string())
        .chain(
            columns
                .iter()
                .map(|category| format!("{} ({units})", category.label(with_segments))),
        )
        .chain(std::iter::once(format!("TOTAL ({units})")))
        .collect()
}

/// Write one summary report of a transect. Absent categories are blank.
pub fn write_report<W: Write>(
    writer: W,
    kind: ReportKind,
    resolved: &ResolvedTransect,
    buckets: &TimeBuckets,
    columns: &[FlowCategory],
    units: &str,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let nodes = resolved
        .transect
        .one_based_nodes()
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    wtr.write_record([format!("Nodes [{nodes}]"), format!("Transect={:.0}", resolved.distance())])?;
    let names = resolved
        .bucket
        .edge_names()
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    wtr.write_record([format!("Watermovers [{names}]")])?;
    wtr.write_record(report_header(kind, columns, buckets.with_segments, units))?;
    for row in summarize(kind, buckets, columns) {
        let mut record = vec![row.label];
        record.extend(row.values.iter().map(|value| value.map(number).unwrap_or_default()));
        record.push(number(row.total));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Streams the per-timestep in/out volumes of a transect to CSV.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, units: &str) -> anyhow::Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record([
            "TIMESTAMP".to_string(),
            "CATEGORY".to_string(),
            format!("IN ({units})"),
            format!("OUT ({units})"),
            format!("NET ({units})"),
        ])?;
        Ok(Self { writer })
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> TimestepSink for CsvSink<W> {
    fn record(
        &mut self,
        timestamp: &str,
        category: &FlowCategory,
        inflow: f64,
        outflow: f64,
        net: f64,
    ) -> DataResult<()> {
        self.writer
            .write_record([
                timestamp.to_string(),
                category.to_string(),
                number(inflow),
                number(outflow),
                number(net),
            ])
            .map_err(|e| DataError::Sink(e.to_string()))
    }
}

pub fn write_continuity<W: Write>(
    writer: W,
    table: &ContinuityTable,
    score: Option<&DeviationScore>,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let mut header = vec!["Date".to_string()];
    header.extend(table.parent_labels.iter().cloned());
    header.extend(table.child_labels.iter().cloned());
    header.extend(["Mean", "Std-Dev", "COV", "COV*100"].map(String::from));
    if score.is_some() {
        header.push("Diff".to_string());
    }
    wtr.write_record(&header)?;
    for row in &table.rows {
        let mut record = vec![row.date_label()];
        record.extend(row.parents.iter().chain(&row.children).map(|v| number(*v)));
        record.extend([row.stats.mean, row.stats.std_dev, row.stats.cov, row.stats.cov_100()].map(number));
        if score.is_some() {
            record.push(row.diff.map(number).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    if let Some(score) = score {
        wtr.write_record(["Deviation Sum".to_string(), number(score.sum)])?;
        wtr.write_record(["Deviation Average".to_string(), number(score.average)])?;
        wtr.write_record(["Row Count".to_string(), score.count.to_string()])?;
        wtr.write_record(["Index Score".to_string(), number(score.index)])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_timing<W: Write>(writer: W, table: &TimingTable, summary: Option<&TimingSummary>) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let mut header = vec![format!("Water Year ({})", table.label)];
    header.extend(WATER_YEAR_MONTHS.iter().map(|&month| month_name(month).to_string()));
    header.push("Index".to_string());
    wtr.write_record(&header)?;
    for row in &table.rows {
        let mut record = vec![row.water_year.to_string()];
        record.extend(row.values().map(number));
        wtr.write_record(&record)?;
    }
    if let Some(summary) = summary {
        for (label, values) in &summary.rows {
            let mut record = vec![label.to_string()];
            record.extend(values.map(number));
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tft_data::{Aggregator, TransectSeries};
    use tft_mesh::{MeshData, Transect, WallResolver};

    const MESH: &str = r#"{
        "coordinates": { "0": { "x": 0.0, "y": 0.0 }, "1": { "x": 3.0, "y": 4.0 } },
        "cells": [
            { "nodes": [0, 1, 2], "waterbody": 1 },
            { "nodes": [1, 0, 3], "waterbody": 2 }
        ],
        "edges": [
            { "from": 1, "to": 2, "kind": "ManningCircle", "name": "m_1_2" },
            { "from": 2, "to": 1, "kind": "DarcyCircle", "name": "d_2_1" }
        ],
        "volume_units": "ft^3",
        "volumes": [[10.0, 1.0], [20.0, 2.0]],
        "time_units": "days since 2001-01-31 00:00:00",
        "timestamps": [0.0, 1.0]
    }"#;

    fn to_string(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Some("ALT"), "T1", "run5"), "ALT_run5");
        assert_eq!(file_stem(None, "T1", "run5"), "T1_run5");
        assert_eq!(file_stem(Some(""), "T1", "run5"), "T1_run5");
    }

    #[test]
    fn test_monthly_report_with_seepage_layout() {
        let mesh = MeshData::from_json_str(MESH).unwrap();
        let resolved = WallResolver::new(&mesh).resolve(&Transect::new(vec![0, 1]).unwrap());
        let buckets = Aggregator::new(&mesh).quiet().aggregate(&resolved).unwrap();

        let mut buffer = Vec::new();
        write_report(
            &mut buffer,
            ReportKind::MonthlyTotals,
            &resolved,
            &buckets,
            &FlowCategory::seepage_columns(),
            "ft^3",
        )
        .unwrap();
        let text = to_string(buffer);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Nodes [1 2],Transect=5");
        assert_eq!(lines[1], "Watermovers [d_2_1 m_1_2]");
        assert!(lines[2].starts_with("DATE,DarcyCircle (ft^3),ManningCircle (ft^3)"));
        assert!(lines[2].ends_with("TOTAL (ft^3)"));
        assert_eq!(lines[3], "01/2001,-1.0000,10.0000,,,,9.0000");
        assert_eq!(lines[4], "02/2001,-2.0000,20.0000,,,,18.0000");
    }

    #[test]
    fn test_csv_sink() {
        let mut buffer = Vec::new();
        {
            let mut sink = CsvSink::new(&mut buffer, "ft^3").unwrap();
            sink.record("01/31/2001 00:00:00", &FlowCategory::DarcyCircle, 1.0, 3.0, -2.0)
                .unwrap();
            sink.finish().unwrap();
        }
        let text = to_string(buffer);
        assert_eq!(
            text,
            "TIMESTAMP,CATEGORY,IN (ft^3),OUT (ft^3),NET (ft^3)\n01/31/2001 00:00:00,DarcyCircle,1.0000,3.0000,-2.0000\n"
        );
    }

    #[test]
    fn test_continuity_with_score() {
        let totals = |values: &[f64]| {
            values
                .iter()
                .enumerate()
                .map(|(i, &total)| tft_data::MonthlyTotal {
                    year: 2001,
                    month: i as u32 + 1,
                    total,
                })
                .collect::<Vec<_>>()
        };
        let target = ContinuityTable::build(
            &[
                TransectSeries::new("1_2", 5280.0, false, totals(&[10.0])),
                TransectSeries::new("2_3", 5280.0, false, totals(&[30.0])),
            ],
            3.0,
        )
        .unwrap();
        let mut alternative = target.clone();
        let score = alternative.score_against(&target).unwrap();

        let mut buffer = Vec::new();
        write_continuity(&mut buffer, &alternative, Some(&score)).unwrap();
        let text = to_string(buffer);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,1_2,2_3,Mean,Std-Dev,COV,COV*100,Diff");
        assert_eq!(lines[1], "01-31-2001,10.0000,30.0000,20.0000,10.0000,0.5000,50.0000,0.0000");
        assert_eq!(lines[5], "Index Score,3.0000");
    }

    #[test]
    fn test_timing_header() {
        let table = TimingTable::build("1_2", &[], &[]);
        let mut buffer = Vec::new();
        write_timing(&mut buffer, &table, None).unwrap();
        let text = to_string(buffer);
        assert!(text.starts_with("Water Year (1_2),November,December,January"));
        assert!(text.trim_end().ends_with("October,Index"));
    }
}
