//! Batch processing of a run configuration.
//!
//! Every run of every transect group is opened once, each sub-transect is
//! resolved and aggregated in turn, and the selected reports are written.
//! When the group has a target, continuity and timing comparisons follow.
//! A failing transect or run is recorded and skipped; the remaining ones
//! still proceed.

use crate::config::{RunConfig, RunSpec, TransectGroupConfig};
use crate::output::{self, CsvSink};
use crate::target::{write_monthly_totals, TargetData};
use crate::OutputSelection;
use anyhow::Context;
use chrono::Local;
use log::{error, info, warn};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tft_data::{Aggregator, ContinuityTable, ReportKind, SeasonRange, TimingSummary, TimingTable, TransectSeries};
use tft_mesh::{FlowCategory, FlowSource, MeshData, SegmentOverride, Transect, WallResolver};
use tft_utils::progress::format_elapsed;

/// What a pipeline run did.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub runs_processed: usize,
    pub transects_processed: usize,
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
    pub cancelled: bool,
}

impl RunOutcome {
    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    fn fail(&mut self, message: String) {
        error!("{message}");
        self.failures.push(message);
    }
}

/// Target of a transect group, loaded once and shared by all of its runs.
struct GroupTarget {
    data: TargetData,
    continuity: Option<ContinuityTable>,
}

/// Shared inputs of every run in one group.
struct GroupContext<'g> {
    group: &'g TransectGroupConfig,
    transects: Vec<Transect>,
    seasons: Vec<SeasonRange>,
    overrides: Vec<SegmentOverride>,
    target: Option<GroupTarget>,
}

pub struct Pipeline<'a> {
    config: &'a RunConfig,
    outputs: &'a OutputSelection,
    kinds: Vec<ReportKind>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a RunConfig, outputs: &'a OutputSelection) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            outputs,
            kinds: outputs.report_kinds()?,
            cancel: None,
        })
    }

    /// Stop between transects once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false)
    }

    pub fn run(&self) -> anyhow::Result<RunOutcome> {
        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.output_dir.display()
            )
        })?;
        if !self.config.title.is_empty() {
            info!("{}", self.config.title);
        }
        let started = Instant::now();
        let mut outcome = RunOutcome::default();
        for group in &self.config.transects {
            if self.cancelled() {
                outcome.cancelled = true;
                break;
            }
            if let Err(e) = self.run_group(group, &mut outcome) {
                outcome.fail(format!("Transect group {}: {e:#}", group.name));
            }
        }
        if outcome.cancelled {
            warn!("Processing cancelled");
        }
        info!("Total processing time {}", format_elapsed(started.elapsed()));
        Ok(outcome)
    }

    fn run_group(&self, group: &TransectGroupConfig, outcome: &mut RunOutcome) -> anyhow::Result<()> {
        let transects = group.transects()?;
        let labels: Vec<String> = transects.iter().map(Transect::label).collect();
        let context = GroupContext {
            group,
            seasons: group.season_ranges()?,
            overrides: group.segment_overrides()?,
            target: self.load_target(group, &labels, outcome),
            transects,
        };
        info!(
            "Transect group {}: {} transects, {} runs",
            group.name,
            context.transects.len(),
            group.runs.len()
        );
        for run in &group.runs {
            if self.cancelled() {
                outcome.cancelled = true;
                break;
            }
            match self.run_alternative(&context, run, outcome) {
                Ok(()) if outcome.cancelled => break,
                Ok(()) => outcome.runs_processed += 1,
                Err(e) => outcome.fail(format!("{} / {}: {e:#}", group.name, run.name)),
            }
        }
        Ok(())
    }

    fn load_target(
        &self,
        group: &TransectGroupConfig,
        labels: &[String],
        outcome: &mut RunOutcome,
    ) -> Option<GroupTarget> {
        if !self.outputs.needs_target() {
            return None;
        }
        let Some(path) = &group.target else {
            outcome.warn(format!(
                "Transect group {} has no target; comparisons skipped",
                group.name
            ));
            return None;
        };
        let data = match TargetData::load(path) {
            Ok(data) => data,
            Err(e) => {
                outcome.fail(format!("Transect group {}: {e:#}", group.name));
                return None;
            }
        };
        let continuity = if self.outputs.continuity {
            let table = data
                .ordered(labels)
                .and_then(|series| ContinuityTable::build(&series, self.config.cov_threshold));
            match table {
                Ok(table) => {
                    for message in &table.warnings {
                        outcome.warn(format!("{} target: {message}", group.name));
                    }
                    Some(table)
                }
                Err(e) => {
                    outcome.fail(format!("Transect group {} target continuity: {e}", group.name));
                    None
                }
            }
        } else {
            None
        };
        Some(GroupTarget { data, continuity })
    }

    fn run_alternative(
        &self,
        context: &GroupContext<'_>,
        run: &RunSpec,
        outcome: &mut RunOutcome,
    ) -> anyhow::Result<()> {
        let stem = output::file_stem(self.outputs.label.as_deref(), &context.group.name, &run.name);
        info!("Model run: {} ({})", run.name, run.mesh.display());
        let mesh = MeshData::load(&run.mesh)
            .with_context(|| format!("Failed to load mesh {}", run.mesh.display()))?;
        if let (Some(start), Some(end)) = (mesh.timeline().start_date(), mesh.timeline().end_date()) {
            info!("Simulation period {start} to {end}");
        }
        let resolver = WallResolver::new(&mesh);
        let aggregator = Aggregator::new(&mesh).with_seasons(&context.seasons);

        let count = context.transects.len();
        let mut series = Vec::with_capacity(count);
        for (i, transect) in context.transects.iter().enumerate() {
            if self.cancelled() {
                outcome.cancelled = true;
                return Ok(());
            }
            info!("{}: transect {} of {} ({transect})", run.name, i + 1, count);
            let started = Instant::now();
            match self.process_transect(&mesh, &resolver, &aggregator, context, transect, &stem, outcome) {
                Ok(transect_series) => {
                    series.push(transect_series);
                    outcome.transects_processed += 1;
                }
                Err(e) => {
                    outcome.fail(format!("{stem}: transect {transect}: {e:#}"));
                    continue;
                }
            }

            let elapsed = started.elapsed();
            let remaining = elapsed * (count - i - 1) as u32;
            let finish = chrono::Duration::from_std(remaining)
                .map(|remaining| (Local::now() + remaining).format("%H:%M:%S").to_string())
                .unwrap_or_default();
            info!(
                "{transect} took {}, projected finish {finish}",
                format_elapsed(elapsed)
            );
        }

        let (path, file) = output::create(&self.config.output_dir, &format!("{stem}_monthly.csv"))?;
        write_monthly_totals(BufWriter::new(file), &series)?;
        outcome.files.push(path);

        if let Some(target) = &context.target {
            if series.len() == count {
                self.compare(&stem, target, &series, outcome)?;
            } else {
                outcome.warn(format!(
                    "{stem}: {} of {count} transects failed; comparisons skipped",
                    count - series.len()
                ));
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_transect(
        &self,
        mesh: &MeshData,
        resolver: &WallResolver<'_, MeshData>,
        aggregator: &Aggregator<'_, MeshData>,
        context: &GroupContext<'_>,
        transect: &Transect,
        stem: &str,
        outcome: &mut RunOutcome,
    ) -> anyhow::Result<TransectSeries> {
        let label = transect.label();
        let resolved = resolver.resolve_with_segments(transect, &context.overrides);
        for wall in resolved.unresolved_walls() {
            outcome.warn(format!("{stem}: transect {label}: wall {wall} matches no flow edge"));
        }
        for missing in &resolved.missing_segments {
            outcome.warn(format!(
                "{stem}: transect {label}: segment {:?} on wall {} matches no flow edge",
                missing.waterbody, missing.wall
            ));
        }
        let distance = resolved.distance();
        if distance == 0.0 {
            outcome.warn(format!("{stem}: transect {label} has zero length"));
        }

        let units = mesh.volume_units();
        let buckets = if self.kinds.contains(&ReportKind::TimeSeries) {
            let name = format!("{stem}_{label}{}", ReportKind::TimeSeries.suffix());
            let (path, file) = output::create(&self.config.output_dir, &name)?;
            let mut sink = CsvSink::new(BufWriter::new(file), units)?;
            let buckets = aggregator.aggregate_with_sink(&resolved, &mut sink)?;
            sink.finish()?;
            outcome.files.push(path);
            buckets
        } else {
            aggregator.aggregate(&resolved)?
        };

        let columns = if self.outputs.seepage {
            FlowCategory::seepage_columns()
        } else {
            buckets.categories.clone()
        };
        for kind in self.kinds.iter().filter(|kind| **kind != ReportKind::TimeSeries) {
            if kind.needs_seasons() && buckets.seasons.is_none() {
                outcome.warn(format!("{stem}: {kind} skipped, no seasons configured"));
                continue;
            }
            let name = format!("{stem}_{label}{}", kind.suffix());
            let (path, file) = output::create(&self.config.output_dir, &name)?;
            output::write_report(BufWriter::new(file), *kind, &resolved, &buckets, &columns, units)?;
            outcome.files.push(path);
        }

        Ok(TransectSeries::from_buckets(
            label,
            distance,
            transect.is_parent(),
            &buckets,
        ))
    }

    fn compare(
        &self,
        stem: &str,
        target: &GroupTarget,
        series: &[TransectSeries],
        outcome: &mut RunOutcome,
    ) -> anyhow::Result<()> {
        if let Some(target_table) = &target.continuity {
            let scored = ContinuityTable::build(series, self.config.cov_threshold).and_then(|mut table| {
                let score = table.score_against(target_table)?;
                Ok((table, score))
            });
            match scored {
                Ok((table, score)) => {
                    for message in &table.warnings {
                        outcome.warn(format!("{stem}: {message}"));
                    }
                    info!(
                        "{stem}: deviation sum {:.4}, average {:.4}, index score {:.4}",
                        score.sum, score.average, score.index
                    );
                    let (path, file) = output::create(&self.config.output_dir, &format!("{stem}_continuity.csv"))?;
                    output::write_continuity(BufWriter::new(file), &table, Some(&score))?;
                    outcome.files.push(path);
                }
                Err(e) => outcome.fail(format!("{stem}: continuity: {e}")),
            }
        }

        if self.outputs.timing {
            for alternative in series {
                let Some(baseline) = target.data.get(&alternative.label) else {
                    outcome.warn(format!(
                        "{stem}: transect {} missing from target; timing skipped",
                        alternative.label
                    ));
                    continue;
                };
                let table = TimingTable::build(&alternative.label, &baseline.totals, &alternative.totals);
                if !table.incomplete_years.is_empty() {
                    outcome.warn(format!(
                        "{stem}: transect {}: incomplete water years {:?} excluded",
                        alternative.label, table.incomplete_years
                    ));
                }
                if !table.unmatched_years.is_empty() {
                    outcome.warn(format!(
                        "{stem}: transect {}: water years {:?} not present in both runs",
                        alternative.label, table.unmatched_years
                    ));
                }
                let summary = TimingSummary::from_table(&table);
                let name = format!("{stem}_{}_timing.csv", alternative.label);
                let (path, file) = output::create(&self.config.output_dir, &name)?;
                output::write_timing(BufWriter::new(file), &table, summary.as_ref())?;
                outcome.files.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    /// Two interior walls along nodes 1-2-3 carrying 1 and 2 units a day
    /// for water year 2001.
    fn write_mesh(dir: &Path) -> PathBuf {
        let days = 365;
        let mesh = json!({
            "coordinates": {
                "0": { "x": 0.0, "y": 0.0 },
                "1": { "x": 5280.0, "y": 0.0 },
                "2": { "x": 10560.0, "y": 0.0 }
            },
            "cells": [
                { "nodes": [0, 1, 3], "waterbody": 1 },
                { "nodes": [1, 0, 4], "waterbody": 2 },
                { "nodes": [1, 2, 5], "waterbody": 3 },
                { "nodes": [2, 1, 6], "waterbody": 4 }
            ],
            "edges": [
                { "from": 1, "to": 2, "kind": "ManningCircle", "name": "mc_1_2" },
                { "from": 3, "to": 4, "kind": "ManningCircle", "name": "mc_3_4" }
            ],
            "volume_units": "ft^3",
            "volumes": vec![vec![1.0, 2.0]; days],
            "time_units": "days since 2000-11-01 00:00:00",
            "timestamps": (0..days).map(|day| day as f64).collect::<Vec<_>>(),
        });
        let path = dir.join("alt.json");
        std::fs::write(&path, mesh.to_string()).unwrap();
        path
    }

    fn config(dir: &Path, mesh: PathBuf, target: Option<PathBuf>) -> RunConfig {
        RunConfig {
            title: "test".to_string(),
            output_dir: dir.join("out"),
            cov_threshold: 3.0,
            transects: vec![TransectGroupConfig {
                name: "T1".to_string(),
                nodes: vec![vec![1, 2, 3], vec![1, 2], vec![2, 3]],
                target,
                runs: vec![
                    RunSpec {
                        name: "missing".to_string(),
                        mesh: dir.join("does_not_exist.json"),
                    },
                    RunSpec {
                        name: "alt".to_string(),
                        mesh,
                    },
                ],
                segments: Vec::new(),
                seasons: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_failed_run_does_not_stop_the_group() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = write_mesh(dir.path());
        let config = config(dir.path(), mesh, None);
        let outputs = OutputSelection {
            reports: Some("yearly-totals".to_string()),
            ..Default::default()
        };
        let outcome = Pipeline::new(&config, &outputs).unwrap().run().unwrap();

        assert_eq!(outcome.runs_processed, 1);
        assert_eq!(outcome.transects_processed, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].contains("missing"));

        let out = dir.path().join("out");
        assert!(out.join("T1_alt_1_2_3_yearly_totals.csv").exists());
        let monthly = std::fs::read_to_string(out.join("T1_alt_monthly.csv")).unwrap();
        assert!(monthly.contains("1_2_3,10560.0,2000,11,90.0"));
        assert!(monthly.contains("2_3,5280.0,2001,10,62.0"));
    }

    #[test]
    fn test_run_compared_with_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = write_mesh(dir.path());

        let baseline = config(dir.path(), mesh.clone(), None);
        Pipeline::new(&baseline, &OutputSelection::default())
            .unwrap()
            .run()
            .unwrap();
        let target = dir.path().join("out").join("T1_alt_monthly.csv");

        let config = config(dir.path(), mesh, Some(target));
        let outputs = OutputSelection {
            continuity: true,
            timing: true,
            label: Some("CMP".to_string()),
            ..Default::default()
        };
        let outcome = Pipeline::new(&config, &outputs).unwrap().run().unwrap();
        assert_eq!(outcome.runs_processed, 1);

        let out = dir.path().join("out");
        let continuity = std::fs::read_to_string(out.join("CMP_alt_continuity.csv")).unwrap();
        assert!(continuity.starts_with("Date,1_2_3,1_2,2_3,Mean,Std-Dev,COV,COV*100,Diff"));
        assert!(continuity.contains("Deviation Sum,0.0000"));
        assert!(continuity.contains("Row Count,12"));
        assert!(continuity.contains("Index Score,3.0000"));

        let timing = std::fs::read_to_string(out.join("CMP_alt_1_2_timing.csv")).unwrap();
        let lines: Vec<&str> = timing.lines().collect();
        assert!(lines[1].starts_with("2001,0.0000"));
        assert!(lines[1].ends_with(",1.0000"));
    }

    #[test]
    fn test_failed_transect_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = write_mesh(dir.path());
        let config = config(dir.path(), mesh, None);
        // a directory in place of the report file makes that write fail
        std::fs::create_dir_all(config.output_dir.join("T1_alt_1_2_yearly_totals.csv")).unwrap();
        let outputs = OutputSelection {
            reports: Some("yearly-totals".to_string()),
            ..Default::default()
        };
        let outcome = Pipeline::new(&config, &outputs).unwrap().run().unwrap();

        assert_eq!(outcome.runs_processed, 1);
        assert_eq!(outcome.transects_processed, 2);
        assert!(outcome
            .failures
            .iter()
            .any(|failure| failure.contains("T1_alt: transect 1_2:")));

        let out = dir.path().join("out");
        assert!(out.join("T1_alt_1_2_3_yearly_totals.csv").is_file());
        assert!(out.join("T1_alt_2_3_yearly_totals.csv").is_file());
        let monthly = std::fs::read_to_string(out.join("T1_alt_monthly.csv")).unwrap();
        assert!(monthly.contains("2_3,5280.0,2001,10,62.0"));
        assert!(!monthly.lines().any(|line| line.starts_with("1_2,")));
    }

    #[test]
    fn test_cancel_flag_stops_processing() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = write_mesh(dir.path());
        let config = config(dir.path(), mesh, None);
        let outputs = OutputSelection::default();
        let flag = AtomicBool::new(true);
        let outcome = Pipeline::new(&config, &outputs)
            .unwrap()
            .with_cancel_flag(&flag)
            .run()
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.runs_processed, 0);
        assert!(outcome.files.is_empty());
    }
}
