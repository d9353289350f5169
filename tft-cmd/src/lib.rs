//! Command implementations for the transect flow tool CLI.
//!
//! Provides subcommands to process a run configuration (reports,
//! continuity and timing against a target) and to validate one.

use anyhow::bail;
use clap::{Args, Subcommand};
use log::{error, info, warn};
use tft_data::ReportKind;

pub mod config;
pub mod output;
pub mod pipeline;
pub mod target;

/// Which outputs a run produces.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputSelection {
    /// Write continuity (COV) tables against each group's target
    #[arg(short = 'C', long)]
    pub continuity: bool,

    /// Write water-year timing tables against each group's target
    #[arg(short = 'T', long)]
    pub timing: bool,

    /// Comma separated report kinds, e.g. "daily,monthly-totals"
    #[arg(short = 'r', long)]
    pub reports: Option<String>,

    /// Write every report kind
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Use the fixed seepage column layout in reports
    #[arg(short = 's', long)]
    pub seepage: bool,

    /// Write the per-timestep inflow/outflow series
    #[arg(short = 't', long)]
    pub time_series: bool,

    /// Prefix output file names with this label instead of the group name
    #[arg(short = 'l', long)]
    pub label: Option<String>,
}

impl OutputSelection {
    pub fn report_kinds(&self) -> anyhow::Result<Vec<ReportKind>> {
        let mut kinds = if self.all {
            ReportKind::ALL.to_vec()
        } else {
            match &self.reports {
                Some(list) => ReportKind::parse_list(list)?,
                None => Vec::new(),
            }
        };
        if self.time_series {
            kinds.push(ReportKind::TimeSeries);
        }
        kinds.sort();
        kinds.dedup();
        Ok(kinds)
    }

    pub fn needs_target(&self) -> bool {
        self.continuity || self.timing
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every transect group of a run configuration
    Run {
        /// Path to the JSON run configuration
        #[arg(short = 'c', long)]
        config: String,

        #[command(flatten)]
        outputs: OutputSelection,
    },

    /// Validate a run configuration without processing it
    Check {
        /// Path to the JSON run configuration
        #[arg(short = 'c', long)]
        config: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    ReportKind::validate_table()?;
    match command {
        Command::Run { config, outputs } => {
            let config = config::RunConfig::load(&config)?;
            let outcome = pipeline::Pipeline::new(&config, &outputs)?.run()?;
            info!(
                "Processed {} runs and {} transects, wrote {} files",
                outcome.runs_processed,
                outcome.transects_processed,
                outcome.files.len()
            );
            if !outcome.warnings.is_empty() {
                warn!("{} warnings", outcome.warnings.len());
            }
            for failure in &outcome.failures {
                error!("{failure}");
            }
            if outcome.runs_processed == 0 && !outcome.failures.is_empty() {
                bail!("No run could be processed");
            }
            Ok(())
        }
        Command::Check { config } => {
            let config = config::RunConfig::load(&config)?;
            for group in &config.transects {
                info!(
                    "{}: {} transects, {} runs, target {}",
                    group.name,
                    group.nodes.len(),
                    group.runs.len(),
                    group
                        .target
                        .as_ref()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
            }
            info!("Configuration OK");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_kinds() {
        let outputs = OutputSelection {
            reports: Some("yearly-totals, daily".to_string()),
            time_series: true,
            ..Default::default()
        };
        assert_eq!(
            outputs.report_kinds().unwrap(),
            vec![ReportKind::TimeSeries, ReportKind::Daily, ReportKind::YearlyTotals]
        );

        let all = OutputSelection {
            all: true,
            time_series: true,
            ..Default::default()
        };
        assert_eq!(all.report_kinds().unwrap().len(), ReportKind::ALL.len());

        let bad = OutputSelection {
            reports: Some("weekly".to_string()),
            ..Default::default()
        };
        assert!(bad.report_kinds().is_err());
        assert!(!bad.needs_target());
    }
}
