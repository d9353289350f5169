//! Folds the volume table of a flow source into the time buckets of one
//! resolved transect.

use crate::error::{DataError, DataResult};
use crate::hierarchy::TimeBuckets;
use crate::season::SeasonRange;
use std::time::Instant;
use tft_mesh::{EdgeSet, FlowCategory, FlowSource, MeshError, ResolvedTransect};
use tft_utils::progress::{format_elapsed, ProgressThrottle};

/// Receives the in/out/net volume of every category at every timestep.
pub trait TimestepSink {
    fn record(
        &mut self,
        timestamp: &str,
        category: &FlowCategory,
        inflow: f64,
        outflow: f64,
        net: f64,
    ) -> DataResult<()>;
}

/// In-memory sink, mostly useful for tests and small runs.
impl TimestepSink for Vec<(String, FlowCategory, f64, f64, f64)> {
    fn record(
        &mut self,
        timestamp: &str,
        category: &FlowCategory,
        inflow: f64,
        outflow: f64,
        net: f64,
    ) -> DataResult<()> {
        self.push((timestamp.to_string(), category.clone(), inflow, outflow, net));
        Ok(())
    }
}

pub struct Aggregator<'a, S: FlowSource + ?Sized> {
    source: &'a S,
    seasons: Vec<SeasonRange>,
    progress: bool,
}

impl<'a, S: FlowSource + ?Sized> Aggregator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            seasons: Vec::new(),
            progress: true,
        }
    }

    pub fn with_seasons(mut self, seasons: &[SeasonRange]) -> Self {
        self.seasons = seasons.to_vec();
        self
    }

    /// Disable progress logging.
    pub fn quiet(mut self) -> Self {
        self.progress = false;
        self
    }

    pub fn aggregate(&self, resolved: &ResolvedTransect) -> DataResult<TimeBuckets> {
        self.run(resolved, None)
    }

    pub fn aggregate_with_sink(
        &self,
        resolved: &ResolvedTransect,
        sink: &mut dyn TimestepSink,
    ) -> DataResult<TimeBuckets> {
        self.run(resolved, Some(sink))
    }

    fn run(
        &self,
        resolved: &ResolvedTransect,
        mut sink: Option<&mut dyn TimestepSink>,
    ) -> DataResult<TimeBuckets> {
        let row_len = match self.source.volumes_at(0) {
            Some(row) if self.source.has_volumes() => row.len(),
            _ => return Err(DataError::EmptyVolumeTable),
        };
        let max_edge = resolved
            .bucket
            .max_edge()
            .into_iter()
            .chain(resolved.segment_edges.iter().copied())
            .max();
        if let Some(edge) = max_edge.filter(|&edge| edge >= row_len) {
            return Err(MeshError::EdgeOutOfRange {
                what: "transect edge list",
                index: edge,
                len: row_len,
            }
            .into());
        }

        let columns = self.columns(resolved);
        let mut buckets = TimeBuckets::new(
            columns.iter().map(|(category, _)| category.clone()).collect(),
            &self.seasons,
        );
        buckets.with_segments = resolved.has_segments();

        let timeline = self.source.timeline();
        let len = timeline.len();
        let label = resolved.transect.label();
        let started = Instant::now();
        let mut throttle = ProgressThrottle::default();
        let mut nets = Vec::with_capacity(columns.len());

        for step in 0..len {
            let out_of_range = || MeshError::TimestepOutOfRange { index: step, len };
            let date = timeline.date(step).ok_or_else(out_of_range)?;
            let volumes = self.source.volumes_at(step).ok_or_else(out_of_range)?;

            nets.clear();
            for (category, set) in &columns {
                let inflow = sum(volumes, &set.inflow);
                let outflow = sum(volumes, &set.outflow);
                // segment edges count toward the net only
                let net = inflow - outflow + self.segment_volume(resolved, category, volumes);
                if let Some(sink) = sink.as_deref_mut() {
                    let timestamp = timeline.timestamp(step).unwrap_or_default();
                    sink.record(&timestamp, category, inflow, outflow, net)?;
                }
                nets.push((category.clone(), net));
            }
            buckets.record(date, &nets);

            if self.progress && throttle.should_emit(step, len) {
                log::info!(
                    "transect {label}: timestep {} of {len} ({}), elapsed {}",
                    step + 1,
                    timeline.timestamp(step).unwrap_or_default(),
                    format_elapsed(started.elapsed())
                );
            }
        }
        Ok(buckets)
    }

    /// Categories of the transect in name order. Segment edges add a
    /// manning-circle column when the transect has none of its own.
    fn columns(&self, resolved: &ResolvedTransect) -> Vec<(FlowCategory, EdgeSet)> {
        let mut columns: Vec<(FlowCategory, EdgeSet)> = resolved
            .bucket
            .categories()
            .map(|(category, set)| (category.clone(), set.clone()))
            .collect();
        if resolved.has_segments()
            && !columns
                .iter()
                .any(|(category, _)| *category == FlowCategory::ManningCircle)
        {
            columns.push((FlowCategory::ManningCircle, EdgeSet::default()));
            columns.sort_by(|a, b| a.0.cmp(&b.0));
        }
        columns
    }

    fn segment_volume(&self, resolved: &ResolvedTransect, category: &FlowCategory, volumes: &[f64]) -> f64 {
        if *category == FlowCategory::ManningCircle {
            sum(volumes, &resolved.segment_edges)
        } else {
            0.0
        }
    }
}

fn sum(volumes: &[f64], edges: &[usize]) -> f64 {
    edges.iter().filter_map(|&edge| volumes.get(edge)).sum()
}
