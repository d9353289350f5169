//! Maps each wall of a transect onto the flow edges that cross it.

use crate::category::FlowCategory;
use crate::edge_index::EdgeIndex;
use crate::segment::{match_segments, SegmentOverride};
use crate::source::{waterbody_for, FlowSource};
use crate::transect::{Transect, Wall};
use std::collections::{BTreeMap, BTreeSet};

/// Edge indices whose volume is added (`inflow`) or subtracted (`outflow`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    pub inflow: Vec<usize>,
    pub outflow: Vec<usize>,
}

impl EdgeSet {
    /// Net volume of this set for one row of the volume table.
    /// Indices outside the row count as zero.
    pub fn net(&self, volumes: &[f64]) -> f64 {
        let sum = |edges: &[usize]| -> f64 {
            edges
                .iter()
                .filter_map(|&edge| volumes.get(edge))
                .sum()
        };
        sum(&self.inflow) - sum(&self.outflow)
    }

    pub fn is_empty(&self) -> bool {
        self.inflow.is_empty() && self.outflow.is_empty()
    }
}

/// Per-category in/out edges of a transect, plus the names of every edge
/// that was assigned.
#[derive(Debug, Clone, Default)]
pub struct CategoryBucket {
    categories: BTreeMap<FlowCategory, EdgeSet>,
    names: BTreeSet<String>,
}

impl CategoryBucket {
    pub fn add_in(&mut self, category: FlowCategory, edge: usize, name: &str) {
        self.categories.entry(category).or_default().inflow.push(edge);
        self.names.insert(name.to_string());
    }

    pub fn add_out(&mut self, category: FlowCategory, edge: usize, name: &str) {
        self.categories.entry(category).or_default().outflow.push(edge);
        self.names.insert(name.to_string());
    }

    pub fn get(&self, category: &FlowCategory) -> Option<&EdgeSet> {
        self.categories.get(category)
    }

    /// Categories in lexicographic order.
    pub fn categories(&self) -> impl Iterator<Item = (&FlowCategory, &EdgeSet)> {
        self.categories.iter()
    }

    pub fn edge_names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Largest edge index referenced by any category.
    pub fn max_edge(&self) -> Option<usize> {
        self.categories
            .values()
            .flat_map(|set| set.inflow.iter().chain(set.outflow.iter()))
            .copied()
            .max()
    }
}

/// How a single wall mapped onto waterbodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallResolution {
    /// Both sides are model waterbodies.
    Interior { left: i64, right: i64 },
    /// Only one side is inside the triangulation.
    Boundary {
        left: Option<i64>,
        right: Option<i64>,
    },
    /// Neither direction of the wall is a triangle edge.
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct ResolvedTransect {
    pub transect: Transect,
    pub bucket: CategoryBucket,
    pub walls: Vec<(Wall, WallResolution)>,
    pub distances: Vec<f64>,
    /// Edges added to the manning-circle volume by segment overrides.
    pub segment_edges: Vec<usize>,
    /// Overrides on this transect whose waterbody pair has no edge.
    pub missing_segments: Vec<SegmentOverride>,
}

impl ResolvedTransect {
    pub fn distance(&self) -> f64 {
        self.distances.iter().sum()
    }

    pub fn unresolved_walls(&self) -> Vec<Wall> {
        self.walls
            .iter()
            .filter(|(_, resolution)| *resolution == WallResolution::Unresolved)
            .map(|(wall, _)| *wall)
            .collect()
    }

    pub fn has_segments(&self) -> bool {
        !self.segment_edges.is_empty()
    }
}

/// Resolves transects against one flow source. The edge index is built
/// once and reused for every transect of the run.
pub struct WallResolver<'a, S: FlowSource + ?Sized> {
    source: &'a S,
    index: EdgeIndex,
}

impl<'a, S: FlowSource + ?Sized> WallResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            index: EdgeIndex::build(source),
        }
    }

    pub fn index(&self) -> &EdgeIndex {
        &self.index
    }

    pub fn resolve(&self, transect: &Transect) -> ResolvedTransect {
        self.resolve_with_segments(transect, &[])
    }

    pub fn resolve_with_segments(
        &self,
        transect: &Transect,
        overrides: &[SegmentOverride],
    ) -> ResolvedTransect {
        let mut bucket = CategoryBucket::default();
        let walls = transect
            .walls()
            .into_iter()
            .map(|wall| (wall, self.resolve_wall(wall, &mut bucket)))
            .collect();
        let segments = match_segments(overrides, transect, &self.index);
        ResolvedTransect {
            transect: transect.clone(),
            bucket,
            walls,
            distances: transect.wall_distances(self.source),
            segment_edges: segments.edges,
            missing_segments: segments.missing,
        }
    }

    /// Assign the edges crossing `wall` into `bucket`.
    pub fn resolve_wall(&self, wall: Wall, bucket: &mut CategoryBucket) -> WallResolution {
        let cells = self.source.cells();
        let left = waterbody_for(cells, wall.left, wall.right);
        let right = waterbody_for(cells, wall.right, wall.left);
        match (left, right) {
            (Some(left), Some(right)) => {
                self.assign(self.index.interior(left, right), bucket, true);
                self.assign(self.index.interior(right, left), bucket, false);
                self.merge_seepage(left, right, bucket);
                WallResolution::Interior { left, right }
            }
            (None, None) => WallResolution::Unresolved,
            (left, right) => {
                if let Some(edges) = left.and_then(|id| self.index.external_left(id)) {
                    self.assign(Some(edges), bucket, true);
                } else if let Some(edges) = right.and_then(|id| self.index.external_right(id)) {
                    self.assign(Some(edges), bucket, false);
                }
                WallResolution::Boundary { left, right }
            }
        }
    }

    fn assign(&self, edges: Option<&[usize]>, bucket: &mut CategoryBucket, inflow: bool) {
        for &edge in edges.unwrap_or_default() {
            let Some(flow) = self.source.edge(edge) else {
                continue;
            };
            let category = FlowCategory::from_kind(&flow.kind);
            if inflow {
                bucket.add_in(category, edge, &flow.name);
            } else {
                bucket.add_out(category, edge, &flow.name);
            }
        }
    }

    /// Pair a marsh-to-segment edge with a dry-to-segment edge on opposite
    /// sides of the wall and book both as marsh-to-dry seepage.
    ///
    /// Candidate keys are visited in sorted order and the first matching
    /// edge per kind and side is kept, so the chosen pair does not depend
    /// on hash order.
    fn merge_seepage(&self, left: i64, right: i64, bucket: &mut CategoryBucket) {
        let mut m2s_left = None;
        let mut m2s_right = None;
        let mut d2s_left = None;
        let mut d2s_right = None;

        for (from, to) in self.index.canal_adjacent(left, right) {
            for &edge in self.index.interior(from, to).unwrap_or_default() {
                let Some(flow) = self.source.edge(edge) else {
                    continue;
                };
                let slot = match FlowCategory::from_kind(&flow.kind) {
                    FlowCategory::MarshToSeg if from == left => &mut m2s_left,
                    FlowCategory::MarshToSeg if from == right => &mut m2s_right,
                    FlowCategory::DryToSeg if from == left => &mut d2s_left,
                    FlowCategory::DryToSeg if from == right => &mut d2s_right,
                    _ => continue,
                };
                slot.get_or_insert(edge);
            }
        }

        let pair = match (m2s_left, d2s_right, m2s_right, d2s_left) {
            (Some(m2s), Some(d2s), _, _) => (m2s, d2s),
            (_, _, Some(m2s), Some(d2s)) => (m2s, d2s),
            _ => return,
        };
        let (Some(marsh), Some(dry)) = (self.source.edge(pair.0), self.source.edge(pair.1)) else {
            return;
        };
        if marsh.name.contains(&left.to_string()) {
            bucket.add_in(FlowCategory::MarshToDry, pair.0, &marsh.name);
            bucket.add_out(FlowCategory::MarshToDry, pair.1, &dry.name);
        } else {
            bucket.add_in(FlowCategory::MarshToDry, pair.1, &dry.name);
            bucket.add_out(FlowCategory::MarshToDry, pair.0, &marsh.name);
        }
    }
}
