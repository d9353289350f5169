//! In-memory water budget data, loadable from JSON.
//!
//! # JSON layout
//!
//! ```text
//! {
//!   "coordinates": { "0": { "x": 0.0, "y": 0.0 }, ... },
//!   "cells": [ { "nodes": [0, 1, 2], "waterbody": 10 }, ... ],
//!   "edges": [ { "from": 10, "to": 20, "kind": "ManningCircle", "name": "mc_10_20" }, ... ],
//!   "volume_units": "ft^3",
//!   "volumes": [ [1.0, 2.0, ...], ... ],
//!   "time_units": "days since 1965-01-01 24:00:00",
//!   "timestamps": [0.0, 1.0, ...]
//! }
//! ```
//!
//! Node ids are zero based. `volumes` has one row per timestamp and one
//! column per edge.

use crate::error::{MeshError, MeshResult};
use crate::source::{FlowEdge, FlowSource, MeshCell, Point};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serialized form of [`MeshData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord {
    #[serde(default)]
    pub coordinates: BTreeMap<usize, Point>,
    #[serde(default)]
    pub cells: Vec<MeshCell>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
    pub volume_units: String,
    #[serde(default)]
    pub volumes: Vec<Vec<f64>>,
    pub time_units: String,
    pub timestamps: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct MeshData {
    coordinates: BTreeMap<usize, Point>,
    cells: Vec<MeshCell>,
    edges: Vec<FlowEdge>,
    volume_units: String,
    volumes: Vec<Vec<f64>>,
    timeline: Timeline,
}

impl MeshData {
    /// Validate a record and build the data source from it.
    ///
    /// An empty volume table is accepted here; the aggregator rejects it
    /// when a transect is processed.
    pub fn from_record(record: MeshRecord) -> MeshResult<Self> {
        let timeline = Timeline::from_units(&record.time_units, &record.timestamps)?;
        if !record.volumes.is_empty() {
            if record.volumes.len() != timeline.len() {
                return Err(MeshError::Shape {
                    what: format!(
                        "{} volume rows for {} timestamps",
                        record.volumes.len(),
                        timeline.len()
                    ),
                });
            }
            if let Some((step, row)) = record
                .volumes
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != record.edges.len())
            {
                return Err(MeshError::Shape {
                    what: format!(
                        "volume row {step} has {} values for {} edges",
                        row.len(),
                        record.edges.len()
                    ),
                });
            }
        }
        Ok(Self {
            coordinates: record.coordinates,
            cells: record.cells,
            edges: record.edges,
            volume_units: record.volume_units,
            volumes: record.volumes,
            timeline,
        })
    }

    pub fn from_json_str(json: &str) -> MeshResult<Self> {
        let record: MeshRecord = serde_json::from_str(json)?;
        Self::from_record(record)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> MeshResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl FlowSource for MeshData {
    fn coordinate(&self, node: usize) -> Option<Point> {
        self.coordinates.get(&node).copied()
    }

    fn has_coordinates(&self) -> bool {
        !self.coordinates.is_empty()
    }

    fn cells(&self) -> &[MeshCell] {
        &self.cells
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge(&self, edge: usize) -> Option<&FlowEdge> {
        self.edges.get(edge)
    }

    fn volumes_at(&self, timestep: usize) -> Option<&[f64]> {
        self.volumes.get(timestep).map(Vec::as_slice)
    }

    fn has_volumes(&self) -> bool {
        !self.volumes.is_empty()
    }

    fn volume_units(&self) -> &str {
        &self.volume_units
    }

    fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn edge(from: i64, to: i64, kind: &str, name: &str) -> FlowEdge {
        FlowEdge {
            from,
            to,
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Two triangles sharing the wall 0-1:
    /// waterbody 10 owns (0,1), waterbody 20 owns (1,0).
    pub(crate) fn sample_record() -> MeshRecord {
        MeshRecord {
            coordinates: BTreeMap::from([
                (0, Point::new(0.0, 0.0)),
                (1, Point::new(3.0, 4.0)),
                (2, Point::new(6.0, 0.0)),
                (3, Point::new(-3.0, 4.0)),
            ]),
            cells: vec![
                MeshCell {
                    nodes: [0, 1, 2],
                    waterbody: 10,
                },
                MeshCell {
                    nodes: [1, 0, 3],
                    waterbody: 20,
                },
            ],
            edges: vec![
                edge(10, 20, "ManningCircle", "mc_10_20"),
                edge(10, 20, "DarcyCircle", "dc_10_20"),
                edge(20, 10, "ManningCircle", "mc_20_10"),
                edge(10, 600_000_000, "BoundaryFlow", "bnd_10"),
                edge(10, 300_001, "LevSeepMarshToSegMover", "m2s_10"),
                edge(20, 300_001, "LevSeepDryToSegMover", "d2s_20"),
                edge(30, 40, "ManningCircle", "seg_30_40"),
            ],
            volume_units: "ft^3".to_string(),
            volumes: vec![
                vec![10.0, 20.0, 5.0, 1.0, 2.0, 0.5, 100.0],
                vec![11.0, 21.0, 6.0, 1.0, 3.0, 1.5, 200.0],
            ],
            time_units: "days since 2001-01-15 00:00:00".to_string(),
            timestamps: vec![0.0, 1.0],
        }
    }

    pub(crate) fn sample_mesh() -> MeshData {
        MeshData::from_record(sample_record()).unwrap()
    }

    #[test]
    fn test_sample_mesh_accessors() {
        let mesh = sample_mesh();
        assert!(mesh.has_coordinates());
        assert!(mesh.has_volumes());
        assert_eq!(mesh.edge_count(), 7);
        assert_eq!(mesh.volume_units(), "ft^3");
        assert_eq!(mesh.volumes_at(1).unwrap()[6], 200.0);
        assert!(mesh.volumes_at(2).is_none());
        assert_eq!(mesh.timeline().timestamp(1).unwrap(), "01/16/2001 00:00:00");
        assert_eq!(mesh.coordinate(9), None);
    }

    #[test]
    fn test_rejects_ragged_volume_rows() {
        let mut record = sample_record();
        record.volumes[1].pop();
        assert!(matches!(
            MeshData::from_record(record),
            Err(MeshError::Shape { .. })
        ));
    }

    #[test]
    fn test_rejects_row_count_mismatch() {
        let mut record = sample_record();
        record.timestamps.push(2.0);
        assert!(MeshData::from_record(record).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        let mesh = MeshData::from_json_str(&json).unwrap();
        assert_eq!(mesh.cells().len(), 2);
        assert_eq!(mesh.edge(4).unwrap().name, "m2s_10");
    }

    #[test]
    fn test_missing_volumes_are_allowed_at_load() {
        let json = r#"{
            "volume_units": "ft^3",
            "time_units": "days since 2001-01-01 00:00:00",
            "timestamps": [0.0]
        }"#;
        let mesh = MeshData::from_json_str(json).unwrap();
        assert!(!mesh.has_volumes());
        assert!(!mesh.has_coordinates());
    }
}
