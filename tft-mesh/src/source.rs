use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};

/// Planar state-plane coordinate of a mesh node (easting, northing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One triangle of the mesh and the waterbody id that owns it.
///
/// Node ids are zero based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshCell {
    pub nodes: [usize; 3],
    pub waterbody: i64,
}

impl MeshCell {
    /// Directed edges in winding order, closing back on the first node.
    pub fn directed_edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.nodes;
        [(a, b), (b, c), (c, a)]
    }

    pub fn has_directed_edge(&self, from: usize, to: usize) -> bool {
        self.directed_edges().contains(&(from, to))
    }
}

/// A directed flow connection ("watermover") between two waterbodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: i64,
    pub to: i64,
    pub kind: String,
    pub name: String,
}

/// Read-only access to a water budget simulation: mesh geometry, the
/// flow-edge tables and the per-timestep volume table.
///
/// Implementations are opened once per run and shared immutably across all
/// transects of that run.
pub trait FlowSource {
    /// Coordinate of a zero-based mesh node, if known.
    fn coordinate(&self, node: usize) -> Option<Point>;

    /// False when the source carries no node coordinates at all.
    fn has_coordinates(&self) -> bool;

    fn cells(&self) -> &[MeshCell];

    fn edge_count(&self) -> usize;

    fn edge(&self, edge: usize) -> Option<&FlowEdge>;

    fn edge_endpoints(&self, edge: usize) -> Option<(i64, i64)> {
        self.edge(edge).map(|e| (e.from, e.to))
    }

    fn edge_kind(&self, edge: usize) -> Option<&str> {
        self.edge(edge).map(|e| e.kind.as_str())
    }

    fn edge_name(&self, edge: usize) -> Option<&str> {
        self.edge(edge).map(|e| e.name.as_str())
    }

    /// Volumes of every flow edge at one timestep, indexed by edge.
    fn volumes_at(&self, timestep: usize) -> Option<&[f64]>;

    fn volume(&self, timestep: usize, edge: usize) -> Option<f64> {
        self.volumes_at(timestep)?.get(edge).copied()
    }

    fn has_volumes(&self) -> bool;

    fn volume_units(&self) -> &str;

    fn timeline(&self) -> &Timeline;
}

/// Waterbody owning the directed node pair `(from, to)`, searching the
/// triangulation in order.
pub fn waterbody_for(cells: &[MeshCell], from: usize, to: usize) -> Option<i64> {
    cells
        .iter()
        .find(|cell| cell.has_directed_edge(from, to))
        .map(|cell| cell.waterbody)
}
