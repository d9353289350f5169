use crate::error::{MeshError, MeshResult};
use crate::source::{waterbody_for, FlowSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One segment of a transect between two zero-based mesh nodes.
///
/// Flow from `left` to `right` counts as inflow for the transect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wall {
    pub left: usize,
    pub right: usize,
}

impl Wall {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    pub fn reversed(&self) -> Wall {
        Wall::new(self.right, self.left)
    }

    /// Distance between the wall endpoints.
    ///
    /// Zero when either node has no coordinate, or when the wall is not an
    /// edge of the triangulation in both directions.
    pub fn distance<S: FlowSource + ?Sized>(&self, source: &S) -> f64 {
        let cells = source.cells();
        if waterbody_for(cells, self.left, self.right).is_none()
            || waterbody_for(cells, self.right, self.left).is_none()
        {
            return 0.0;
        }
        match (source.coordinate(self.left), source.coordinate(self.right)) {
            (Some(a), Some(b)) => a.distance_to(&b),
            _ => 0.0,
        }
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.left + 1, self.right + 1)
    }
}

/// An ordered list of at least two zero-based mesh nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transect {
    nodes: Vec<usize>,
}

impl Transect {
    pub fn new(nodes: Vec<usize>) -> MeshResult<Self> {
        if nodes.len() < 2 {
            return Err(MeshError::InvalidTransect {
                what: format!("needs at least 2 nodes, got {}", nodes.len()),
            });
        }
        Ok(Self { nodes })
    }

    /// Build from the one-based node ids used in configuration files.
    pub fn from_one_based(ids: &[u32]) -> MeshResult<Self> {
        let nodes = ids
            .iter()
            .map(|&id| {
                id.checked_sub(1)
                    .map(|node| node as usize)
                    .ok_or_else(|| MeshError::InvalidTransect {
                        what: "node ids are one based; found 0".to_string(),
                    })
            })
            .collect::<MeshResult<Vec<usize>>>()?;
        Self::new(nodes)
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn one_based_nodes(&self) -> Vec<usize> {
        self.nodes.iter().map(|node| node + 1).collect()
    }

    pub fn walls(&self) -> Vec<Wall> {
        self.nodes
            .windows(2)
            .map(|pair| Wall::new(pair[0], pair[1]))
            .collect()
    }

    /// One-based node ids joined by underscores, e.g. "12_13_14".
    pub fn label(&self) -> String {
        self.one_based_nodes()
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// A parent transect spans several walls; a child is a single wall.
    pub fn is_parent(&self) -> bool {
        self.nodes.len() > 2
    }

    /// Per-wall distances in wall order.
    pub fn wall_distances<S: FlowSource + ?Sized>(&self, source: &S) -> Vec<f64> {
        self.walls().iter().map(|wall| wall.distance(source)).collect()
    }

    pub fn distance<S: FlowSource + ?Sized>(&self, source: &S) -> f64 {
        self.wall_distances(source).iter().sum()
    }
}

impl fmt::Display for Transect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
