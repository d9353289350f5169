//! Lookup tables over the flow-edge endpoint table.
//!
//! Edges are split three ways by their endpoints:
//! - interior edges, keyed by `(from, to)`
//! - edges leaving the model (`to` is external), keyed by `from`
//! - edges entering the model (`from` is external), keyed by `to`

use crate::source::FlowSource;
use crate::{CANAL_MAXIMUM, CANAL_MINIMUM, EXTERNAL_CELL_ID_MINIMUM};
use std::collections::HashMap;

/// Returns true if the waterbody id denotes a boundary (outside the model).
pub fn is_external(id: i64) -> bool {
    id >= EXTERNAL_CELL_ID_MINIMUM
}

/// Returns true if the waterbody id lies in the canal identifier range.
pub fn is_canal(id: i64) -> bool {
    (CANAL_MINIMUM..=CANAL_MAXIMUM).contains(&id)
}

#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    interior: HashMap<(i64, i64), Vec<usize>>,
    external_left: HashMap<i64, Vec<usize>>,
    external_right: HashMap<i64, Vec<usize>>,
}

impl EdgeIndex {
    /// Index every edge of `source` by its position in the edge table.
    /// An edge the source cannot describe is left out without shifting
    /// the indices of the edges after it.
    pub fn build<S: FlowSource + ?Sized>(source: &S) -> Self {
        let mut index = EdgeIndex::default();
        for edge in 0..source.edge_count() {
            if let Some((from, to)) = source.edge_endpoints(edge) {
                index.insert(edge, from, to);
            }
        }
        index
    }

    /// Build from endpoint pairs; the position in the iterator is the edge index.
    pub fn from_endpoints<I>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut index = EdgeIndex::default();
        for (edge, (from, to)) in endpoints.into_iter().enumerate() {
            index.insert(edge, from, to);
        }
        index
    }

    fn insert(&mut self, edge: usize, from: i64, to: i64) {
        if is_external(from) {
            if !is_external(to) {
                self.external_right.entry(to).or_default().push(edge);
            }
        } else if is_external(to) {
            self.external_left.entry(from).or_default().push(edge);
        } else {
            self.interior.entry((from, to)).or_default().push(edge);
        }
    }

    /// Interior edges flowing from `from` to `to`.
    pub fn interior(&self, from: i64, to: i64) -> Option<&[usize]> {
        self.interior.get(&(from, to)).map(Vec::as_slice)
    }

    /// Edges from `id` out across the model boundary.
    pub fn external_left(&self, id: i64) -> Option<&[usize]> {
        self.external_left.get(&id).map(Vec::as_slice)
    }

    /// Edges from across the model boundary into `id`.
    pub fn external_right(&self, id: i64) -> Option<&[usize]> {
        self.external_right.get(&id).map(Vec::as_slice)
    }

    /// Interior endpoint pairs touching `left` or `right` whose other
    /// endpoint is a canal, sorted.
    pub fn canal_adjacent(&self, left: i64, right: i64) -> Vec<(i64, i64)> {
        let mut keys: Vec<(i64, i64)> = self
            .interior
            .keys()
            .copied()
            .filter(|&(a, b)| {
                let other = if a == left || a == right {
                    b
                } else if b == left || b == right {
                    a
                } else {
                    return false;
                };
                is_canal(other)
            })
            .collect();
        keys.sort_unstable();
        keys
    }
}
