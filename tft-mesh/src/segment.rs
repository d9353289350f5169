use crate::edge_index::EdgeIndex;
use crate::error::{MeshError, MeshResult};
use crate::transect::{Transect, Wall};
use serde::{Deserialize, Serialize};

/// Routes the flow between a waterbody pair onto one transect wall.
///
/// The edges found for `waterbody` are folded into the manning-circle
/// volume of any transect that contains `wall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOverride {
    pub wall: Wall,
    pub waterbody: (i64, i64),
}

impl SegmentOverride {
    /// Build from a one-based node pair as written in configuration files.
    pub fn from_one_based(wall: [u32; 2], waterbody: [i64; 2]) -> MeshResult<Self> {
        let [left, right] = wall;
        if left == 0 || right == 0 {
            return Err(MeshError::InvalidSegment {
                what: format!("wall ({left} {right}) uses a zero node id"),
            });
        }
        Ok(Self {
            wall: Wall::new(left as usize - 1, right as usize - 1),
            waterbody: (waterbody[0], waterbody[1]),
        })
    }

    /// Parse `"node node waterbody waterbody"`, separated by whitespace or commas.
    pub fn parse(line: &str) -> MeshResult<Self> {
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() != 4 {
            return Err(MeshError::InvalidSegment {
                what: format!("expected 4 fields, found {} in '{line}'", fields.len()),
            });
        }
        let invalid = |field: &str| MeshError::InvalidSegment {
            what: format!("'{field}' is not an integer in '{line}'"),
        };
        let left = fields[0].parse::<u32>().map_err(|_| invalid(fields[0]))?;
        let right = fields[1].parse::<u32>().map_err(|_| invalid(fields[1]))?;
        let from = fields[2].parse::<i64>().map_err(|_| invalid(fields[2]))?;
        let to = fields[3].parse::<i64>().map_err(|_| invalid(fields[3]))?;
        Self::from_one_based([left, right], [from, to])
    }
}

/// Segment edges that apply to a transect, and the applicable overrides
/// whose waterbody pair has no interior edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentMatch {
    pub edges: Vec<usize>,
    pub missing: Vec<SegmentOverride>,
}

pub fn match_segments(
    overrides: &[SegmentOverride],
    transect: &Transect,
    index: &EdgeIndex,
) -> SegmentMatch {
    let walls = transect.walls();
    let mut found = SegmentMatch::default();
    for segment in overrides.iter().filter(|s| walls.contains(&s.wall)) {
        let (from, to) = segment.waterbody;
        match index.interior(from, to) {
            Some(edges) => found.edges.extend_from_slice(edges),
            None => found.missing.push(*segment),
        }
    }
    found.edges.sort_unstable();
    found.edges.dedup();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let segment = SegmentOverride::parse("12 13, 30 40").unwrap();
        assert_eq!(segment.wall, Wall::new(11, 12));
        assert_eq!(segment.waterbody, (30, 40));
        assert!(SegmentOverride::parse("12 13 30").is_err());
        assert!(SegmentOverride::parse("12 x 30 40").is_err());
        assert!(SegmentOverride::parse("0 1 30 40").is_err());
    }

    #[test]
    fn test_match_segments() {
        let index = EdgeIndex::from_endpoints(vec![(10, 20), (30, 40), (30, 40)]);
        let transect = Transect::from_one_based(&[1, 2, 3]).unwrap();
        let overrides = vec![
            SegmentOverride::from_one_based([1, 2], [30, 40]).unwrap(),
            SegmentOverride::from_one_based([2, 3], [50, 60]).unwrap(),
            // not a wall of the transect
            SegmentOverride::from_one_based([3, 4], [10, 20]).unwrap(),
        ];
        let found = match_segments(&overrides, &transect, &index);
        assert_eq!(found.edges, vec![1, 2]);
        assert_eq!(found.missing, vec![overrides[1]]);
    }

    #[test]
    fn test_reversed_wall_does_not_match() {
        let index = EdgeIndex::from_endpoints(vec![(30, 40)]);
        let transect = Transect::from_one_based(&[2, 1]).unwrap();
        let overrides = vec![SegmentOverride::from_one_based([1, 2], [30, 40]).unwrap()];
        assert_eq!(match_segments(&overrides, &transect, &index), SegmentMatch::default());
    }
}
