use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Flow-edge category, derived from the edge type table.
///
/// Equality, hashing and ordering all follow [`FlowCategory::as_str`], so
/// categories sort lexicographically by their type name.
#[derive(Debug, Clone)]
pub enum FlowCategory {
    DarcyCircle,
    ManningCircle,
    MarshToDry,
    MarshToSeg,
    DryToSeg,
    Other(String),
}

impl FlowCategory {
    pub fn from_kind(kind: &str) -> Self {
        match kind.trim() {
            "DarcyCircle" => FlowCategory::DarcyCircle,
            "ManningCircle" => FlowCategory::ManningCircle,
            "LevSeepMarshToDryMover" => FlowCategory::MarshToDry,
            "LevSeepMarshToSegMover" => FlowCategory::MarshToSeg,
            "LevSeepDryToSegMover" => FlowCategory::DryToSeg,
            other => FlowCategory::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FlowCategory::DarcyCircle => "DarcyCircle",
            FlowCategory::ManningCircle => "ManningCircle",
            FlowCategory::MarshToDry => "LevSeepMarshToDryMover",
            FlowCategory::MarshToSeg => "LevSeepMarshToSegMover",
            FlowCategory::DryToSeg => "LevSeepDryToSegMover",
            FlowCategory::Other(kind) => kind,
        }
    }

    /// Fixed column order of the seepage report layout.
    pub fn seepage_columns() -> Vec<FlowCategory> {
        vec![
            FlowCategory::DarcyCircle,
            FlowCategory::ManningCircle,
            FlowCategory::MarshToDry,
            FlowCategory::MarshToSeg,
            FlowCategory::DryToSeg,
        ]
    }

    /// Column label; the manning-circle column is marked when segment
    /// volumes are folded into it.
    pub fn label(&self, with_segments: bool) -> String {
        match self {
            FlowCategory::ManningCircle if with_segments => format!("{}+Segment", self.as_str()),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for FlowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for FlowCategory {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for FlowCategory {}

impl Hash for FlowCategory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for FlowCategory {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlowCategory {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Serialize for FlowCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
