//! Mesh geometry, flow-edge tables and the wall resolver that maps a
//! transect onto the flow edges crossing it.

pub mod category;
pub mod edge_index;
pub mod error;
pub mod mesh_data;
pub mod resolver;
pub mod segment;
pub mod source;
pub mod timeline;
pub mod transect;

/// Waterbody ids at or above this value lie outside the model.
pub const EXTERNAL_CELL_ID_MINIMUM: i64 = 500_000_000;

/// Inclusive waterbody id range reserved for canals.
pub const CANAL_MINIMUM: i64 = 300_000;
pub const CANAL_MAXIMUM: i64 = 399_999;

pub use category::FlowCategory;
pub use edge_index::EdgeIndex;
pub use error::{MeshError, MeshResult};
pub use mesh_data::{MeshData, MeshRecord};
pub use resolver::{CategoryBucket, EdgeSet, ResolvedTransect, WallResolution, WallResolver};
pub use segment::SegmentOverride;
pub use source::{FlowEdge, FlowSource, MeshCell, Point};
pub use timeline::Timeline;
pub use transect::{Transect, Wall};
