use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised while reading mesh data or building transects.
///
/// Resolution misses (a wall that matches no flow edge) are not errors;
/// they surface as [`crate::resolver::WallResolution::Unresolved`].
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Mesh data has no flow-edge volume table")]
    MissingVolumes,

    #[error("Invalid transect: {what}")]
    InvalidTransect { what: String },

    #[error("Timestep out of range (index={index}, len={len})")]
    TimestepOutOfRange { index: usize, len: usize },

    #[error("Flow edge out of range in {what} (index={index}, len={len})")]
    EdgeOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid time units '{units}': {reason}")]
    InvalidTimeUnits { units: String, reason: String },

    #[error("Malformed mesh data: {what}")]
    Shape { what: String },

    #[error("Invalid segment override: {what}")]
    InvalidSegment { what: String },

    #[error("Failed to parse mesh data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read mesh data: {0}")]
    Io(#[from] std::io::Error),
}
