use tft_mesh::MeshError;
use thiserror::Error;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Flow-edge volume table is missing or empty")]
    EmptyVolumeTable,

    #[error("Row count mismatch: target has {target} rows, alternative has {alternative}")]
    RowCountMismatch { target: usize, alternative: usize },

    #[error("Cannot reshape {values} monthly values into {months} months x {transects} transects")]
    StructureMismatch {
        values: usize,
        months: usize,
        transects: usize,
    },

    #[error("Transect '{label}' does not share the month axis of the first transect")]
    MonthAxisMismatch { label: String },

    #[error("Invalid calendar month {year}/{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Invalid season range {start_month}/{start_day}-{end_month}/{end_day}")]
    InvalidSeasonRange {
        start_month: u32,
        start_day: u32,
        end_month: u32,
        end_day: u32,
    },

    #[error("Transect '{label}' not found")]
    MissingTransect { label: String },

    #[error("Unknown report kind '{name}'")]
    UnknownReport { name: String },

    #[error("Report kinds {first} and {second} share the file suffix '{suffix}'")]
    DuplicateReportSuffix {
        first: String,
        second: String,
        suffix: &'static str,
    },

    #[error("Failed to record timestep: {0}")]
    Sink(String),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}
