//! Temporal aggregation of transect flows and the statistics built on it.

pub mod aggregate;
pub mod continuity;
pub mod error;
pub mod hierarchy;
pub mod report;
pub mod season;
pub mod stats;
pub mod timing;

pub use aggregate::{Aggregator, TimestepSink};
pub use continuity::{ContinuityTable, CovStats, DeviationScore, TransectSeries, DEFAULT_COV_THRESHOLD};
pub use error::{DataError, DataResult};
pub use hierarchy::{MonthlyTotal, Series, TimeBuckets};
pub use report::{summarize, ReportKind, SummaryRow};
pub use season::SeasonRange;
pub use timing::{TimingSummary, TimingTable};
