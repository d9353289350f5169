use crate::error::{MeshError, MeshResult};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tft_utils::dates::{format_date, format_timestamp, parse_time_units};

/// The time axis of a simulation: a base time plus whole-day offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    base: NaiveDateTime,
    offsets: Vec<i64>,
}

impl Timeline {
    pub fn new(base: NaiveDateTime, offsets: Vec<i64>) -> Self {
        Self { base, offsets }
    }

    /// Build a timeline from a unit string like `"days since 1965-01-01 24:00:00"`
    /// and raw offsets in days. Fractional days are truncated; a NaN or
    /// infinite offset is rejected.
    pub fn from_units(units: &str, offsets: &[f64]) -> MeshResult<Self> {
        let base = parse_time_units(units).map_err(|e| MeshError::InvalidTimeUnits {
            units: units.to_string(),
            reason: e.to_string(),
        })?;
        if let Some((index, days)) = offsets.iter().enumerate().find(|(_, days)| !days.is_finite()) {
            return Err(MeshError::Shape {
                what: format!("timestamp {index} is not a finite day offset ({days})"),
            });
        }
        let offsets = offsets.iter().map(|days| days.trunc() as i64).collect();
        Ok(Self::new(base, offsets))
    }

    /// A daily timeline covering `start` through `end` inclusive.
    pub fn daily(start: NaiveDate, end: NaiveDate) -> Self {
        let days = (end - start).num_days().max(-1);
        Self::new(start.and_time(Default::default()), (0..=days).collect())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn datetime(&self, index: usize) -> Option<NaiveDateTime> {
        let days = *self.offsets.get(index)?;
        self.base.checked_add_signed(TimeDelta::try_days(days)?)
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.datetime(index).map(|timestamp| timestamp.date())
    }

    /// Timestamp label of one step, "MM/DD/YYYY HH:MM:SS".
    pub fn timestamp(&self, index: usize) -> Option<String> {
        self.datetime(index).map(|timestamp| format_timestamp(&timestamp))
    }

    pub fn start_date(&self) -> Option<String> {
        self.date(0).map(|date| format_date(&date))
    }

    pub fn end_date(&self) -> Option<String> {
        self.len()
            .checked_sub(1)
            .and_then(|last| self.date(last))
            .map(|date| format_date(&date))
    }
}
