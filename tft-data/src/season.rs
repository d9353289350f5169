use crate::error::{DataError, DataResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A day-of-year range, `start` through `end` inclusive.
///
/// A range whose end falls before its start (e.g. Nov 1 to Oct 31) wraps
/// across the calendar year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeasonRange {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl SeasonRange {
    pub fn new(start_month: u32, start_day: u32, end_month: u32, end_day: u32) -> DataResult<Self> {
        // leap year so that Feb 29 is accepted
        let valid = |month: u32, day: u32| NaiveDate::from_ymd_opt(2000, month, day).is_some();
        if !valid(start_month, start_day) || !valid(end_month, end_day) {
            return Err(DataError::InvalidSeasonRange {
                start_month,
                start_day,
                end_month,
                end_day,
            });
        }
        Ok(Self {
            start_month,
            start_day,
            end_month,
            end_day,
        })
    }

    /// From `[start_month, start_day, end_month, end_day]`.
    pub fn from_array(fields: [u32; 4]) -> DataResult<Self> {
        Self::new(fields[0], fields[1], fields[2], fields[3])
    }

    fn start(&self) -> (u32, u32) {
        (self.start_month, self.start_day)
    }

    fn end(&self) -> (u32, u32) {
        (self.end_month, self.end_day)
    }

    pub fn wraps(&self) -> bool {
        self.start() > self.end()
    }

    pub fn contains(&self, month: u32, day: u32) -> bool {
        let date = (month, day);
        if self.wraps() {
            date >= self.start() || date <= self.end()
        } else {
            self.start() <= date && date <= self.end()
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.month(), date.day())
    }

    /// Calendar year in which the occurrence of this range holding `date` starts.
    pub fn range_year(&self, date: NaiveDate) -> i32 {
        if self.wraps() && (date.month(), date.day()) < self.start() {
            date.year() - 1
        } else {
            date.year()
        }
    }

    /// Label of one occurrence, e.g. "2001/11/01-2002/10/31".
    pub fn label(&self, range_year: i32) -> String {
        let end_year = if self.wraps() { range_year + 1 } else { range_year };
        format!(
            "{range_year}/{:02}/{:02}-{end_year}/{:02}/{:02}",
            self.start_month, self.start_day, self.end_month, self.end_day
        )
    }
}

impl fmt::Display for SeasonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}-{:02}/{:02}",
            self.start_month, self.start_day, self.end_month, self.end_day
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_plain_range() {
        let spring = SeasonRange::new(3, 1, 5, 31).unwrap();
        assert!(!spring.wraps());
        assert!(spring.contains(3, 1));
        assert!(spring.contains(5, 31));
        assert!(!spring.contains(6, 1));
        assert!(!spring.contains(2, 28));
        assert_eq!(spring.range_year(date(2001, 4, 2)), 2001);
        assert_eq!(spring.label(2001), "2001/03/01-2001/05/31");
    }

    #[test]
    fn test_wrapping_range() {
        let wet = SeasonRange::new(11, 1, 10, 31).unwrap();
        assert!(wet.wraps());
        assert!(wet.contains(11, 15));
        assert!(wet.contains(1, 1));
        assert!(wet.contains(10, 31));

        let winter = SeasonRange::new(12, 1, 2, 28).unwrap();
        assert!(winter.contains(12, 25));
        assert!(winter.contains(1, 10));
        assert!(!winter.contains(3, 1));
        assert!(!winter.contains(11, 30));
        assert_eq!(winter.range_year(date(2002, 1, 10)), 2001);
        assert_eq!(winter.range_year(date(2001, 12, 10)), 2001);
        assert_eq!(winter.label(2001), "2001/12/01-2002/02/28");
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(SeasonRange::new(13, 1, 2, 1).is_err());
        assert!(SeasonRange::new(2, 30, 3, 1).is_err());
        assert!(SeasonRange::from_array([0, 1, 2, 1]).is_err());
        assert!(SeasonRange::new(2, 29, 3, 1).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(SeasonRange::new(3, 1, 5, 31).unwrap().to_string(), "03/01-05/31");
    }
}
