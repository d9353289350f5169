//! Shared utility functions for the transect flow tool crates.

/// Date utility functions
pub mod dates {
    use anyhow::{anyhow, bail};
    use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

    /// Date format used for start/end dates of a simulation: "MM/DD/YYYY"
    pub const DATE_FORMAT: &str = "%m/%d/%Y";

    /// Timestamp format used for per-timestep labels: "MM/DD/YYYY HH:MM:SS"
    pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

    /// Date format used for continuity table rows: "MM-DD-YYYY"
    pub const ROW_DATE_FORMAT: &str = "%m-%d-%Y";

    /// Calendar months of a water year in order, starting in November.
    pub const WATER_YEAR_MONTHS: [u32; 12] = [11, 12, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

    /// First calendar month of a water year.
    pub const WATER_YEAR_START_MONTH: u32 = 11;

    /// Format a NaiveDate as "MM/DD/YYYY"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Format a NaiveDateTime as "MM/DD/YYYY HH:MM:SS"
    pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
        timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a timestamp string in "MM/DD/YYYY HH:MM:SS" format
    pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
        Ok(NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)?)
    }

    /// Parse the base time out of a time axis unit string such as
    /// `"days since 1965-01-01 24:00:00"`.
    ///
    /// An hour of `24` is read as midnight of the same date. A missing
    /// time component defaults to midnight.
    pub fn parse_time_units(units: &str) -> anyhow::Result<NaiveDateTime> {
        let parts: Vec<&str> = units.split_whitespace().collect();
        if parts.len() < 3 || !parts[1].eq_ignore_ascii_case("since") {
            bail!("unrecognized time units '{units}'");
        }
        let date = NaiveDate::parse_from_str(parts[2], "%Y-%m-%d")?;
        let time = match parts.get(3) {
            Some(clock) => parse_clock(clock)?,
            None => NaiveTime::default(),
        };
        Ok(date.and_time(time))
    }

    fn parse_clock(clock: &str) -> anyhow::Result<NaiveTime> {
        let fields = clock
            .split(':')
            .map(|field| field.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()?;
        let hour = match fields.first() {
            Some(24) => 0,
            Some(hour) => *hour,
            None => 0,
        };
        let minute = fields.get(1).copied().unwrap_or(0);
        let second = fields.get(2).copied().unwrap_or(0);
        NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| anyhow!("invalid clock time '{clock}'"))
    }

    /// Get the water year for a calendar year and month.
    /// Water year runs Nov 1 to Oct 31.
    /// e.g., Nov 2022 -> water year 2023, Oct 2023 -> water year 2023
    pub fn water_year_for_month(year: i32, month: u32) -> i32 {
        if month >= WATER_YEAR_START_MONTH {
            year + 1
        } else {
            year
        }
    }

    /// Get the water year for a given date.
    pub fn water_year_for_date(date: &NaiveDate) -> i32 {
        water_year_for_month(date.year(), date.month())
    }

    /// Last calendar day of the given month, or None for an invalid month.
    pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
    }

    /// English month name, e.g. 11 -> "November".
    pub fn month_name(month: u32) -> &'static str {
        match month {
            1 => "January",
            2 => "February",
            3 => "March",
            4 => "April",
            5 => "May",
            6 => "June",
            7 => "July",
            8 => "August",
            9 => "September",
            10 => "October",
            11 => "November",
            12 => "December",
            _ => "",
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{NaiveDate, Timelike};

        #[test]
        fn test_water_year_for_date() {
            let nov1 = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap();
            assert_eq!(water_year_for_date(&nov1), 2023);

            let dec31 = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
            assert_eq!(water_year_for_date(&dec31), 2023);

            let oct31 = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
            assert_eq!(water_year_for_date(&oct31), 2023);

            let jan1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            assert_eq!(water_year_for_date(&jan1), 2023);
        }

        #[test]
        fn test_parse_time_units() {
            let base = parse_time_units("days since 1965-01-01 24:00:00").unwrap();
            assert_eq!(base.date(), NaiveDate::from_ymd_opt(1965, 1, 1).unwrap());
            assert_eq!(base.hour(), 0);

            let base = parse_time_units("days since 2000-06-15 12:30:00").unwrap();
            assert_eq!(base.hour(), 12);
            assert_eq!(base.minute(), 30);

            let base = parse_time_units("days since 2000-06-15").unwrap();
            assert_eq!(base.hour(), 0);

            assert!(parse_time_units("seconds").is_err());
            assert!(parse_time_units("days after 2000-01-01").is_err());
        }

        #[test]
        fn test_last_day_of_month() {
            assert_eq!(
                last_day_of_month(2000, 2),
                NaiveDate::from_ymd_opt(2000, 2, 29)
            );
            assert_eq!(
                last_day_of_month(2001, 2),
                NaiveDate::from_ymd_opt(2001, 2, 28)
            );
            assert_eq!(
                last_day_of_month(2001, 12),
                NaiveDate::from_ymd_opt(2001, 12, 31)
            );
            assert_eq!(last_day_of_month(2001, 13), None);
        }

        #[test]
        fn test_format_and_parse() {
            let timestamp = NaiveDate::from_ymd_opt(2001, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let formatted = format_timestamp(&timestamp);
            assert_eq!(formatted, "01/15/2001 00:00:00");
            assert_eq!(parse_timestamp(&formatted).unwrap(), timestamp);
            assert_eq!(format_date(&timestamp.date()), "01/15/2001");
        }

        #[test]
        fn test_water_year_months_start_in_november() {
            assert_eq!(WATER_YEAR_MONTHS[0], 11);
            assert_eq!(WATER_YEAR_MONTHS[11], 10);
            assert_eq!(month_name(WATER_YEAR_MONTHS[0]), "November");
        }
    }

    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn late_months_roll_into_next_water_year(year in 1900i32..2100, month in 1u32..=12) {
                let water_year = water_year_for_month(year, month);
                if month >= 11 {
                    prop_assert_eq!(water_year, year + 1);
                } else {
                    prop_assert_eq!(water_year, year);
                }
            }
        }
    }
}

/// Progress reporting helpers for long-running loops
pub mod progress {
    use std::time::{Duration, Instant};

    /// Minimum spacing between two progress messages.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// Decides when a loop should report progress: on the first and last
    /// step, and whenever the interval has elapsed since the last report.
    #[derive(Debug, Clone)]
    pub struct ProgressThrottle {
        interval: Duration,
        last: Option<Instant>,
    }

    impl Default for ProgressThrottle {
        fn default() -> Self {
            Self::new(DEFAULT_INTERVAL)
        }
    }

    impl ProgressThrottle {
        pub fn new(interval: Duration) -> Self {
            Self {
                interval,
                last: None,
            }
        }

        /// Returns true if progress for `step` (zero based) of `len` should be emitted now.
        pub fn should_emit(&mut self, step: usize, len: usize) -> bool {
            self.should_emit_at(step, len, Instant::now())
        }

        pub fn should_emit_at(&mut self, step: usize, len: usize, now: Instant) -> bool {
            let boundary = step == 0 || step + 1 == len;
            let elapsed = match self.last {
                Some(last) => now.saturating_duration_since(last) >= self.interval,
                None => true,
            };
            if boundary || elapsed {
                self.last = Some(now);
                true
            } else {
                false
            }
        }
    }

    /// Format a duration as "HH:MM:SS.ffffff".
    pub fn format_elapsed(elapsed: Duration) -> String {
        let total = elapsed.as_secs_f64();
        let hours = (total / 3600.0).floor();
        let minutes = ((total - hours * 3600.0) / 60.0).floor();
        let seconds = total - hours * 3600.0 - minutes * 60.0;
        format!("{:02}:{:02}:{:09.6}", hours as u64, minutes as u64, seconds)
    }

}
