use std::fmt;
use std::iter::StepBy;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Granularity of the candidate start times offered to clients.
pub const SLOT_STEP_MINUTES: u32 = 15;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A wall-clock time of day, stored as minutes since midnight and written as HH:MM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(TimeOfDay(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::default()) + Duration::minutes(i64::from(self.0))
    }
}

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let (hours, minutes) = time_str.trim().split_once(':')?;
    if hours.is_empty() || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

impl FromStr for TimeOfDay {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_time_to_minutes(s)
            .map(TimeOfDay)
            .ok_or_else(|| {
                SchedulerError::malformed(format!("invalid time '{}', expected HH:MM", s))
            })
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&minutes_to_time_string(self.0))
    }
}

/// Parses a calendar date in YYYY-MM-DD form.
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| {
            SchedulerError::malformed(format!("invalid date '{}', expected YYYY-MM-DD", date_str))
        })
}

/// Minutes between the start of `date` and `at`. Negative before the day, past 1440 after it.
pub fn minutes_into_day(date: NaiveDate, at: NaiveDateTime) -> i64 {
    (at - date.and_time(NaiveTime::default())).num_minutes()
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Interval { start, end }
    }

    pub fn starting_at(start: NaiveDateTime, duration_minutes: u32) -> Self {
        Interval {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Widens the interval by `minutes` on both sides.
    pub fn padded(&self, minutes: u32) -> Interval {
        let pad = Duration::minutes(i64::from(minutes));
        Interval {
            start: self.start - pad,
            end: self.end + pad,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Candidate start minutes from `open` to `close - duration` inclusive, `step` apart.
pub fn candidate_starts(
    open: u32,
    close: u32,
    duration: u32,
    step: u32,
) -> StepBy<RangeInclusive<u32>> {
    let range = match close.checked_sub(duration) {
        Some(last) if last >= open => open..=last,
        _ => 1..=0,
    };
    range.step_by(step.max(1) as usize)
}
