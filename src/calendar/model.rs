use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::clock::{minutes_into_day, Interval, TimeOfDay};
use crate::error::{Result, SchedulerError};
use super::types::{BreakInterval, BusinessConfig, Policies, ServiceDefinition};

/// Why a date has no opening window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosedReason {
    ClosedDay,
    Holiday,
}

impl ClosedReason {
    pub fn into_error(self, date: NaiveDate) -> SchedulerError {
        match self {
            ClosedReason::ClosedDay => SchedulerError::ClosedDay {
                weekday: weekday_name(date.weekday()).to_string(),
            },
            ClosedReason::Holiday => SchedulerError::Holiday {
                date: date.to_string(),
            },
        }
    }
}

/// Resolved opening window of a single date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    pub open: TimeOfDay,
    pub close: TimeOfDay,
    pub breaks: Vec<BreakInterval>,
}

impl DayWindow {
    pub fn open_minutes(&self) -> u32 {
        self.open.minutes()
    }

    pub fn close_minutes(&self) -> u32 {
        self.close.minutes()
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Read-only lookups over a [`BusinessConfig`] snapshot.
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar<'a> {
    config: &'a BusinessConfig,
}

impl<'a> BusinessCalendar<'a> {
    pub fn new(config: &'a BusinessConfig) -> Self {
        BusinessCalendar { config }
    }

    pub fn policies(&self) -> &'a Policies {
        &self.config.policies
    }

    /// Opening window for `date`. A closed weekday wins over a holiday on the same date.
    pub fn window_for(&self, date: NaiveDate) -> std::result::Result<DayWindow, ClosedReason> {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        let hours = self
            .config
            .hours
            .day(weekday)
            .ok_or(ClosedReason::ClosedDay)?;
        if self.config.holidays.contains(date) {
            return Err(ClosedReason::Holiday);
        }
        Ok(DayWindow {
            open: hours.open,
            close: hours.close,
            breaks: hours.breaks.clone(),
        })
    }

    pub fn service(&self, name: &str) -> Option<&'a ServiceDefinition> {
        self.config.services.iter().find(|s| s.name == name)
    }

    /// Duration of `service_name`, or the policy default when the catalog no longer has it.
    /// Inactive services still resolve so historical appointments keep their length.
    pub fn duration_for(&self, service_name: &str) -> u32 {
        self.service(service_name)
            .map(|s| s.duration_minutes)
            .unwrap_or(self.config.policies.default_duration_minutes)
    }

    /// Services offered for new bookings
    pub fn active_services(&self) -> impl Iterator<Item = &'a ServiceDefinition> {
        self.config.services.iter().filter(|s| s.active)
    }

    /// Checks closed-day, holiday, outside-hours and crosses-break, in that order.
    #[cfg(test)]
    pub fn is_within_window(&self, interval: Interval) -> Result<()> {
        self.is_within_window_on(interval.start.date(), interval)
    }

    /// Same checks against the window of `date`, for intervals padded past midnight.
    pub fn is_within_window_on(&self, date: NaiveDate, interval: Interval) -> Result<()> {
        let window = self
            .window_for(date)
            .map_err(|reason| reason.into_error(date))?;

        let start = minutes_into_day(date, interval.start);
        let end = minutes_into_day(date, interval.end);
        if start < i64::from(window.open_minutes()) || end > i64::from(window.close_minutes()) {
            return Err(SchedulerError::OutsideHours {
                open: window.open.to_string(),
                close: window.close.to_string(),
            });
        }

        for pause in &window.breaks {
            if start < i64::from(pause.end.minutes()) && end > i64::from(pause.start.minutes()) {
                return Err(SchedulerError::CrossesBreak {
                    start: pause.start.to_string(),
                    end: pause.end.to_string(),
                });
            }
        }
        Ok(())
    }
}
