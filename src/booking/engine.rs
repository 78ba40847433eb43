use std::iter::StepBy;
use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::calendar::{BusinessCalendar, ClosedReason, DayWindow};
use crate::clock::{
    candidate_starts, minutes_to_time_string, Interval, TimeOfDay, SLOT_STEP_MINUTES,
};
use crate::error::Result;
use super::capacity::check_capacity;
use super::types::{Appointment, AppointmentStatus, BookingStamp};

/// A booking proposal before it becomes an [`Appointment`]
#[derive(Debug, Clone, PartialEq)]
pub struct BookingCandidate {
    pub client_label: String,
    pub service_name: String,
    pub start: NaiveDateTime,
    pub contact: Option<String>,
    pub notes: Option<String>,
}

/// Stateless availability checks over a calendar and an appointment snapshot.
#[derive(Debug, Clone)]
pub struct AvailabilityEngine<'a> {
    calendar: BusinessCalendar<'a>,
    occupied: Vec<Interval>,
}

impl<'a> AvailabilityEngine<'a> {
    pub fn new(calendar: BusinessCalendar<'a>, appointments: &[Appointment]) -> Self {
        let occupied = appointments
            .iter()
            .filter(|a| a.status.holds_capacity())
            .map(|a| a.interval(&calendar))
            .collect();
        AvailabilityEngine { calendar, occupied }
    }

    pub fn capacity(&self) -> u32 {
        self.calendar.policies().max_concurrent_appointments
    }

    /// Interval a booking of `service_name` at `start` would occupy.
    pub fn candidate_interval(&self, start: NaiveDateTime, service_name: &str) -> Interval {
        Interval::starting_at(start, self.calendar.duration_for(service_name))
    }

    /// Hours, holiday and break rules first, then capacity, both on the buffer-padded interval.
    pub fn validate_candidate(&self, candidate: Interval) -> Result<()> {
        let padded = candidate.padded(self.calendar.policies().buffer_minutes);
        self.calendar.is_within_window_on(candidate.start.date(), padded)?;
        check_capacity(&self.occupied, &padded, self.capacity())
    }

    /// Open start times for `service_name` on `date`, in ascending order.
    pub fn enumerate_slots(&self, date: NaiveDate, service_name: &str) -> SlotSequence<'_> {
        let duration = self.calendar.duration_for(service_name);
        let window = self.calendar.window_for(date);
        debug!(
            %date,
            service = service_name,
            duration,
            closed = window.is_err(),
            "enumerating slots"
        );
        SlotSequence {
            engine: self,
            date,
            duration,
            window,
        }
    }

    /// Turns an accepted candidate into the record to persist. Performs no checks.
    pub fn apply_booking(
        &self,
        candidate: BookingCandidate,
        status: AppointmentStatus,
        stamp: BookingStamp,
    ) -> Appointment {
        let interval = self.candidate_interval(candidate.start, &candidate.service_name);
        Appointment {
            id: stamp.id,
            client_label: candidate.client_label,
            service_name: candidate.service_name,
            start: interval.start,
            end: Some(interval.end),
            status,
            contact: candidate.contact,
            notes: candidate.notes,
            created_at: stamp.at,
            updated_at: stamp.at,
        }
    }

    /// Validates and applies in one step.
    pub fn book(
        &self,
        candidate: BookingCandidate,
        status: AppointmentStatus,
        stamp: BookingStamp,
    ) -> Result<Appointment> {
        self.validate_candidate(self.candidate_interval(candidate.start, &candidate.service_name))?;
        Ok(self.apply_booking(candidate, status, stamp))
    }
}

/// Lazy, finite slot listing. Every call to [`SlotSequence::iter`] starts over.
#[derive(Debug, Clone)]
pub struct SlotSequence<'e> {
    engine: &'e AvailabilityEngine<'e>,
    date: NaiveDate,
    duration: u32,
    window: std::result::Result<DayWindow, ClosedReason>,
}

impl<'e> SlotSequence<'e> {
    pub fn closed_reason(&self) -> Option<ClosedReason> {
        self.window.as_ref().err().copied()
    }

    pub fn iter(&self) -> SlotIter<'e> {
        let starts = match &self.window {
            Ok(window) => candidate_starts(
                window.open_minutes(),
                window.close_minutes(),
                self.duration,
                SLOT_STEP_MINUTES,
            ),
            Err(_) => candidate_starts(0, 0, 1, SLOT_STEP_MINUTES),
        };
        SlotIter {
            engine: self.engine,
            day_start: self.date.and_time(NaiveTime::default()),
            duration: self.duration,
            starts,
        }
    }
}

impl<'s, 'e> IntoIterator for &'s SlotSequence<'e> {
    type Item = String;
    type IntoIter = SlotIter<'e>;

    fn into_iter(self) -> SlotIter<'e> {
        self.iter()
    }
}

pub struct SlotIter<'e> {
    engine: &'e AvailabilityEngine<'e>,
    day_start: NaiveDateTime,
    duration: u32,
    starts: StepBy<RangeInclusive<u32>>,
}

impl<'e> Iterator for SlotIter<'e> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for minutes in self.starts.by_ref() {
            let start = match TimeOfDay::from_minutes(minutes) {
                Some(t) => t.on(self.day_start.date()),
                None => return None,
            };
            let candidate = Interval::starting_at(start, self.duration);
            if self.engine.validate_candidate(candidate).is_ok() {
                return Some(minutes_to_time_string(minutes));
            }
        }
        None
    }
}
