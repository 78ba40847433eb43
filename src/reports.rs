use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::booking::{Appointment, AppointmentStatus};
use crate::calendar::BusinessCalendar;

/// Narrows the appointments a report looks at. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub service: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl ReportFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        let date = appointment.date();
        self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
            && self
                .service
                .as_deref()
                .map_or(true, |service| appointment.service_name == service)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    fn record(&mut self, status: AppointmentStatus) {
        match status {
            AppointmentStatus::Pending => self.pending += 1,
            AppointmentStatus::Confirmed => self.confirmed += 1,
            AppointmentStatus::Completed => self.completed += 1,
            AppointmentStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Aggregate figures over the filtered appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_status: StatusCounts,
    /// Cancelled share of `total`, rounded to a whole percent.
    pub cancellation_rate: u32,
    pub booked_minutes: i64,
    pub revenue: f64,
    /// Set when some appointment's service has no price, so `revenue` is a lower bound.
    pub missing_prices: bool,
    pub per_day: BTreeMap<NaiveDate, usize>,
    pub per_service: BTreeMap<String, usize>,
}

pub fn summarize(
    appointments: &[Appointment],
    calendar: &BusinessCalendar<'_>,
    filter: &ReportFilter,
) -> Summary {
    let mut summary = Summary::default();
    for appointment in appointments.iter().filter(|a| filter.matches(a)) {
        summary.total += 1;
        summary.by_status.record(appointment.status);
        summary.booked_minutes += appointment.interval(calendar).duration_minutes().max(0);
        match calendar.service(&appointment.service_name).and_then(|s| s.price) {
            Some(price) => summary.revenue += price,
            None => summary.missing_prices = true,
        }
        *summary.per_day.entry(appointment.date()).or_insert(0) += 1;
        *summary
            .per_service
            .entry(appointment.service_name.clone())
            .or_insert(0) += 1;
    }
    if summary.total > 0 {
        let rate = summary.by_status.cancelled as f64 * 100.0 / summary.total as f64;
        summary.cancellation_rate = rate.round() as u32;
    }
    summary
}

/// Non-cancelled appointments starting after `now` and no later than `hours` from it,
/// earliest first.
pub fn upcoming_reminders<'a>(
    appointments: &'a [Appointment],
    now: NaiveDateTime,
    hours: u32,
) -> Vec<&'a Appointment> {
    let limit = now + Duration::hours(i64::from(hours));
    let mut upcoming: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.status.holds_capacity() && a.start > now && a.start <= limit)
        .collect();
    upcoming.sort_by_key(|a| a.start);
    upcoming
}
