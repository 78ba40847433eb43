use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calendar::BusinessCalendar;
use crate::clock::{Interval, TimeOfDay};
use crate::error::{Result, SchedulerError};

/// Lifecycle of an appointment.
/// pending -> confirmed -> completed, pending|confirmed -> cancelled;
/// nothing leaves completed or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    /// Cancelled appointments are kept for reporting but free their slot.
    pub fn holds_capacity(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(SchedulerError::malformed(format!("unknown status '{}'", other))),
        }
    }
}

/// A booked appointment as persisted in the `appointments` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_label: String,
    pub service_name: String,
    pub start: NaiveDateTime,
    /// Older records may lack it; see [`Appointment::interval`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Stored interval, deriving the end from the service duration when absent.
    pub fn interval(&self, calendar: &BusinessCalendar<'_>) -> Interval {
        match self.end {
            Some(end) => Interval::new(self.start, end),
            None => Interval::starting_at(self.start, calendar.duration_for(&self.service_name)),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Applies a status change; invalid transitions leave the record untouched.
    pub fn transition(&mut self, next: AppointmentStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

/// A client-submitted request awaiting staff confirmation (`pendingRequests` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    pub client_label: String,
    pub contact: String,
    pub service_name: String,
    pub requested_date: NaiveDate,
    pub requested_time: TimeOfDay,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn requested_start(&self) -> NaiveDateTime {
        self.requested_time.on(self.requested_date)
    }
}

/// Identifier and timestamp stamped onto a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingStamp {
    pub id: String,
    pub at: DateTime<Utc>,
}

impl BookingStamp {
    pub fn fresh(prefix: &str) -> Self {
        let at = Utc::now();
        BookingStamp {
            id: new_id(prefix, at),
            at,
        }
    }
}

/// `prefix_<millis>_<random>`
pub fn new_id(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}_{}_{}", prefix, at.timestamp_millis(), suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::BusinessConfig;

    fn appointment(status: AppointmentStatus) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: "apt_1".to_string(),
            client_label: "Ana López".to_string(),
            service_name: "Coloración".to_string(),
            start: NaiveDateTime::parse_from_str("2025-08-14T10:30", "%Y-%m-%dT%H:%M").unwrap(),
            end: None,
            status,
            contact: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_machine_is_one_way() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn invalid_transition_reports_and_keeps_state() {
        let mut appt = appointment(AppointmentStatus::Completed);
        let before = appt.clone();
        let err = appt.transition(AppointmentStatus::Cancelled, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "cannot move an appointment from completed to cancelled");
        assert_eq!(appt, before);

        let mut appt = appointment(AppointmentStatus::Pending);
        appt.transition(AppointmentStatus::Confirmed, Utc::now()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn interval_derives_missing_end() {
        let config = BusinessConfig::starter(1);
        let calendar = BusinessCalendar::new(&config);
        let appt = appointment(AppointmentStatus::Pending);
        assert_eq!(appt.interval(&calendar).duration_minutes(), 90);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Confirmed".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Confirmed);
        assert!("done".parse::<AppointmentStatus>().is_err());
        let json = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn ids_carry_prefix_and_differ() {
        let at = Utc::now();
        let a = new_id("apt", at);
        let b = new_id("apt", at);
        assert!(a.starts_with("apt_"));
        assert_ne!(a, b);
    }
}
