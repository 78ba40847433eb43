//! Caller-facing operations.
//!
//! Every operation reads a fresh snapshot from the store, runs the calendar
//! and engine over it, and writes back the resulting collection. Callers
//! serialize access (the web layer holds the scheduler behind a mutex).

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::booking::{
    Appointment, AppointmentStatus, AvailabilityEngine, BookingCandidate, BookingStamp,
    PendingRequest,
};
use crate::calendar::{
    BusinessCalendar, BusinessConfig, BusinessHours, ClosedReason, HolidaySet, Policies, SalonInfo,
    ServiceDefinition,
};
use crate::clients::{self, Client, ClientInput};
use crate::clock::{parse_date, TimeOfDay};
use crate::error::{Result, SchedulerError};
use crate::reports::{self, ReportFilter, Summary};
use crate::store::{self, BackupBundle, SalonStore};

/// Open start times for one date and service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub date: NaiveDate,
    pub service: String,
    pub duration_minutes: u32,
    pub slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<ClosedReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A booking as entered by staff or forwarded from a confirmed request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub client_label: String,
    pub service_name: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Book directly as confirmed instead of pending.
    #[serde(default)]
    pub confirm: bool,
}

impl BookingRequest {
    fn candidate(&self) -> Result<BookingCandidate> {
        let client_label = required(&self.client_label, "client name")?;
        let service_name = required(&self.service_name, "service")?;
        let date = parse_date(&self.date)?;
        let time: TimeOfDay = self.time.parse()?;
        Ok(BookingCandidate {
            client_label,
            service_name,
            start: time.on(date),
            contact: optional(self.contact.as_deref()),
            notes: optional(self.notes.as_deref()),
        })
    }
}

/// A client's own request, kept aside until staff confirm or reject it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSubmission {
    pub client_label: String,
    pub contact: String,
    pub service_name: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub notes: String,
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SchedulerError::malformed(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub struct Scheduler<S> {
    store: S,
}

impl<S: SalonStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Scheduler { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored configuration; booking is impossible until policies exist.
    pub fn business_config(&self) -> Result<BusinessConfig> {
        self.store
            .load_business_config()?
            .ok_or(SchedulerError::NotConfigured)
    }

    fn update_config<F>(&mut self, what: &str, change: F) -> Result<BusinessConfig>
    where
        F: FnOnce(&mut BusinessConfig) -> Result<()>,
    {
        let mut config = self.business_config()?;
        change(&mut config)?;
        config.validate()?;
        self.store.save_business_config(&config)?;
        info!(what, "business configuration updated");
        Ok(config)
    }

    fn bookable_service(calendar: &BusinessCalendar<'_>, name: &str) -> Result<()> {
        match calendar.service(name) {
            Some(service) if service.active => Ok(()),
            Some(_) => Err(SchedulerError::malformed(format!(
                "service '{}' is no longer offered",
                name
            ))),
            None => Err(SchedulerError::malformed(format!("unknown service '{}'", name))),
        }
    }

    // Calendar configuration

    /// Seeds a typical salon week. Refuses to overwrite an existing configuration.
    pub fn init_starter(&mut self, capacity: u32) -> Result<BusinessConfig> {
        if self.store.load_business_config()?.is_some() {
            return Err(SchedulerError::malformed("business configuration already exists"));
        }
        let config = BusinessConfig::starter(capacity);
        config.validate()?;
        self.store.save_business_config(&config)?;
        info!(capacity, "starter configuration created");
        Ok(config)
    }

    /// Stores policies, creating the configuration on first use.
    pub fn upsert_policies(&mut self, policies: Policies) -> Result<Policies> {
        policies.validate()?;
        let mut config = match self.store.load_business_config()? {
            Some(config) => config,
            None => BusinessConfig::new(policies.clone()),
        };
        config.policies = policies.clone();
        config.validate()?;
        self.store.save_business_config(&config)?;
        info!(
            capacity = policies.max_concurrent_appointments,
            buffer = policies.buffer_minutes,
            "policies updated"
        );
        Ok(policies)
    }

    pub fn upsert_service_definition(
        &mut self,
        mut service: ServiceDefinition,
    ) -> Result<ServiceDefinition> {
        service.name = service.name.trim().to_string();
        service.validate()?;
        let stored = service.clone();
        self.update_config("service", move |config| {
            config.upsert_service(service);
            Ok(())
        })?;
        Ok(stored)
    }

    pub fn upsert_business_hours(&mut self, hours: BusinessHours) -> Result<BusinessHours> {
        hours.validate()?;
        let config = self.update_config("hours", |config| {
            config.hours = hours;
            Ok(())
        })?;
        Ok(config.hours)
    }

    pub fn set_holidays(&mut self, holidays: HolidaySet) -> Result<HolidaySet> {
        let config = self.update_config("holidays", |config| {
            config.holidays = holidays;
            Ok(())
        })?;
        Ok(config.holidays)
    }

    pub fn add_holiday(&mut self, date: &str) -> Result<HolidaySet> {
        let date = parse_date(date)?;
        let config = self.update_config("holidays", |config| {
            config.holidays.insert(date);
            Ok(())
        })?;
        Ok(config.holidays)
    }

    pub fn remove_holiday(&mut self, date: &str) -> Result<HolidaySet> {
        let date = parse_date(date)?;
        let config = self.update_config("holidays", |config| {
            if config.holidays.remove(date) {
                Ok(())
            } else {
                Err(SchedulerError::not_found("holiday", date.to_string()))
            }
        })?;
        Ok(config.holidays)
    }

    pub fn upsert_salon_info(&mut self, info: SalonInfo) -> Result<SalonInfo> {
        let config = self.update_config("salon info", |config| {
            config.info = info;
            Ok(())
        })?;
        Ok(config.info)
    }

    pub fn active_services(&self) -> Result<Vec<ServiceDefinition>> {
        let config = self.business_config()?;
        let services = BusinessCalendar::new(&config).active_services().cloned().collect();
        Ok(services)
    }

    // Availability and booking

    pub fn get_available_slots(&self, date: &str, service: &str) -> Result<Availability> {
        let date = parse_date(date)?;
        let service = required(service, "service")?;
        let config = self.business_config()?;
        let calendar = BusinessCalendar::new(&config);
        Self::bookable_service(&calendar, &service)?;

        let appointments = self.store.load_appointments()?;
        let engine = AvailabilityEngine::new(calendar, &appointments);
        let sequence = engine.enumerate_slots(date, &service);
        let closed = sequence.closed_reason();
        Ok(Availability {
            date,
            duration_minutes: calendar.duration_for(&service),
            slots: sequence.iter().collect(),
            closed,
            reason: closed.map(|c| c.into_error(date).to_string()),
            service,
        })
    }

    /// Checks the booking against the calendar and current load, then stores it.
    pub fn validate_and_book(&mut self, request: BookingRequest) -> Result<Appointment> {
        let candidate = request.candidate()?;
        let config = self.business_config()?;
        let calendar = BusinessCalendar::new(&config);
        Self::bookable_service(&calendar, &candidate.service_name)?;

        let mut appointments = self.store.load_appointments()?;
        let status = if request.confirm {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        };
        let engine = AvailabilityEngine::new(calendar, &appointments);
        let start = candidate.start;
        let appointment = match engine.book(candidate, status, BookingStamp::fresh("apt")) {
            Ok(appointment) => appointment,
            Err(e) => {
                warn!(%start, service = %request.service_name, reason = %e, "booking rejected");
                return Err(e);
            }
        };
        appointments.push(appointment.clone());
        self.store.save_appointments(&appointments)?;
        info!(id = %appointment.id, %start, status = %appointment.status, "appointment booked");
        Ok(appointment)
    }

    pub fn change_status(&mut self, id: &str, status: AppointmentStatus) -> Result<Appointment> {
        let mut appointments = self.store.load_appointments()?;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| SchedulerError::not_found("appointment", id))?;
        let from = appointment.status;
        appointment.transition(status, Utc::now())?;
        let updated = appointment.clone();
        self.store.save_appointments(&appointments)?;
        info!(id, %from, to = %status, "appointment status changed");
        Ok(updated)
    }

    pub fn appointments(&self) -> Result<Vec<Appointment>> {
        self.store.load_appointments()
    }

    /// Appointments starting on `date`, earliest first.
    pub fn appointments_on(&self, date: &str) -> Result<Vec<Appointment>> {
        let date = parse_date(date)?;
        let mut day: Vec<Appointment> = self
            .store
            .load_appointments()?
            .into_iter()
            .filter(|a| a.date() == date)
            .collect();
        day.sort_by_key(|a| a.start);
        Ok(day)
    }

    pub fn remove_appointment(&mut self, id: &str) -> Result<Appointment> {
        let mut appointments = self.store.load_appointments()?;
        let position = appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| SchedulerError::not_found("appointment", id))?;
        let removed = appointments.remove(position);
        self.store.save_appointments(&appointments)?;
        info!(id, "appointment removed");
        Ok(removed)
    }

    /// Drops every appointment and pending request. Returns how many of each were removed.
    pub fn reset(&mut self) -> Result<(usize, usize)> {
        let appointments = self.store.load_appointments()?.len();
        let requests = self.store.load_pending_requests()?.len();
        self.store.save_appointments(&[])?;
        self.store.save_pending_requests(&[])?;
        warn!(appointments, requests, "appointments and requests reset");
        Ok((appointments, requests))
    }

    // Pending requests

    pub fn submit_request(&mut self, submission: RequestSubmission) -> Result<PendingRequest> {
        let client_label = required(&submission.client_label, "client name")?;
        let contact = required(&submission.contact, "contact")?;
        let service_name = required(&submission.service_name, "service")?;
        let requested_date = parse_date(&submission.date)?;
        let requested_time: TimeOfDay = submission.time.parse()?;

        let stamp = BookingStamp::fresh("req");
        let request = PendingRequest {
            id: stamp.id,
            client_label,
            contact,
            service_name,
            requested_date,
            requested_time,
            notes: submission.notes.trim().to_string(),
            created_at: stamp.at,
        };
        let mut requests = self.store.load_pending_requests()?;
        requests.push(request.clone());
        self.store.save_pending_requests(&requests)?;
        info!(
            id = %request.id,
            date = %requested_date,
            time = %requested_time,
            "request submitted"
        );
        Ok(request)
    }

    pub fn pending_requests(&self) -> Result<Vec<PendingRequest>> {
        self.store.load_pending_requests()
    }

    fn find_request(&self, id: &str) -> Result<(Vec<PendingRequest>, usize)> {
        let requests = self.store.load_pending_requests()?;
        let position = requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| SchedulerError::not_found("request", id))?;
        Ok((requests, position))
    }

    /// Books the request as confirmed and discards it. A rejected booking keeps the request.
    pub fn confirm_request(&mut self, id: &str) -> Result<Appointment> {
        let (mut requests, position) = self.find_request(id)?;
        let request = requests[position].clone();
        let appointment = self.validate_and_book(BookingRequest {
            client_label: request.client_label.clone(),
            service_name: request.service_name.clone(),
            date: request.requested_date.to_string(),
            time: request.requested_time.to_string(),
            contact: Some(request.contact.clone()),
            notes: Some(request.notes.clone()),
            confirm: true,
        })?;

        // The request must not outlive its booking, or it could be confirmed twice.
        requests.remove(position);
        if let Err(e) = self.store.save_pending_requests(&requests) {
            if let Err(rollback) = self.remove_appointment(&appointment.id) {
                warn!(id = %appointment.id, error = %rollback, "could not undo confirmed booking");
            }
            return Err(e);
        }

        let mut directory = self.store.load_clients()?;
        let now = Utc::now();
        if clients::add_if_missing(&mut directory, &request.client_label, &request.contact, now) {
            self.store.save_clients(&directory)?;
            info!(client = %request.client_label, "client added from request");
        }
        Ok(appointment)
    }

    pub fn reject_request(&mut self, id: &str) -> Result<PendingRequest> {
        let (mut requests, position) = self.find_request(id)?;
        let rejected = requests.remove(position);
        self.store.save_pending_requests(&requests)?;
        info!(id, "request rejected");
        Ok(rejected)
    }

    // Clients

    pub fn upsert_client(&mut self, input: ClientInput) -> Result<Client> {
        let mut directory = self.store.load_clients()?;
        if let Some(id) = input.id.as_deref() {
            if !directory.iter().any(|c| c.id == id) {
                return Err(SchedulerError::not_found("client", id));
            }
        }
        let client = clients::upsert_client(&mut directory, input, Utc::now())?;
        self.store.save_clients(&directory)?;
        info!(id = %client.id, "client saved");
        Ok(client)
    }

    pub fn remove_client(&mut self, id: &str) -> Result<Client> {
        let mut directory = self.store.load_clients()?;
        let position = directory
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| SchedulerError::not_found("client", id))?;
        let removed = directory.remove(position);
        self.store.save_clients(&directory)?;
        info!(id, "client removed");
        Ok(removed)
    }

    /// Clients matching `term` on name or phone, sorted by name. An empty term lists everyone.
    pub fn list_clients(&self, term: &str) -> Result<Vec<Client>> {
        let directory = self.store.load_clients()?;
        Ok(clients::search(&directory, term).into_iter().cloned().collect())
    }

    // Reports

    pub fn summary(&self, filter: &ReportFilter) -> Result<Summary> {
        let config = self.business_config()?;
        let appointments = self.store.load_appointments()?;
        Ok(reports::summarize(&appointments, &BusinessCalendar::new(&config), filter))
    }

    /// Reminders due within `hours` of the local wall clock.
    pub fn upcoming_reminders(&self, hours: u32) -> Result<Vec<Appointment>> {
        let appointments = self.store.load_appointments()?;
        let now = Local::now().naive_local();
        Ok(reports::upcoming_reminders(&appointments, now, hours)
            .into_iter()
            .cloned()
            .collect())
    }

    // Backup

    pub fn export_backup(&self) -> Result<Vec<u8>> {
        store::export_backup(&self.store)
    }

    pub fn import_backup(&mut self, bytes: &[u8]) -> Result<BackupBundle> {
        store::import_backup(&mut self.store, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayHours;
    use crate::error::ErrorKind;
    use crate::store::{Collection, MemoryStore};
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn configured(capacity: u32) -> Scheduler<MemoryStore> {
        let mut scheduler = Scheduler::new(MemoryStore::new());
        scheduler.init_starter(capacity).unwrap();
        scheduler
    }

    fn booking(date: &str, time: &str, service: &str) -> BookingRequest {
        BookingRequest {
            client_label: "Juan Pérez".to_string(),
            service_name: service.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            contact: Some("+18095551234".to_string()),
            ..BookingRequest::default()
        }
    }

    fn submission(time: &str) -> RequestSubmission {
        RequestSubmission {
            client_label: "Cliente Demo".to_string(),
            contact: "+1 809 555 0000".to_string(),
            service_name: "Peinado".to_string(),
            date: "2025-08-18".to_string(),
            time: time.to_string(),
            notes: "primera visita".to_string(),
        }
    }

    #[test]
    fn unconfigured_salon_refuses_bookings() {
        let mut scheduler = Scheduler::new(MemoryStore::new());
        let err = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Corte de Cabello"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
        assert_eq!(
            scheduler.get_available_slots("2025-08-18", "Peinado").unwrap_err().kind(),
            ErrorKind::NotConfigured
        );
        assert_eq!(
            scheduler
                .upsert_service_definition(ServiceDefinition::new("Manicura", 40, ""))
                .unwrap_err()
                .kind(),
            ErrorKind::NotConfigured
        );
        scheduler.upsert_policies(Policies::new(2)).unwrap();
        assert!(scheduler.business_config().unwrap().services.is_empty());
    }

    #[test]
    fn booking_consumes_slots_until_capacity() {
        let mut scheduler = configured(1);
        let appt = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Corte de Cabello"))
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);

        let availability = scheduler.get_available_slots("2025-08-18", "Corte de Cabello").unwrap();
        assert_eq!(availability.closed, None);
        assert!(!availability.slots.iter().any(|s| s == "10:15"));
        assert!(availability.slots.iter().any(|s| s == "10:30"));

        let err = scheduler
            .validate_and_book(booking("2025-08-18", "10:15", "Corte de Cabello"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        let back_to_back = BookingRequest {
            confirm: true,
            ..booking("2025-08-18", "10:30", "Corte de Cabello")
        };
        let confirmed = scheduler.validate_and_book(back_to_back).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(scheduler.appointments().unwrap().len(), 2);
    }

    #[test]
    fn holiday_rejects_any_time() {
        let mut scheduler = configured(3);
        scheduler.add_holiday("2025-08-18").unwrap();
        for time in ["09:00", "12:00", "18:30"] {
            let err = scheduler
                .validate_and_book(booking("2025-08-18", time, "Corte de Cabello"))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Holiday);
        }
        let availability = scheduler.get_available_slots("2025-08-18", "Peinado").unwrap();
        assert!(availability.slots.is_empty());
        assert_eq!(availability.closed, Some(ClosedReason::Holiday));
        assert!(availability.reason.is_some());

        scheduler.remove_holiday("2025-08-18").unwrap();
        assert!(scheduler.validate_and_book(booking("2025-08-18", "09:00", "Peinado")).is_ok());
        assert_eq!(scheduler.remove_holiday("2025-08-18").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn break_is_enforced_on_booking() {
        let mut scheduler = configured(2);
        let mut hours = scheduler.business_config().unwrap().hours;
        let monday = DayHours::new(t("09:00"), t("19:00")).with_break(t("13:00"), t("14:00"));
        hours = hours.with_day(1, Some(monday));
        scheduler.upsert_business_hours(hours).unwrap();
        let err = scheduler
            .validate_and_book(booking("2025-08-18", "12:45", "Corte de Cabello"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossesBreak);
        assert!(scheduler.appointments().unwrap().is_empty());
    }

    #[test]
    fn closed_sunday_and_bad_input() {
        let mut scheduler = configured(2);
        let err = scheduler
            .validate_and_book(booking("2025-08-17", "10:00", "Peinado"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClosedDay);
        for bad in [
            booking("17/08/2025", "10:00", "Peinado"),
            booking("2025-08-18", "25:00", "Peinado"),
            booking("2025-08-18", "10:00", "Masaje"),
            BookingRequest {
                client_label: " ".to_string(),
                ..booking("2025-08-18", "10:00", "Peinado")
            },
        ] {
            assert_eq!(
                scheduler.validate_and_book(bad).unwrap_err().kind(),
                ErrorKind::MalformedInput
            );
        }
        assert_eq!(
            scheduler.get_available_slots("mañana", "Peinado").unwrap_err().kind(),
            ErrorKind::MalformedInput
        );
    }

    #[test]
    fn inactive_services_are_not_bookable() {
        let mut scheduler = configured(2);
        let mut retired = ServiceDefinition::new("Peinado", 45, "#10b981");
        retired.active = false;
        scheduler.upsert_service_definition(retired).unwrap();
        let err = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Peinado"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        let names: Vec<String> =
            scheduler.active_services().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Corte de Cabello", "Coloración"]);
    }

    #[test]
    fn status_changes_follow_the_lifecycle() {
        let mut scheduler = configured(1);
        let appt = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Corte de Cabello"))
            .unwrap();
        scheduler.change_status(&appt.id, AppointmentStatus::Confirmed).unwrap();
        let done = scheduler.change_status(&appt.id, AppointmentStatus::Completed).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        let err = scheduler.change_status(&appt.id, AppointmentStatus::Cancelled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(scheduler.appointments().unwrap()[0].status, AppointmentStatus::Completed);
        assert_eq!(
            scheduler
                .change_status("apt_missing", AppointmentStatus::Confirmed)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn cancelling_frees_the_slot() {
        let mut scheduler = configured(1);
        let appt = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Corte de Cabello"))
            .unwrap();
        scheduler.change_status(&appt.id, AppointmentStatus::Cancelled).unwrap();
        assert!(scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Corte de Cabello"))
            .is_ok());
        assert_eq!(scheduler.appointments_on("2025-08-18").unwrap().len(), 2);
    }

    #[test]
    fn confirming_a_request_books_and_registers_client() {
        let mut scheduler = configured(1);
        let request = scheduler.submit_request(submission("15:00")).unwrap();
        assert_eq!(scheduler.pending_requests().unwrap().len(), 1);

        let appt = scheduler.confirm_request(&request.id).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
        assert_eq!(appt.notes.as_deref(), Some("primera visita"));
        assert!(scheduler.pending_requests().unwrap().is_empty());
        let clients = scheduler.list_clients("").unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Cliente Demo");

        // Same phone again: booked but no second client
        let again = scheduler.submit_request(submission("17:00")).unwrap();
        scheduler.confirm_request(&again.id).unwrap();
        assert_eq!(scheduler.list_clients("").unwrap().len(), 1);
    }

    #[test]
    fn failed_confirmation_keeps_the_request() {
        let mut scheduler = configured(1);
        scheduler
            .validate_and_book(booking("2025-08-18", "15:00", "Corte de Cabello"))
            .unwrap();
        let request = scheduler.submit_request(submission("15:00")).unwrap();
        let err = scheduler.confirm_request(&request.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(scheduler.pending_requests().unwrap().len(), 1);
        assert!(scheduler.list_clients("").unwrap().is_empty());

        let rejected = scheduler.reject_request(&request.id).unwrap();
        assert_eq!(rejected.id, request.id);
        assert!(scheduler.pending_requests().unwrap().is_empty());
        assert_eq!(scheduler.reject_request(&request.id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    /// Fails every write to one chosen collection.
    struct FailingStore {
        inner: MemoryStore,
        failing: Rc<Cell<Option<Collection>>>,
    }

    impl SalonStore for FailingStore {
        fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>> {
            self.inner.read(collection)
        }

        fn write(&mut self, collection: Collection, bytes: Vec<u8>) -> Result<()> {
            if self.failing.get() == Some(collection) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
            }
            self.inner.write(collection, bytes)
        }

        fn remove(&mut self, collection: Collection) -> Result<()> {
            self.inner.remove(collection)
        }
    }

    fn failing_scheduler() -> (Scheduler<FailingStore>, Rc<Cell<Option<Collection>>>) {
        let failing = Rc::new(Cell::new(None));
        let mut scheduler = Scheduler::new(FailingStore {
            inner: MemoryStore::new(),
            failing: Rc::clone(&failing),
        });
        scheduler.init_starter(2).unwrap();
        (scheduler, failing)
    }

    #[test]
    fn client_write_failure_after_confirmation_cannot_double_book() {
        let (mut scheduler, failing) = failing_scheduler();
        let request = scheduler.submit_request(submission("15:00")).unwrap();

        failing.set(Some(Collection::Clients));
        let err = scheduler.confirm_request(&request.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(scheduler.pending_requests().unwrap().is_empty());
        assert_eq!(scheduler.appointments_on("2025-08-18").unwrap().len(), 1);

        failing.set(None);
        let retry = scheduler.confirm_request(&request.id).unwrap_err();
        assert_eq!(retry.kind(), ErrorKind::NotFound);
        assert_eq!(scheduler.appointments_on("2025-08-18").unwrap().len(), 1);
    }

    #[test]
    fn request_write_failure_undoes_the_booking() {
        let (mut scheduler, failing) = failing_scheduler();
        let request = scheduler.submit_request(submission("15:00")).unwrap();

        failing.set(Some(Collection::PendingRequests));
        let err = scheduler.confirm_request(&request.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(scheduler.appointments_on("2025-08-18").unwrap().is_empty());

        failing.set(None);
        assert_eq!(scheduler.pending_requests().unwrap().len(), 1);
        let appt = scheduler.confirm_request(&request.id).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
        assert_eq!(scheduler.appointments_on("2025-08-18").unwrap().len(), 1);
    }

    #[test]
    fn submission_requires_contact_and_valid_time() {
        let mut scheduler = configured(1);
        let no_contact = RequestSubmission { contact: String::new(), ..submission("10:00") };
        for bad in [no_contact, submission("10h")] {
            assert_eq!(
                scheduler.submit_request(bad).unwrap_err().kind(),
                ErrorKind::MalformedInput
            );
        }
        assert!(scheduler.pending_requests().unwrap().is_empty());
    }

    #[test]
    fn client_directory_rejects_duplicate_phones() {
        let mut scheduler = Scheduler::new(MemoryStore::new());
        let carlos = scheduler
            .upsert_client(ClientInput {
                name: "Carlos Pérez".to_string(),
                phone: "+1 809-555-1234".to_string(),
                ..ClientInput::default()
            })
            .unwrap();
        let err = scheduler
            .upsert_client(ClientInput {
                name: "Carla".to_string(),
                phone: "+18095551234".to_string(),
                ..ClientInput::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateContact);
        assert_eq!(scheduler.list_clients("carlos").unwrap().len(), 1);
        scheduler.remove_client(&carlos.id).unwrap();
        assert!(scheduler.list_clients("").unwrap().is_empty());
        let ghost = ClientInput { id: Some(carlos.id.clone()), ..ClientInput::default() };
        assert_eq!(scheduler.upsert_client(ghost).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn remove_and_reset() {
        let mut scheduler = configured(2);
        let appt = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Peinado"))
            .unwrap();
        scheduler
            .validate_and_book(booking("2025-08-19", "10:00", "Peinado"))
            .unwrap();
        scheduler.submit_request(submission("11:00")).unwrap();
        scheduler.remove_appointment(&appt.id).unwrap();
        assert_eq!(scheduler.appointments().unwrap().len(), 1);
        assert_eq!(scheduler.reset().unwrap(), (1, 1));
        assert!(scheduler.appointments().unwrap().is_empty());
        assert!(scheduler.business_config().is_ok());
    }

    #[test]
    fn summary_reads_through_the_store() {
        let mut scheduler = configured(2);
        let appt = scheduler
            .validate_and_book(booking("2025-08-18", "10:00", "Peinado"))
            .unwrap();
        scheduler.change_status(&appt.id, AppointmentStatus::Cancelled).unwrap();
        scheduler
            .validate_and_book(booking("2025-08-18", "11:00", "Corte de Cabello"))
            .unwrap();
        let summary = scheduler.summary(&ReportFilter::default()).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.cancellation_rate, 50);
        assert!(summary.missing_prices);
    }

    #[test]
    fn backup_round_trip_through_scheduler() {
        let mut scheduler = configured(2);
        scheduler
            .upsert_salon_info(SalonInfo {
                name: "Estudio Bella".to_string(),
                ..SalonInfo::default()
            })
            .unwrap();
        scheduler.validate_and_book(booking("2025-08-18", "10:00", "Peinado")).unwrap();
        scheduler.submit_request(submission("12:00")).unwrap();
        scheduler
            .upsert_client(ClientInput {
                name: "Ana".to_string(),
                phone: "555".to_string(),
                ..ClientInput::default()
            })
            .unwrap();

        let bundle = scheduler.export_backup().unwrap();
        let mut restored = Scheduler::new(MemoryStore::new());
        restored.import_backup(&bundle).unwrap();
        for collection in Collection::ALL {
            assert_eq!(
                scheduler.store().read(collection).unwrap(),
                restored.store().read(collection).unwrap()
            );
        }
        assert_eq!(restored.business_config().unwrap().info.name, "Estudio Bella");
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let mut scheduler = configured(2);
        assert_eq!(scheduler.init_starter(3).unwrap_err().kind(), ErrorKind::MalformedInput);
        let mut fresh = Scheduler::new(MemoryStore::new());
        assert!(fresh.init_starter(0).is_err());
        assert!(fresh.business_config().is_err());
    }
}
