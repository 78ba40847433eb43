use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::booking::AppointmentStatus;
use crate::calendar::{BusinessHours, HolidaySet, Policies, SalonInfo, ServiceDefinition};
use crate::clients::ClientInput;
use crate::error::{ErrorKind, SchedulerError};
use crate::reports::ReportFilter;
use crate::scheduler::{BookingRequest, RequestSubmission, Scheduler};
use crate::settings::Settings;
use crate::store::{JsonFileStore, SalonStore};

pub type SharedStore = Box<dyn SalonStore + Send>;

type Reply = Result<HttpResponse, SchedulerError>;

/// Upper bound for request bodies, sized for `/api/restore` bundles of a busy salon.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// One scheduler for the whole server; the mutex serializes every read-validate-write cycle.
pub struct AppState {
    pub scheduler: Mutex<Scheduler<SharedStore>>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        AppState {
            scheduler: Mutex::new(Scheduler::new(store)),
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler<SharedStore>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResponseError for SchedulerError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::CapacityExceeded
            | ErrorKind::DuplicateContact
            | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
            ErrorKind::ClosedDay
            | ErrorKind::Holiday
            | ErrorKind::OutsideHours
            | ErrorKind::CrossesBreak => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotConfigured => StatusCode::PRECONDITION_FAILED,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "error": self.to_string(),
        }))
    }
}

fn ok<T: Serialize>(data: T) -> Reply {
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "data": data})))
}

#[derive(Deserialize)]
pub struct InitRequest {
    capacity: u32,
}

#[derive(Deserialize)]
pub struct SlotQuery {
    date: String,
    service: String,
}

#[derive(Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusChange {
    status: AppointmentStatus,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    search: String,
}

#[derive(Deserialize)]
pub struct ReminderQuery {
    hours: Option<u32>,
}

// Configuration endpoints
async fn get_config(state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().business_config()?)
}

async fn init_config(req: web::Json<InitRequest>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().init_starter(req.capacity)?)
}

async fn put_policies(req: web::Json<Policies>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upsert_policies(req.into_inner())?)
}

async fn put_hours(req: web::Json<BusinessHours>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upsert_business_hours(req.into_inner())?)
}

async fn put_holidays(req: web::Json<HolidaySet>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().set_holidays(req.into_inner())?)
}

async fn add_holiday(date: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().add_holiday(&date)?)
}

async fn remove_holiday(date: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().remove_holiday(&date)?)
}

async fn put_info(req: web::Json<SalonInfo>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upsert_salon_info(req.into_inner())?)
}

async fn list_services(state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().active_services()?)
}

async fn upsert_service(req: web::Json<ServiceDefinition>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upsert_service_definition(req.into_inner())?)
}

// Availability and appointments
async fn get_slots(query: web::Query<SlotQuery>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().get_available_slots(&query.date, &query.service)?)
}

async fn list_appointments(query: web::Query<DateQuery>, state: web::Data<AppState>) -> Reply {
    let scheduler = state.scheduler();
    match query.date.as_deref() {
        Some(date) => ok(scheduler.appointments_on(date)?),
        None => ok(scheduler.appointments()?),
    }
}

async fn book(req: web::Json<BookingRequest>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().validate_and_book(req.into_inner())?)
}

async fn change_status(
    id: web::Path<String>,
    req: web::Json<StatusChange>,
    state: web::Data<AppState>,
) -> Reply {
    ok(state.scheduler().change_status(&id, req.status)?)
}

async fn remove_appointment(id: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().remove_appointment(&id)?)
}

async fn reset(state: web::Data<AppState>) -> Reply {
    let (appointments, requests) = state.scheduler().reset()?;
    ok(serde_json::json!({"appointments": appointments, "requests": requests}))
}

// Pending requests
async fn list_requests(state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().pending_requests()?)
}

async fn submit_request(req: web::Json<RequestSubmission>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().submit_request(req.into_inner())?)
}

async fn confirm_request(id: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().confirm_request(&id)?)
}

async fn reject_request(id: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().reject_request(&id)?)
}

// Clients
async fn list_clients(query: web::Query<SearchQuery>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().list_clients(&query.search)?)
}

async fn upsert_client(req: web::Json<ClientInput>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upsert_client(req.into_inner())?)
}

async fn remove_client(id: web::Path<String>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().remove_client(&id)?)
}

// Reports
async fn summary(query: web::Query<ReportFilter>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().summary(&query)?)
}

async fn reminders(query: web::Query<ReminderQuery>, state: web::Data<AppState>) -> Reply {
    ok(state.scheduler().upcoming_reminders(query.hours.unwrap_or(24))?)
}

// Backup
async fn export_backup(state: web::Data<AppState>) -> Reply {
    let bytes = state.scheduler().export_backup()?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header(("Content-Disposition", "attachment; filename=\"salon-backup.json\""))
        .body(bytes))
}

async fn import_backup(body: web::Bytes, state: web::Data<AppState>) -> Reply {
    let bundle = state.scheduler().import_backup(&body)?;
    ok(serde_json::json!({
        "appointments": bundle.appointments.len(),
        "pendingRequests": bundle.pending_requests.len(),
        "clients": bundle.clients.len(),
        "businessConfig": bundle.business_config.is_some(),
    }))
}

/// Registers every API route. Malformed JSON or query strings answer in the same error shape.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .app_data(
            web::JsonConfig::default()
                .limit(MAX_BODY_BYTES)
                .error_handler(|err, _| SchedulerError::malformed(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _| SchedulerError::malformed(err.to_string()).into()),
        )
        .route("/api/config", web::get().to(get_config))
        .route("/api/init", web::post().to(init_config))
        .route("/api/config/policies", web::put().to(put_policies))
        .route("/api/config/hours", web::put().to(put_hours))
        .route("/api/config/holidays", web::put().to(put_holidays))
        .route("/api/config/holidays/{date}", web::post().to(add_holiday))
        .route("/api/config/holidays/{date}", web::delete().to(remove_holiday))
        .route("/api/config/info", web::put().to(put_info))
        .route("/api/services", web::get().to(list_services))
        .route("/api/services", web::post().to(upsert_service))
        .route("/api/slots", web::get().to(get_slots))
        .route("/api/appointments", web::get().to(list_appointments))
        .route("/api/appointments", web::post().to(book))
        .route("/api/appointments/{id}/status", web::put().to(change_status))
        .route("/api/appointments/{id}", web::delete().to(remove_appointment))
        .route("/api/reset", web::post().to(reset))
        .route("/api/requests", web::get().to(list_requests))
        .route("/api/requests", web::post().to(submit_request))
        .route("/api/requests/{id}/confirm", web::post().to(confirm_request))
        .route("/api/requests/{id}", web::delete().to(reject_request))
        .route("/api/clients", web::get().to(list_clients))
        .route("/api/clients", web::post().to(upsert_client))
        .route("/api/clients/{id}", web::delete().to(remove_client))
        .route("/api/reports/summary", web::get().to(summary))
        .route("/api/reminders", web::get().to(reminders))
        .route("/api/backup", web::get().to(export_backup))
        .route("/api/restore", web::post().to(import_backup));
}

pub async fn start_server(settings: Settings) -> std::io::Result<()> {
    let store = JsonFileStore::open(&settings.data_dir)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let app_state = web::Data::new(AppState::new(Box::new(store)));
    info!(port = settings.port, data_dir = %settings.data_dir.display(), "starting web server");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await
}
