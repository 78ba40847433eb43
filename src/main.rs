mod booking;
mod calendar;
mod clients;
mod clock;
mod display;
mod error;
mod reports;
mod scheduler;
mod settings;
mod store;
mod web;

use tracing_subscriber::EnvFilter;

use clock::parse_date;
use display::{print_agenda, print_availability, print_summary, write_agenda_to_file};
use reports::ReportFilter;
use scheduler::{BookingRequest, Scheduler};
use settings::Settings;
use store::JsonFileStore;

const USAGE: &str = "usage:
  salon-scheduler web [port]
  salon-scheduler init <capacity>
  salon-scheduler slots <date> <service>
  salon-scheduler book <date> <time> <service> <client> [contact]
  salon-scheduler status <appointment-id> <pending|confirmed|completed|cancelled>
  salon-scheduler agenda <date> [output-file]
  salon-scheduler report [from] [to]
  salon-scheduler reminders [hours]
  salon-scheduler backup <file>
  salon-scheduler restore <file>";

fn arg<'a>(
    args: &'a [String],
    index: usize,
    name: &str,
) -> Result<&'a str, Box<dyn std::error::Error>> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing <{}>\n{}", name, USAGE).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let settings = Settings::from_env();

    // Check if we should run in web mode
    if args.len() > 1 && args[1] == "web" {
        let settings = settings.with_port_arg(args.get(2));
        println!("Starting web server on port {}...", settings.port);
        println!("Data directory: {}", settings.data_dir.display());
        println!("Access the API at http://localhost:{}/api", settings.port);

        web::start_server(settings).await?;
        return Ok(());
    }

    let mut scheduler = Scheduler::new(JsonFileStore::open(&settings.data_dir)?);
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    match command {
        "init" => {
            let capacity: u32 = arg(&args, 2, "capacity")?.parse()?;
            let config = scheduler.init_starter(capacity)?;
            println!(
                "Created starter configuration: capacity {}, {} services",
                config.policies.max_concurrent_appointments,
                config.services.len()
            );
        }
        "slots" => {
            let availability =
                scheduler.get_available_slots(arg(&args, 2, "date")?, arg(&args, 3, "service")?)?;
            print_availability(&availability);
        }
        "book" => {
            let appointment = scheduler.validate_and_book(BookingRequest {
                date: arg(&args, 2, "date")?.to_string(),
                time: arg(&args, 3, "time")?.to_string(),
                service_name: arg(&args, 4, "service")?.to_string(),
                client_label: arg(&args, 5, "client")?.to_string(),
                contact: args.get(6).cloned(),
                notes: None,
                confirm: true,
            })?;
            println!(
                "Booked {} for {} at {} (ID: {})",
                appointment.service_name,
                appointment.client_label,
                appointment.start,
                appointment.id
            );
        }
        "status" => {
            let status: booking::AppointmentStatus = arg(&args, 3, "status")?.parse()?;
            let appointment = scheduler.change_status(arg(&args, 2, "appointment-id")?, status)?;
            println!("{} is now {}", appointment.id, appointment.status);
        }
        "agenda" => {
            let date = arg(&args, 2, "date")?;
            let appointments = scheduler.appointments_on(date)?;
            print_agenda(date, &appointments);
            if let Some(filename) = args.get(3) {
                write_agenda_to_file(date, &appointments, filename)?;
                println!("Agenda saved to {}", filename);
            }
        }
        "report" => {
            let filter = ReportFilter {
                from: args.get(2).map(|d| parse_date(d)).transpose()?,
                to: args.get(3).map(|d| parse_date(d)).transpose()?,
                ..ReportFilter::default()
            };
            print_summary(&scheduler.summary(&filter)?);
        }
        "reminders" => {
            let hours: u32 = match args.get(2) {
                Some(h) => h.parse()?,
                None => 24,
            };
            let upcoming = scheduler.upcoming_reminders(hours)?;
            println!("Appointments in the next {} hours: {}", hours, upcoming.len());
            for appointment in &upcoming {
                println!(
                    "  {} {} - {}",
                    appointment.start.format("%Y-%m-%d %H:%M"),
                    display::format_client(appointment),
                    appointment.service_name
                );
            }
        }
        "backup" => {
            let filename = arg(&args, 2, "file")?;
            std::fs::write(filename, scheduler.export_backup()?)?;
            println!("Backup saved to {}", filename);
        }
        "restore" => {
            let filename = arg(&args, 2, "file")?;
            let bundle = scheduler.import_backup(&std::fs::read(filename)?)?;
            println!(
                "Restored {} appointments, {} pending requests, {} clients",
                bundle.appointments.len(),
                bundle.pending_requests.len(),
                bundle.clients.len()
            );
        }
        _ => println!("{}", USAGE),
    }

    Ok(())
}
