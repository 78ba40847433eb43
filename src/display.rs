use std::fs::File;
use std::io::Write;

use crate::booking::Appointment;
use crate::reports::Summary;
use crate::scheduler::Availability;

/// Formats a client label with the contact when known
pub fn format_client(appointment: &Appointment) -> String {
    match appointment.contact.as_deref() {
        Some(contact) if !contact.is_empty() => {
            format!("{} ({})", appointment.client_label, contact)
        }
        _ => appointment.client_label.clone(),
    }
}

fn agenda_line(appointment: &Appointment) -> String {
    let end = appointment
        .end
        .map(|e| e.format("%H:%M").to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{}-{} {} | {} [{}]",
        appointment.start.format("%H:%M"),
        end,
        appointment.service_name,
        format_client(appointment),
        appointment.status
    )
}

/// Writes a day agenda to a file, one appointment per line: HH:MM-HH:MM service | client [status]
pub fn write_agenda_to_file(
    date: &str,
    appointments: &[Appointment],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** {} **", date)?;
    if appointments.is_empty() {
        writeln!(file, "[NO APPOINTMENTS]")?;
    }
    for appointment in appointments {
        writeln!(file, "{}", agenda_line(appointment))?;
    }

    Ok(())
}

/// Prints a day agenda in a readable format
pub fn print_agenda(date: &str, appointments: &[Appointment]) {
    println!("\n=== Agenda for {} ===", date);
    println!("Total appointments: {}", appointments.len());
    for appointment in appointments {
        println!("  {} (ID: {})", agenda_line(appointment), appointment.id);
    }
}

pub fn print_availability(availability: &Availability) {
    println!(
        "\n=== {} on {} ({} min) ===",
        availability.service, availability.date, availability.duration_minutes
    );
    if let Some(reason) = &availability.reason {
        println!("Closed: {}", reason);
        return;
    }
    if availability.slots.is_empty() {
        println!("No open slots");
        return;
    }
    for row in availability.slots.chunks(8) {
        println!("  {}", row.join("  "));
    }
}

pub fn print_summary(summary: &Summary) {
    println!("\n=== Report ===");
    println!("Appointments: {}", summary.total);
    println!(
        "  pending {} | confirmed {} | completed {} | cancelled {}",
        summary.by_status.pending,
        summary.by_status.confirmed,
        summary.by_status.completed,
        summary.by_status.cancelled
    );
    println!("Cancellation rate: {}%", summary.cancellation_rate);
    println!("Booked hours: {:.1} h", summary.booked_minutes as f64 / 60.0);
    if summary.revenue > 0.0 {
        println!("Revenue: {:.2}", summary.revenue);
    } else {
        println!("Revenue: -");
    }
    if summary.missing_prices {
        println!("⚠️  Some services have no price configured");
    }

    println!("\nBy day:");
    for (day, count) in &summary.per_day {
        println!("  {} -> {}", day, count);
    }
    println!("\nBy service:");
    for (service, count) in &summary.per_service {
        println!("  {} -> {}", service, count);
    }
}
