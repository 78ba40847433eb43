use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::new_id;
use crate::error::{Result, SchedulerError};

/// A salon client (`clients` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Client data as entered by staff; `id` is set when editing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInput {
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub last_visit: Option<NaiveDate>,
}

/// Keeps digits and a leading '+'
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Client whose normalized phone matches, ignoring `except_id`.
pub fn find_by_phone<'a>(
    clients: &'a [Client],
    phone: &str,
    except_id: Option<&str>,
) -> Option<&'a Client> {
    let wanted = normalize_phone(phone);
    if wanted.is_empty() {
        return None;
    }
    clients
        .iter()
        .find(|c| normalize_phone(&c.phone) == wanted && Some(c.id.as_str()) != except_id)
}

/// Validates and inserts or replaces a client.
pub fn upsert_client(
    clients: &mut Vec<Client>,
    input: ClientInput,
    now: DateTime<Utc>,
) -> Result<Client> {
    let name = input.name.trim().to_string();
    let phone = input.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err(SchedulerError::malformed("name and phone are required"));
    }
    let email = input
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !looks_like_email(email) {
            return Err(SchedulerError::malformed(format!("invalid email '{}'", email)));
        }
    }
    if let Some(existing) = find_by_phone(clients, &phone, input.id.as_deref()) {
        return Err(SchedulerError::DuplicateContact {
            existing: existing.name.clone(),
        });
    }

    let position = input
        .id
        .as_deref()
        .and_then(|id| clients.iter().position(|c| c.id == id));
    let client = Client {
        id: input.id.unwrap_or_else(|| new_id("cli", now)),
        name,
        phone,
        email,
        notes: input.notes.trim().to_string(),
        last_visit: input.last_visit,
        created_at: position.map(|i| clients[i].created_at).unwrap_or(now),
    };
    match position {
        Some(i) => clients[i] = client.clone(),
        None => clients.push(client.clone()),
    }
    Ok(client)
}

/// Registers a client seen through a confirmed request unless the phone is already known.
pub fn add_if_missing(
    clients: &mut Vec<Client>,
    name: &str,
    phone: &str,
    now: DateTime<Utc>,
) -> bool {
    if name.trim().is_empty() || find_by_phone(clients, phone, None).is_some() {
        return false;
    }
    clients.push(Client {
        id: new_id("cli", now),
        name: name.trim().to_string(),
        phone: phone.trim().to_string(),
        email: None,
        notes: String::new(),
        last_visit: None,
        created_at: now,
    });
    true
}

/// Case-insensitive match on name or phone
pub fn search<'a>(clients: &'a [Client], term: &str) -> Vec<&'a Client> {
    let term = term.trim().to_lowercase();
    let mut found: Vec<&Client> = clients
        .iter()
        .filter(|c| {
            term.is_empty()
                || c.name.to_lowercase().contains(&term)
                || c.phone.to_lowercase().contains(&term)
        })
        .collect();
    found.sort_by_key(|c| c.name.to_lowercase());
    found
}
