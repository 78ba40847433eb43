//! Whole-salon backup and restore.
//!
//! A bundle holds the four collections under their stable keys. Restoring a
//! bundle rewrites each collection through the same serializer, so
//! export -> import into an empty store reproduces the original bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::booking::{Appointment, PendingRequest};
use crate::calendar::BusinessConfig;
use crate::clients::Client;
use crate::error::{Result, SchedulerError};
use super::{Collection, SalonStore};

pub const BACKUP_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub appointments: Vec<Appointment>,
    pub pending_requests: Vec<PendingRequest>,
    pub clients: Vec<Client>,
    pub business_config: Option<BusinessConfig>,
}

impl BackupBundle {
    pub fn capture<S: SalonStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(BackupBundle {
            format_version: BACKUP_FORMAT_VERSION,
            exported_at: Utc::now(),
            appointments: store.load_appointments()?,
            pending_requests: store.load_pending_requests()?,
            clients: store.load_clients()?,
            business_config: store.load_business_config()?,
        })
    }
}

/// Serializes every collection of `store` into one opaque JSON document.
pub fn export_backup<S: SalonStore + ?Sized>(store: &S) -> Result<Vec<u8>> {
    let bundle = BackupBundle::capture(store)?;
    info!(
        appointments = bundle.appointments.len(),
        pending = bundle.pending_requests.len(),
        clients = bundle.clients.len(),
        "backup exported"
    );
    Ok(serde_json::to_vec_pretty(&bundle)?)
}

/// Replaces every collection of `store` with the bundle's, including an absent configuration.
/// Nothing is written unless the whole bundle parses and validates.
pub fn import_backup<S: SalonStore + ?Sized>(
    store: &mut S,
    bytes: &[u8],
) -> Result<BackupBundle> {
    let bundle: BackupBundle = serde_json::from_slice(bytes)
        .map_err(|e| SchedulerError::malformed(format!("invalid backup file: {}", e)))?;
    if bundle.format_version != BACKUP_FORMAT_VERSION {
        return Err(SchedulerError::malformed(format!(
            "unsupported backup version {}",
            bundle.format_version
        )));
    }
    if let Some(config) = &bundle.business_config {
        config.validate()?;
    }

    store.save_appointments(&bundle.appointments)?;
    store.save_pending_requests(&bundle.pending_requests)?;
    store.save_clients(&bundle.clients)?;
    match &bundle.business_config {
        Some(config) => store.save_business_config(config)?,
        None => store.remove(Collection::BusinessConfig)?,
    }
    info!(exported_at = %bundle.exported_at, "backup restored");
    Ok(bundle)
}
