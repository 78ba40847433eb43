//! Storage collaborator: four independently loadable collections.
//!
//! Stores only move bytes around; the typed accessors serialize with
//! `serde_json` so every backend writes identical bytes for identical data.

pub mod memory;
pub mod file;
pub mod backup;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::booking::{Appointment, PendingRequest};
use crate::calendar::BusinessConfig;
use crate::clients::Client;
use crate::error::Result;

pub use memory::MemoryStore;
pub use file::JsonFileStore;
pub use backup::{export_backup, import_backup, BackupBundle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Appointments,
    PendingRequests,
    Clients,
    BusinessConfig,
}

impl Collection {
    #[cfg(test)]
    pub const ALL: [Collection; 4] = [
        Collection::Appointments,
        Collection::PendingRequests,
        Collection::Clients,
        Collection::BusinessConfig,
    ];

    /// Stable identifier of the collection
    pub fn key(self) -> &'static str {
        match self {
            Collection::Appointments => "appointments",
            Collection::PendingRequests => "pendingRequests",
            Collection::Clients => "clients",
            Collection::BusinessConfig => "businessConfig",
        }
    }
}

pub trait SalonStore {
    /// Serialized collection, or `None` if it was never written.
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>>;

    fn write(&mut self, collection: Collection, bytes: Vec<u8>) -> Result<()>;

    /// Forgets a collection so the next read returns `None`. Removing an absent collection is fine.
    fn remove(&mut self, collection: Collection) -> Result<()>;

    fn load_appointments(&self) -> Result<Vec<Appointment>> {
        Ok(load(self, Collection::Appointments)?.unwrap_or_default())
    }

    fn save_appointments(&mut self, appointments: &[Appointment]) -> Result<()> {
        save(self, Collection::Appointments, &appointments)
    }

    fn load_pending_requests(&self) -> Result<Vec<PendingRequest>> {
        Ok(load(self, Collection::PendingRequests)?.unwrap_or_default())
    }

    fn save_pending_requests(&mut self, requests: &[PendingRequest]) -> Result<()> {
        save(self, Collection::PendingRequests, &requests)
    }

    fn load_clients(&self) -> Result<Vec<Client>> {
        Ok(load(self, Collection::Clients)?.unwrap_or_default())
    }

    fn save_clients(&mut self, clients: &[Client]) -> Result<()> {
        save(self, Collection::Clients, &clients)
    }

    fn load_business_config(&self) -> Result<Option<BusinessConfig>> {
        load(self, Collection::BusinessConfig)
    }

    fn save_business_config(&mut self, config: &BusinessConfig) -> Result<()> {
        save(self, Collection::BusinessConfig, config)
    }
}

fn load<S, T>(store: &S, collection: Collection) -> Result<Option<T>>
where
    S: SalonStore + ?Sized,
    T: DeserializeOwned,
{
    match store.read(collection)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn save<S, T>(store: &mut S, collection: Collection, value: &T) -> Result<()>
where
    S: SalonStore + ?Sized,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    store.write(collection, bytes)
}

impl<S: SalonStore + ?Sized> SalonStore for Box<S> {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>> {
        (**self).read(collection)
    }

    fn write(&mut self, collection: Collection, bytes: Vec<u8>) -> Result<()> {
        (**self).write(collection, bytes)
    }

    fn remove(&mut self, collection: Collection) -> Result<()> {
        (**self).remove(collection)
    }
}
