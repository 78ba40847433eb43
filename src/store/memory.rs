use std::collections::BTreeMap;

use crate::error::Result;
use super::{Collection, SalonStore};

/// Keeps every collection in memory; used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<Collection, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SalonStore for MemoryStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>> {
        Ok(self.collections.get(&collection).cloned())
    }

    fn write(&mut self, collection: Collection, bytes: Vec<u8>) -> Result<()> {
        self.collections.insert(collection, bytes);
        Ok(())
    }

    fn remove(&mut self, collection: Collection) -> Result<()> {
        self.collections.remove(&collection);
        Ok(())
    }
}
