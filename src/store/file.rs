use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use super::{Collection, SalonStore};

/// One pretty-printed JSON file per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileStore { dir })
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.key()))
    }
}

impl SalonStore for JsonFileStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(collection)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // temp file + rename: readers never observe a partially written collection
    fn write(&mut self, collection: Collection, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(collection);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(
            collection = collection.key(),
            bytes = bytes.len(),
            path = %path.display(),
            "collection saved"
        );
        Ok(())
    }

    fn remove(&mut self, collection: Collection) -> Result<()> {
        match fs::remove_file(self.path_for(collection)) {
            Ok(()) => {
                debug!(collection = collection.key(), "collection removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
