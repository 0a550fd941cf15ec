//! # Device Store
//!
//! Persistence of learned-in devices. The dispatcher remembers a record for
//! every logical device created by learn-in and forgets it only on explicit
//! request, so a device learned out keeps its record until it is removed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DeviceRecord;
use crate::error::{EnoceanError, Result};
use crate::esp3::EnoceanAddress;

/// Storage for learned-in device records
pub trait DeviceStore: Send {
    /// All stored records, ordered by address and subdevice
    fn load(&self) -> Result<Vec<DeviceRecord>>;

    /// Insert or replace the record for `(address, subdevice)`
    fn remember(&mut self, record: DeviceRecord) -> Result<()>;

    /// Delete the record for `(address, subdevice)`, if any
    fn forget(&mut self, address: EnoceanAddress, subdevice: u8) -> Result<()>;
}

/// Volatile store, used when no store file is configured
#[derive(Debug, Default, Clone)]
pub struct MemoryDeviceStore {
    records: BTreeMap<(EnoceanAddress, u8), DeviceRecord>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with records
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key(), r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn load(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.records.values().copied().collect())
    }

    fn remember(&mut self, record: DeviceRecord) -> Result<()> {
        self.records.insert(record.key(), record);
        Ok(())
    }

    fn forget(&mut self, address: EnoceanAddress, subdevice: u8) -> Result<()> {
        self.records.remove(&(address, subdevice));
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default, rename = "device")]
    devices: Vec<DeviceRecord>,
}

/// Store persisted as a TOML file with one `[[device]]` table per record
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct FileDeviceStore {
    path: PathBuf,
    cache: MemoryDeviceStore,
}

impl FileDeviceStore {
    /// Open a store file; a missing file is an empty store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: StoreFile = toml::from_str(&contents)?;
            MemoryDeviceStore::with_records(file.devices)
        } else {
            MemoryDeviceStore::new()
        };
        debug!("Opened device store {} ({} records)", path.display(), cache.len());
        Ok(Self { path, cache })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let file = StoreFile {
            devices: self.cache.load()?,
        };
        let contents = toml::to_string(&file)
            .map_err(|e| EnoceanError::Protocol(format!("Failed to encode device store: {}", e)))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl DeviceStore for FileDeviceStore {
    fn load(&self) -> Result<Vec<DeviceRecord>> {
        self.cache.load()
    }

    fn remember(&mut self, record: DeviceRecord) -> Result<()> {
        self.cache.remember(record)?;
        self.save()
    }

    fn forget(&mut self, address: EnoceanAddress, subdevice: u8) -> Result<()> {
        self.cache.forget(address, subdevice)?;
        self.save()
    }
}
