//! Configuration storage adapters.
//!
//! Both implement [`ConfigPort`] and validate before persisting.
//!
//! - [`MemoryConfigStore`] keeps a `postcard` blob in a fixed-capacity
//!   slot, the same shape an EEPROM or flash page would have.
//! - [`JsonFileConfigStore`] reads and writes human-editable JSON for the
//!   host simulation.

use std::cell::RefCell;
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError};
use crate::config::ControllerConfig;

/// Largest blob the in-memory slot accepts (bytes).
pub const MAX_BLOB_SIZE: usize = 512;

pub struct MemoryConfigStore {
    slot: RefCell<Option<Vec<u8>>>,
    capacity: usize,
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BLOB_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slot: RefCell::new(None),
            capacity,
        }
    }

    fn write_blob(&self, bytes: Vec<u8>) -> Result<(), StorageError> {
        if bytes.len() > self.capacity {
            return Err(StorageError::Full);
        }
        *self.slot.borrow_mut() = Some(bytes);
        Ok(())
    }

    /// Overwrite the slot with arbitrary bytes (simulates flash corruption).
    pub fn write_raw(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.write_blob(bytes.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

impl ConfigPort for MemoryConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        match self.slot.borrow().as_deref() {
            Some(bytes) => {
                let cfg: ControllerConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                info!("MemoryConfigStore: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("MemoryConfigStore: no stored config, using defaults");
                Ok(ControllerConfig::default())
            }
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::Io)?;
        self.write_blob(bytes)?;
        Ok(())
    }
}

/// JSON file on the host filesystem.
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for JsonFileConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{}: not found, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => {
                warn!("{}: {}", self.path.display(), e);
                return Err(ConfigError::Io);
            }
        };
        let cfg: ControllerConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("{}: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Io)?;
        std::fs::write(&self.path, text).map_err(|_| ConfigError::Io)
    }
}
