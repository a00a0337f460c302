//! Unified error types for the pit controller.
//!
//! The control path itself never fails: sensor faults degrade to an
//! "undefined" temperature and the PID guard holds the fan at zero.
//! Errors only surface where outside input enters the system (mutators,
//! configuration loading).  All variants are `Copy` so they can be passed
//! around and logged without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A probe index outside `0..PROBE_COUNT` was supplied.
    InvalidProbe(usize),
    /// A unit mode character other than `F`, `C`, `A` or `R`.
    InvalidUnits(char),
    /// A probe type code that does not name a known type.
    InvalidProbeType(u8),
    /// A PID term index other than 0..=3.
    InvalidPidTerm(u8),
    /// Configuration rejected or could not be loaded.
    Config(&'static str),
    /// Persistent storage failed.
    Storage(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProbe(idx) => write!(f, "no probe at index {idx}"),
            Self::InvalidUnits(c) => write!(f, "unknown unit mode '{c}'"),
            Self::InvalidProbeType(t) => write!(f, "unknown probe type {t}"),
            Self::InvalidPidTerm(t) => write!(f, "unknown PID term {t}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Storage(msg) => write!(f, "storage: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Io => Self::Config("I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::Storage("key not found"),
            StorageError::Full => Self::Storage("storage full"),
            StorageError::Io => Self::Storage("I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
