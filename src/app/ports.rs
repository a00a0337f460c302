//! Port traits: the hexagonal boundary between the controller and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GrillController (domain)
//! ```
//!
//! Driven adapters (clock, ADC, blower PWM, servo pulse cell, event sinks,
//! config storage) implement these traits.  The
//! [`GrillController`](super::service::GrillController) consumes them via
//! generics, so the control core never touches hardware directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::ControllerConfig;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.  Wraps after ~49 days; callers
/// compare with `wrapping_sub`.
pub trait ClockPort {
    fn millis(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Analog port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One raw 10-bit conversion per call.  0 and 1023 are the rails and are
/// treated as "sensor likely invalid" by the sampler.
pub trait AnalogPort {
    fn read_analog(&mut self, channel: usize) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Blower PWM output.
pub trait FanPort {
    /// Write an 8-bit hardware duty (inversion already applied).
    fn set_fan_duty(&mut self, duty: u8);
}

/// Commit point for the servo pulse width.  The interrupt-driven
/// [`ServoPulseGenerator`](crate::drivers::servo::ServoPulseGenerator)
/// picks the value up on its next frame; this never blocks.
pub trait ServoPort {
    fn commit_servo_pulse(&mut self, width_us: u16);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / status link)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial status line,
/// log, display).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Nothing stored yet (first boot).
    NotFound,
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Backend I/O failure.
    Io,
}

/// Errors from the raw blob storage behind a [`ConfigPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    Io,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full | StorageError::Io => Self::Io,
        }
    }
}
