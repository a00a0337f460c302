//! Outbound controller events.
//!
//! The [`GrillController`](super::service::GrillController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: print the status line on
//! serial, log, drive a buzzer.

use crate::sensors::alarm::AlarmSide;

use super::status::{PidStatusReport, StatusReport};

/// Structured events emitted by the controller core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Controller constructed and configured.
    Started,

    /// A full control cycle finished.
    Status(StatusReport),

    /// PID breakdown for the cycle; only when the pit has a temperature.
    PidStatus(PidStatusReport),

    /// The pit reached its set point for the first time since the latch
    /// was cleared.
    TemperatureReached,

    /// Suppression started.  `inferred` is false for an external signal.
    LidOpened { inferred: bool },

    /// Suppression ended and automatic control resumed.
    LidResumed,

    /// A probe alarm side started ringing.
    AlarmRinging { probe: usize, side: AlarmSide },

    /// Every alarm was silenced (lid open or operator request).
    AlarmsSilenced,

    /// A mutator changed the live configuration.
    ConfigChanged,
}
