//! Inbound commands to the controller.
//!
//! These represent changes requested by the outside world (serial link,
//! buttons, a lid switch, a remote probe receiver) that the
//! [`GrillController`](super::service::GrillController) validates and
//! applies.

use crate::config::ControllerConfig;
use crate::control::pid::PidTerm;
use crate::sensors::alarm::AlarmSide;
use crate::sensors::convert::ProbeType;

/// Commands that external adapters can send into the controller core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Regulate toward a new pit temperature; leaves manual mode.
    SetSetPoint(i16),

    /// Manual mode with a fixed 0–100 output.
    SetManualOutput(u8),

    SetPidConstant { term: PidTerm, value: f32 },

    /// `F`, `C`, `A` (raw) or `R` (resistance).
    SetUnits(char),

    SetLidOpenDuration(u16),
    SetLidOpenOffset(u8),

    /// External lid switch edge.
    LidOpen(bool),

    SetProbeType { probe: usize, probe_type: ProbeType },
    SetProbeOffset { probe: usize, offset: f32 },
    SetProbeCoefficients { probe: usize, coefficients: [f32; 4] },
    SetAlarmThreshold { probe: usize, side: AlarmSide, value: i16 },

    /// Fan speed range in percent.
    SetFanSpeeds { min: u8, max: u8 },

    /// Servo end stops in µs.
    SetServoRange { min_us: u16, max_us: u16 },

    SilenceAlarms,

    /// Oversampled reading from an external probe receiver.
    RemoteSample { probe: usize, value: u16 },

    /// Replace the whole configuration.
    UpdateConfig(ControllerConfig),
}
