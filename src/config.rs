//! Controller configuration parameters
//!
//! All tunable parameters for the pit controller: per-probe calibration
//! and alarms, PID gains, actuator ranges and lid-open behaviour.
//! Loaded through [`ConfigPort`](crate::app::ports::ConfigPort) and applied
//! with [`GrillController::load_config`](crate::app::service::GrillController::load_config).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::drivers::servo::SERVO_REFRESH_US;
use crate::sensors::PROBE_COUNT;
use crate::sensors::convert::{ProbeType, Units};

/// Steinhart-Hart A, B, C and 10 kOhm reference for the stock probes.
pub const DEFAULT_THERMISTOR: [f32; 4] = [2.306_743_4e-4, 2.369_659_6e-4, 1.263_641_4e-7, 1.0e4];

/// Lid-open suppression never lasts less than this (seconds).
pub const LIDOPEN_MIN_AUTORESUME_SECS: u16 = 30;

/// Largest calibration offset accepted for a probe, in display units.
pub const PROBE_OFFSET_MAX: f32 = 127.0;

/// Offsets must be finite and within [`PROBE_OFFSET_MAX`] either way.
pub fn probe_offset_in_range(offset: f32) -> bool {
    offset.is_finite() && offset.abs() <= PROBE_OFFSET_MAX
}

/// Per-probe settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub probe_type: ProbeType,
    /// Steinhart-Hart A, B, C plus reference resistance (or linear scale).
    pub coefficients: [f32; 4],
    /// Added after unit conversion.
    pub offset: f32,
    /// Low alarm threshold; <= 0 disables.
    pub alarm_low: i16,
    /// High alarm threshold; <= 0 disables.
    pub alarm_high: i16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_type: ProbeType::Thermistor,
            coefficients: DEFAULT_THERMISTOR,
            offset: 0.0,
            alarm_low: 0,
            alarm_high: 0,
        }
    }
}

/// PID gains, also used for the per-term contributions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    /// Constant output (percent).
    pub bias: f32,
    /// Percent per degree of error.
    pub proportional: f32,
    /// Percent per degree of error, accumulated per control period.
    pub integral: f32,
    /// Percent per degree of deviation from the smoothed trend.
    pub derivative: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    /// Lowest duty (percent) at which the blower reliably spins.
    pub min_speed: u8,
    /// Duty (percent) that corresponds to 100% controller output.
    pub max_speed: u8,
    /// Super period for sub-minimum duty synthesis.
    pub long_pwm_period_ms: u32,
    /// Kick the blower fully on for one sub-tick when starting from zero.
    pub boost: bool,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            min_speed: 10,
            max_speed: 100,
            long_pwm_period_ms: 10_000,
            boost: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub enabled: bool,
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_pulse_us: 1000,
            max_pulse_us: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputFlags {
    pub invert_fan: bool,
    pub invert_servo: bool,
    /// Fan stays off until the controller asks for 100%.
    pub fan_only_max: bool,
    /// Servo opens fully for any nonzero output.
    pub servo_any_max: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LidOpenConfig {
    /// Percent below setpoint that counts as a lid-open drop.
    pub offset_percent: u8,
    /// Suppression length once triggered.
    pub duration_secs: u16,
}

impl Default for LidOpenConfig {
    fn default() -> Self {
        Self {
            offset_percent: 6,
            duration_secs: 240,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// One full reduce → convert → control → shape cycle.
    pub measure_period_ms: u32,
    /// Sampling sub-ticks per measure period.
    pub samples_per_period: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            measure_period_ms: 1000, // 1 Hz control
            samples_per_period: 8,   // 8 Hz sampling
        }
    }
}

impl TimingConfig {
    pub fn sub_tick_ms(&self) -> u32 {
        self.measure_period_ms / u32::from(self.samples_per_period.max(1))
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub probes: [ProbeConfig; PROBE_COUNT],
    pub pid: PidGains,
    pub set_point: i16,
    pub units: Units,
    pub fan: FanConfig,
    pub servo: ServoConfig,
    pub outputs: OutputFlags,
    pub lid_open: LidOpenConfig,
    pub timing: TimingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            probes: [ProbeConfig::default(); PROBE_COUNT],
            pid: PidGains {
                bias: 0.0,
                proportional: 4.0,
                integral: 0.02,
                derivative: 5.0,
            },
            set_point: 225,
            units: Units::Fahrenheit,
            fan: FanConfig::default(),
            servo: ServoConfig::default(),
            outputs: OutputFlags::default(),
            lid_open: LidOpenConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fan.max_speed > 100 {
            return Err(ConfigError::ValidationFailed("fan.max_speed must be 0–100"));
        }
        if self.fan.min_speed > self.fan.max_speed {
            return Err(ConfigError::ValidationFailed(
                "fan.min_speed must not exceed fan.max_speed",
            ));
        }
        if self.servo.min_pulse_us > self.servo.max_pulse_us {
            return Err(ConfigError::ValidationFailed(
                "servo.min_pulse_us must not exceed servo.max_pulse_us",
            ));
        }
        if u32::from(self.servo.max_pulse_us) >= SERVO_REFRESH_US {
            return Err(ConfigError::ValidationFailed(
                "servo.max_pulse_us must be shorter than the refresh period",
            ));
        }
        if self.lid_open.offset_percent > 100 {
            return Err(ConfigError::ValidationFailed("lid_open.offset_percent must be 0–100"));
        }
        if !self.probes.iter().all(|p| probe_offset_in_range(p.offset)) {
            return Err(ConfigError::ValidationFailed(
                "probes.offset must be finite and within ±127",
            ));
        }
        if self.set_point <= 0 {
            return Err(ConfigError::ValidationFailed("set_point must be positive"));
        }
        if self.timing.measure_period_ms == 0 || self.timing.samples_per_period == 0 {
            return Err(ConfigError::ValidationFailed("timing values must be nonzero"));
        }
        if self.fan.long_pwm_period_ms < self.timing.measure_period_ms {
            return Err(ConfigError::ValidationFailed(
                "fan.long_pwm_period_ms must cover at least one measure period",
            ));
        }
        Ok(())
    }
}
