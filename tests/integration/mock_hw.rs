//! Mock hardware adapter for integration tests.
//!
//! Scripted ADC values, a settable clock, and a record of every fan write
//! and servo commit, so tests can assert on the full command history
//! without touching real PWM registers.

use std::cell::{Cell, RefCell};

use pitpid::app::events::AppEvent;
use pitpid::app::ports::{
    AnalogPort, ClockPort, ConfigError, ConfigPort, EventSink, FanPort, ServoPort,
};
use pitpid::config::{ControllerConfig, PidGains, ProbeConfig};
use pitpid::sensors::PROBE_COUNT;
use pitpid::sensors::convert::{ProbeType, Units};
use pitpid::GrillController;

/// Full-scale coefficient that makes one 10-bit count read as 1 °C.
pub const ONE_DEGREE_PER_COUNT: f32 = 1023.75;

pub const SUB_TICK_MS: u32 = 125;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub now_ms: u32,
    pub adc: [u16; PROBE_COUNT],
    pub fan_writes: Vec<u8>,
    pub servo_commits: Vec<u16>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            adc: [0; PROBE_COUNT],
            fan_writes: Vec::new(),
            servo_commits: Vec::new(),
        }
    }

    /// Script a channel to read `celsius` on a one-degree-per-count probe.
    pub fn set_celsius(&mut self, channel: usize, celsius: u16) {
        self.adc[channel] = celsius;
    }

    pub fn last_fan(&self) -> Option<u8> {
        self.fan_writes.last().copied()
    }

    pub fn last_servo(&self) -> Option<u16> {
        self.servo_commits.last().copied()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for MockHardware {
    fn millis(&self) -> u32 {
        self.now_ms
    }
}

impl AnalogPort for MockHardware {
    fn read_analog(&mut self, channel: usize) -> u16 {
        self.adc[channel]
    }
}

impl FanPort for MockHardware {
    fn set_fan_duty(&mut self, duty: u8) {
        self.fan_writes.push(duty);
    }
}

impl ServoPort for MockHardware {
    fn commit_servo_pulse(&mut self, width_us: u16) {
        self.servo_commits.push(width_us);
    }
}

// ── Recording event sink ─────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Mock config store ─────────────────────────────────────────

#[derive(Default)]
pub struct MockConfigStore {
    pub saved: RefCell<Option<ControllerConfig>>,
    pub saves: Cell<u32>,
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.saved.borrow_mut() = Some(config.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Linear probe reading one °C per ADC count.
pub fn linear_probe() -> ProbeConfig {
    ProbeConfig {
        probe_type: ProbeType::Thermocouple,
        coefficients: [0.0, 0.0, 0.0, ONE_DEGREE_PER_COUNT],
        offset: 0.0,
        alarm_low: 0,
        alarm_high: 0,
    }
}

/// Pit and food 1 on linear probes, the rest disabled, Celsius, no boost.
pub fn test_config(set_point: i16, gains: PidGains) -> ControllerConfig {
    let mut c = ControllerConfig::default();
    c.probes = [ProbeConfig {
        probe_type: ProbeType::Disabled,
        ..linear_probe()
    }; PROBE_COUNT];
    c.probes[0] = linear_probe();
    c.probes[1] = linear_probe();
    c.units = Units::Celsius;
    c.set_point = set_point;
    c.pid = gains;
    c.fan.boost = false;
    c
}

pub fn gains(bias: f32, p: f32, i: f32, d: f32) -> PidGains {
    PidGains {
        bias,
        proportional: p,
        integral: i,
        derivative: d,
    }
}

/// Poll in sub-tick steps until `n` full control cycles have run.
pub fn run_cycles(
    ctl: &mut GrillController,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    n: u32,
) {
    let mut done = 0;
    while done < n {
        if ctl.do_work(hw, sink) {
            done += 1;
        }
        hw.now_ms += SUB_TICK_MS;
    }
}
