//! Host simulation of a charcoal pit.
//!
//! A first-order thermal plant driven by blower duty, plus the
//! `embedded-hal` peripherals the controller needs on a real board.
//!
//! ```text
//!   SimBlower ──duty──▶ SimulatedPit ──10-bit reads──▶ AnalogPort
//! ```
//!
//! Probes are modelled as linear analog sensors at 1 °C per ADC count
//! (configure them as thermocouples with a 1023.75 °C full scale).  Reads
//! are dithered across each oversampling burst so the averaged value
//! carries the fractional part.  Channel 2 is left unplugged.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::app::ports::AnalogPort;
use crate::config::ProbeConfig;
use crate::drivers::fan::DUTY_MAX;
use crate::sensors::PROBE_COUNT;
use crate::sensors::convert::ProbeType;
use crate::sensors::sampler::{ADC_READ_MAX, OVERSAMPLE_COUNT};

/// Full-scale coefficient that maps one 10-bit count to 1 °C.
pub const LINEAR_FULL_SCALE_C: f32 = 1023.75;

/// Probe settings matching the simulated sensors.
pub const SIM_PROBE: ProbeConfig = ProbeConfig {
    probe_type: ProbeType::Thermocouple,
    coefficients: [0.0, 0.0, 0.0, LINEAR_FULL_SCALE_C],
    offset: 0.0,
    alarm_low: 0,
    alarm_high: 0,
};

const PIT_CHANNEL: usize = 0;
const FOOD_CHANNEL: usize = 1;
const AMBIENT_CHANNEL: usize = 3;

/// Rise above ambient with the blower off / fully on (°C).
const IDLE_RISE_C: f32 = 60.0;
const BLOWER_RISE_C: f32 = 220.0;
/// Pit time constant, closed and open (s).
const PIT_TAU_SECS: f32 = 300.0;
const LID_TAU_SECS: f32 = 40.0;
/// Food lags the pit by a lot.
const FOOD_TAU_SECS: f32 = 3600.0;

/// Blower duty shared between the PWM channel and the plant.
pub type BlowerDuty = Arc<AtomicU16>;

pub struct SimulatedPit {
    ambient_c: f32,
    pit_c: f32,
    food_c: f32,
    blower: BlowerDuty,
    lid_open_ms: u32,
    burst_pos: [usize; PROBE_COUNT],
}

impl SimulatedPit {
    pub fn new(ambient_c: f32, blower: BlowerDuty) -> Self {
        Self {
            ambient_c,
            pit_c: ambient_c,
            food_c: ambient_c,
            blower,
            lid_open_ms: 0,
            burst_pos: [0; PROBE_COUNT],
        }
    }

    /// Hold the lid open for `ms` of simulated time.
    pub fn open_lid(&mut self, ms: u32) {
        self.lid_open_ms = ms;
    }

    pub fn is_lid_open(&self) -> bool {
        self.lid_open_ms > 0
    }

    pub fn pit_c(&self) -> f32 {
        self.pit_c
    }

    pub fn food_c(&self) -> f32 {
        self.food_c
    }

    fn blower_fraction(&self) -> f32 {
        f32::from(self.blower.load(Ordering::Relaxed)) / f32::from(DUTY_MAX)
    }

    /// Advance the plant by `ms` of simulated time.
    pub fn step(&mut self, ms: u32) {
        let dt = ms as f32 / 1000.0;
        let (target, tau) = if self.lid_open_ms > 0 {
            self.lid_open_ms = self.lid_open_ms.saturating_sub(ms);
            (self.ambient_c + IDLE_RISE_C * 0.5, LID_TAU_SECS)
        } else {
            let rise = IDLE_RISE_C + BLOWER_RISE_C * self.blower_fraction();
            (self.ambient_c + rise, PIT_TAU_SECS)
        };
        self.pit_c += (target - self.pit_c) * (dt / tau).min(1.0);
        self.food_c += (self.pit_c - self.food_c) * (dt / FOOD_TAU_SECS).min(1.0);
    }

    fn dithered_read(&mut self, channel: usize, temp_c: f32) -> u16 {
        let pos = self.burst_pos[channel];
        self.burst_pos[channel] = (pos + 1) % OVERSAMPLE_COUNT;
        let base = temp_c.floor();
        let frac_steps = ((temp_c - base) * OVERSAMPLE_COUNT as f32) as usize;
        let read = base as i32 + i32::from(pos < frac_steps);
        read.clamp(0, i32::from(ADC_READ_MAX)) as u16
    }
}

impl AnalogPort for SimulatedPit {
    fn read_analog(&mut self, channel: usize) -> u16 {
        match channel {
            PIT_CHANNEL => self.dithered_read(channel, self.pit_c),
            FOOD_CHANNEL => self.dithered_read(channel, self.food_c),
            AMBIENT_CHANNEL => self.dithered_read(channel, self.ambient_c),
            // Unplugged jack floats to the rail.
            _ => ADC_READ_MAX,
        }
    }
}

/// Blower PWM channel that reports its duty to the plant.
pub struct SimBlower {
    duty: BlowerDuty,
}

impl SimBlower {
    pub fn new(duty: BlowerDuty) -> Self {
        Self { duty }
    }
}

impl pwm::ErrorType for SimBlower {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for SimBlower {
    fn max_duty_cycle(&self) -> u16 {
        u16::from(DUTY_MAX)
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.store(duty, Ordering::Relaxed);
        Ok(())
    }
}

/// Servo output pin that counts frames.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    rising_edges: u32,
}

impl SimPin {
    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl digital::ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}
