//! Servo damper output.
//!
//! The control loop only commits a target pulse width; the pulse train
//! itself is regenerated by a periodic compare interrupt that reads the
//! committed value and nothing else.
//!
//! ```text
//!   control tick ──store──▶ ServoPulse (AtomicU16) ──load──▶ compare ISR ──▶ pin
//! ```
//!
//! ## ISR contract
//!
//! The interrupt context never blocks, never allocates and never touches
//! controller state.  [`ServoPulse`] is a single 16-bit atomic, so the ISR
//! observes either the old or the new width, never a mix.

use core::sync::atomic::{AtomicU16, Ordering};

use embedded_hal::digital::OutputPin;

use crate::config::{OutputFlags, ServoConfig};

/// Servo frame length (µs).
pub const SERVO_REFRESH_US: u32 = 20_000;

/// Last committed pulse width, shared with the compare interrupt.
pub struct ServoPulse(AtomicU16);

impl ServoPulse {
    /// A zero width keeps the pin low for the whole frame.
    pub const fn new() -> Self {
        Self(AtomicU16::new(0))
    }

    /// Commit a new width (µs).  Safe to call while the ISR is running.
    pub fn store(&self, width_us: u16) {
        self.0.store(width_us, Ordering::Release);
    }

    pub fn load(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for ServoPulse {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse width for a controller output, end stops and flags applied.
pub fn servo_pulse_us(output: u8, config: &ServoConfig, flags: &OutputFlags) -> u16 {
    let mut output = u32::from(output.min(100));
    if flags.servo_any_max && output > 0 {
        output = 100;
    }
    if flags.invert_servo {
        output = 100 - output;
    }
    let min = u32::from(config.min_pulse_us);
    let span = u32::from(config.max_pulse_us.saturating_sub(config.min_pulse_us));
    (min + span * output / 100) as u16
}

/// What the compare timer should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextCompare {
    /// Counter value (µs) at which to fire again.
    pub compare_us: u32,
    /// Restart the counter from zero (start of a new frame).
    pub reset_counter: bool,
}

/// Interrupt half of the servo output.
///
/// Call [`on_compare`](Self::on_compare) from the timer compare ISR with
/// the free-running counter value.  The generator alternates between the
/// rising edge at frame start and the falling edge at the committed width.
pub struct ServoPulseGenerator<'a, P: OutputPin> {
    pin: P,
    pulse: &'a ServoPulse,
}

impl<'a, P: OutputPin> ServoPulseGenerator<'a, P> {
    pub fn new(pin: P, pulse: &'a ServoPulse) -> Self {
        Self { pin, pulse }
    }

    pub fn on_compare(&mut self, counter_us: u32) -> Result<NextCompare, P::Error> {
        if counter_us < SERVO_REFRESH_US {
            // Falling edge: idle for the rest of the frame.
            self.pin.set_low()?;
            Ok(NextCompare {
                compare_us: SERVO_REFRESH_US,
                reset_counter: false,
            })
        } else {
            let width = u32::from(self.pulse.load());
            if width == 0 {
                return Ok(NextCompare {
                    compare_us: SERVO_REFRESH_US,
                    reset_counter: true,
                });
            }
            self.pin.set_high()?;
            Ok(NextCompare {
                compare_us: width,
                reset_counter: true,
            })
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}
