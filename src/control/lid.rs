//! Lid-open detection and timed auto-resume.
//!
//! Opening the lid dumps heat; a PID loop reacting to that drop would
//! stoke the fire and overshoot once the lid closes.  While a resume
//! countdown runs the controller output is forced to zero.
//!
//! ```text
//!              pit >= sp, latch unset
//!   ┌──────┐  ──────────────────────▶ reached (I-term × 0.25)
//!   │ idle │
//!   └──────┘  reached ∧ drop >= offset% ∧ avg output < 90%
//!      ▲  │ ─────────────────────────────────────┐
//!      │  │ external lid open                    ▼
//!      │  └───────────────────────────────▶ ┌────────────┐
//!      │     countdown hits 0, or pit back  │ suppressed │
//!      └──── at sp after the minimum time ──┤ countdown  │
//!                                           └────────────┘
//! ```

use log::{debug, info};

use crate::config::LIDOPEN_MIN_AUTORESUME_SECS;

/// Integral sum kept when the setpoint is first reached.
pub const INTEGRAL_REACHED_SCALE: f32 = 0.25;

/// Sustained output above this suggests the fire is dying, not a lid.
const OUT_OF_FUEL_OUTPUT: f32 = 90.0;

const MIN_AUTORESUME_MS: u32 = LIDOPEN_MIN_AUTORESUME_SECS as u32 * 1000;

/// State change reported by [`LidOpenDetector::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidTransition {
    /// Setpoint reached for the first time since the latch was cleared.
    /// `resumed` is set when this also cut a countdown short.
    TemperatureReached { resumed: bool },
    /// Countdown ran out.
    Resumed,
    /// A lid-open drop was inferred and a countdown started.
    Detected,
}

#[derive(Debug, Clone)]
pub struct LidOpenDetector {
    duration_ms: u32,
    countdown_ms: u32,
    offset_percent: u8,
    temperature_reached: bool,
}

impl LidOpenDetector {
    pub fn new(duration_secs: u16, offset_percent: u8) -> Self {
        let mut lid = Self {
            duration_ms: MIN_AUTORESUME_MS,
            countdown_ms: 0,
            offset_percent,
            temperature_reached: false,
        };
        lid.set_duration_secs(duration_secs);
        lid
    }

    /// Suppression length, floored at the minimum auto-resume time.
    pub fn set_duration_secs(&mut self, secs: u16) {
        self.duration_ms = u32::from(secs.max(LIDOPEN_MIN_AUTORESUME_SECS)) * 1000;
    }

    pub fn duration_secs(&self) -> u16 {
        (self.duration_ms / 1000) as u16
    }

    pub fn set_offset_percent(&mut self, percent: u8) {
        self.offset_percent = percent;
    }

    pub fn offset_percent(&self) -> u8 {
        self.offset_percent
    }

    pub fn is_open(&self) -> bool {
        self.countdown_ms != 0
    }

    pub fn countdown_ms(&self) -> u32 {
        self.countdown_ms
    }

    /// Remaining suppression in whole seconds, rounded up.
    pub fn countdown_secs(&self) -> u32 {
        self.countdown_ms.div_ceil(1000)
    }

    pub fn temperature_reached(&self) -> bool {
        self.temperature_reached
    }

    /// Start a full countdown and clear the reached latch.
    pub fn trigger(&mut self) {
        self.countdown_ms = self.duration_ms;
        self.temperature_reached = false;
    }

    pub fn cancel(&mut self) {
        self.countdown_ms = 0;
    }

    pub fn clear_reached(&mut self) {
        self.temperature_reached = false;
    }

    /// Run the countdown only.  Returns `true` when it just expired.
    pub fn tick_countdown(&mut self, elapsed_ms: u32) -> bool {
        if self.countdown_ms == 0 {
            return false;
        }
        self.countdown_ms = self.countdown_ms.saturating_sub(elapsed_ms);
        self.countdown_ms == 0
    }

    /// Evaluate one automatic-mode control period.
    pub fn evaluate(
        &mut self,
        pit_temperature: Option<f32>,
        set_point: i16,
        output_avg: f32,
        elapsed_ms: u32,
    ) -> Option<LidTransition> {
        let pit = pit_temperature.map(|t| t as i32);
        let set_point = i32::from(set_point);
        let suppressed_for = self.duration_ms.saturating_sub(self.countdown_ms);

        // Inclusive: a pit sitting exactly on the set point counts as reached.
        if pit.is_some_and(|p| p >= set_point) && suppressed_for >= MIN_AUTORESUME_MS {
            let resumed = self.is_open();
            self.countdown_ms = 0;
            if resumed {
                info!("Lid: pit back at setpoint, resuming early");
            }
            if !self.temperature_reached {
                self.temperature_reached = true;
                return Some(LidTransition::TemperatureReached { resumed });
            }
            return resumed.then_some(LidTransition::Resumed);
        }

        if self.is_open() {
            if self.tick_countdown(elapsed_ms) {
                info!("Lid: countdown expired, resuming control");
                return Some(LidTransition::Resumed);
            }
            return None;
        }

        let pit = pit?;
        if self.temperature_reached && set_point > 0 {
            let set_point = i64::from(set_point);
            let drop_percent = (set_point - i64::from(pit)) * 100 / set_point;
            debug!("Lid: pit {} is {}% below setpoint", pit, drop_percent);
            if drop_percent >= i64::from(self.offset_percent) && output_avg < OUT_OF_FUEL_OUTPUT {
                self.trigger();
                return Some(LidTransition::Detected);
            }
        }
        None
    }
}
