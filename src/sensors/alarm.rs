//! Per-probe low/high alarm with arming hysteresis.
//!
//! ```text
//!   low side (threshold T)            high side (threshold T)
//!   disarmed ──v >= T+1──▶ armed      disarmed ──v < T-1──▶ armed
//!   armed    ──v <  T────▶ ringing    armed    ──v >= T───▶ ringing
//! ```
//!
//! A side only rings after it has first been armed, so a probe that starts
//! below a low threshold stays quiet until it has been above it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmSide {
    Low,
    High,
}

impl AlarmSide {
    const fn idx(self) -> usize {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeAlarm {
    thresholds: [i16; 2],
    armed: [bool; 2],
    ringing: [bool; 2],
}

impl ProbeAlarm {
    pub const fn new() -> Self {
        Self {
            thresholds: [0; 2],
            armed: [false; 2],
            ringing: [false; 2],
        }
    }

    /// Assign a threshold.  Always disarms and silences the side.
    ///
    /// Zero only silences: the stored threshold is kept.  A negative value
    /// is stored and leaves the side disabled.
    pub fn set_threshold(&mut self, side: AlarmSide, value: i16) {
        let i = side.idx();
        self.armed[i] = false;
        self.ringing[i] = false;
        if value == 0 {
            return;
        }
        self.thresholds[i] = value;
    }

    pub fn threshold(&self, side: AlarmSide) -> i16 {
        self.thresholds[side.idx()]
    }

    pub fn is_enabled(&self, side: AlarmSide) -> bool {
        self.thresholds[side.idx()] > 0
    }

    pub fn is_armed(&self, side: AlarmSide) -> bool {
        self.armed[side.idx()]
    }

    pub fn is_ringing(&self, side: AlarmSide) -> bool {
        self.ringing[side.idx()]
    }

    pub fn any_ringing(&self) -> bool {
        self.ringing[0] || self.ringing[1]
    }

    /// Evaluate both sides against a new temperature.
    ///
    /// While the lid is open nothing may ring, though arming still tracks.
    pub fn update(&mut self, value: f32, lid_open: bool) {
        const LOW: usize = 0;
        const HIGH: usize = 1;

        if self.is_enabled(AlarmSide::Low) {
            let t = f32::from(self.thresholds[LOW]);
            if value >= t + 1.0 {
                self.armed[LOW] = true;
            } else if value < t && self.armed[LOW] {
                self.ringing[LOW] = true;
            }
        }

        if self.is_enabled(AlarmSide::High) {
            let t = f32::from(self.thresholds[HIGH]);
            if value < t - 1.0 {
                self.armed[HIGH] = true;
            } else if value >= t && self.armed[HIGH] {
                self.ringing[HIGH] = true;
            }
        }

        if lid_open {
            self.ringing = [false; 2];
        }
    }

    /// Disarm and silence both sides.
    pub fn silence_all(&mut self) {
        self.armed = [false; 2];
        self.ringing = [false; 2];
    }
}
