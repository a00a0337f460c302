//! Clock adapters.
//!
//! - [`HostClock`] wraps `std::time::Instant` for real-time runs.
//! - [`ManualClock`] is advanced explicitly, for the accelerated
//!   simulation and for tests.

use std::cell::Cell;
use std::time::Instant;

use crate::app::ports::ClockPort;

pub struct HostClock {
    start: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Microseconds since construction (wraps like a hardware counter).
    pub fn micros(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}

impl ClockPort for HostClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now_ms.set(self.now_ms.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.now_ms.set(ms);
    }
}

impl ClockPort for ManualClock {
    fn millis(&self) -> u32 {
        self.now_ms.get()
    }
}
