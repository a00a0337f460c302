//! Oversampling accumulator with outlier rejection.
//!
//! Each control period collects several sampling events per probe.  Every
//! event is itself an oversampled burst of 10-bit ADC reads reduced to a
//! 12-bit value.  The window is poisoned (accumulator forced to zero) by a
//! saturated read or by a sample that jumps too far from the running mean,
//! so an unplugged probe never averages into a plausible-looking value.

/// Extra resolution bits gained by oversampling (4^n reads per event).
pub const OVERSAMPLE_BITS: u32 = 2;

/// Reads per oversampled sampling event.
pub const OVERSAMPLE_COUNT: usize = 1 << (2 * OVERSAMPLE_BITS);

/// Largest raw value a single 10-bit read can return.
pub const ADC_READ_MAX: u16 = 1023;

/// Full-scale value of an oversampled reading.
pub const ADC_MAX: f32 = ((1u32 << (10 + OVERSAMPLE_BITS)) - 1) as f32;

/// Maximum distance from the running mean (6.25% of full scale).
pub const DEVIATION_MAX: u32 = 1 << (6 + OVERSAMPLE_BITS);

/// Outcome of reducing one sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// No samples were added since the last reduction.
    Empty,
    /// Samples were added but the window was poisoned.
    Invalid,
    /// Mean of the accepted samples.
    Average(u16),
}

#[derive(Debug, Clone, Default)]
pub struct ProbeSampler {
    accumulator: u32,
    count: u16,
}

impl ProbeSampler {
    pub const fn new() -> Self {
        Self {
            accumulator: 0,
            count: 0,
        }
    }

    /// Take one oversampled burst of raw 10-bit reads.
    ///
    /// A read of 0 or >= 1023 invalidates the whole window.
    pub fn add_burst(&mut self, reads: impl IntoIterator<Item = u16>) {
        let mut sum: u32 = 0;
        for adc in reads {
            if adc == 0 || adc >= ADC_READ_MAX {
                self.add_sample(0);
                return;
            }
            sum += u32::from(adc);
        }
        self.add_sample((sum >> OVERSAMPLE_BITS) as u16);
    }

    /// Add one oversampled value.  Zero is the saturation sentinel.
    pub fn add_sample(&mut self, sample: u16) {
        let sample = u32::from(sample);
        if sample == 0 {
            self.accumulator = 0;
        } else if self.count == 0 {
            self.accumulator = sample;
        } else if sample.abs_diff(self.accumulator / u32::from(self.count)) > DEVIATION_MAX {
            self.accumulator = 0;
        } else if self.accumulator != 0 {
            self.accumulator += sample;
        }
        // The count advances even for rejected samples so the window closes.
        self.count = self.count.saturating_add(1);
    }

    /// Close the window and return its mean.
    pub fn reduce(&mut self) -> Window {
        if self.count == 0 {
            return Window::Empty;
        }
        let mean = self.accumulator / u32::from(self.count);
        self.accumulator = 0;
        self.count = 0;
        if mean == 0 {
            Window::Invalid
        } else {
            Window::Average(mean as u16)
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0;
        self.count = 0;
    }

    pub fn pending(&self) -> u16 {
        self.count
    }
}
