//! PID controller for pit temperature
//!
//! Output is a 0–100 percent blower/damper demand built from four terms:
//!
//! - **B**ias: constant percent.
//! - **P**roportional: percent per degree of error, fresh each period.
//! - **I**ntegral: accumulated percent, frozen while the previous output is
//!   already saturated in the direction the error pushes (anti-windup).
//! - **D**erivative: percent per degree the instantaneous reading deviates
//!   from its own smoothed average.  Trend-based rather than a period-to-
//!   period delta, so single-sample noise barely registers.
//!
//! No pit temperature or an active lid-open suppression forces the output
//! to zero.

use crate::config::PidGains;
use crate::error::Error;
use crate::sensors::probe::ema;

/// EMA smoothing constant for the controller output.
pub const OUTPUT_AVG_SMOOTH: f32 = 1.0 / 240.0;

/// Selects one of the four gains/contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PidTerm {
    Bias = 0,
    Proportional = 1,
    Integral = 2,
    Derivative = 3,
}

impl TryFrom<u8> for PidTerm {
    type Error = Error;

    fn try_from(idx: u8) -> Result<Self, Self::Error> {
        match idx {
            0 => Ok(Self::Bias),
            1 => Ok(Self::Proportional),
            2 => Ok(Self::Integral),
            3 => Ok(Self::Derivative),
            other => Err(Error::InvalidPidTerm(other)),
        }
    }
}

/// Pit reading handed to the controller each period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitReading {
    pub temperature: f32,
    pub average: f32,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    /// Contribution of each term to the last output.  Only `integral`
    /// carries over between periods.
    current: PidGains,
    set_point: i16,
    output: u8,
    output_avg: Option<f32>,
    manual: bool,
    manual_output: u8,
}

impl PidController {
    pub fn new(gains: PidGains, set_point: i16) -> Self {
        Self {
            gains,
            current: PidGains::default(),
            set_point,
            output: 0,
            output_avg: None,
            manual: false,
            manual_output: 0,
        }
    }

    /// Compute the automatic output for one control period.
    pub fn compute(&mut self, pit: Option<PitReading>, suppressed: bool) {
        let last_output = self.output;
        self.output = 0;

        // Never guess an output without a pit reading.
        let Some(pit) = pit else {
            return;
        };
        if suppressed {
            return;
        }

        let error = f32::from(self.set_point) - pit.temperature;

        self.current.proportional = self.gains.proportional * error;

        if (error > 0.0 && last_output < 100) || (error < 0.0 && last_output > 0) {
            self.current.integral += self.gains.integral * error;
        }

        self.current.derivative = self.gains.derivative * (pit.average - pit.temperature);
        self.current.bias = self.gains.bias;

        let control = self.current.bias
            + self.current.proportional
            + self.current.integral
            + self.current.derivative;
        self.output = control.clamp(0.0, 100.0) as u8;
    }

    /// Hold the operator's output, or zero while suppressed.
    pub fn apply_manual(&mut self, suppressed: bool) {
        self.output = if suppressed { 0 } else { self.manual_output };
    }

    /// Fold the output into its moving average.  Once per period.
    pub fn update_output_avg(&mut self) {
        ema(OUTPUT_AVG_SMOOTH, &mut self.output_avg, f32::from(self.output));
    }

    /// New setpoint; leaves manual mode and clears the integral sum.
    pub fn set_set_point(&mut self, value: i16) {
        self.set_point = value;
        self.manual = false;
        self.current.integral = 0.0;
    }

    /// Enter manual mode with a fixed output.
    pub fn set_manual_output(&mut self, value: u8) {
        self.manual = true;
        self.manual_output = value.min(100);
        self.output = self.manual_output;
    }

    pub fn set_gain(&mut self, term: PidTerm, value: f32) {
        match term {
            PidTerm::Bias => self.gains.bias = value,
            PidTerm::Proportional => self.gains.proportional = value,
            PidTerm::Integral => {
                self.gains.integral = value;
                // No rescaling policy for the old sum.
                self.current.integral = 0.0;
            }
            PidTerm::Derivative => self.gains.derivative = value,
        }
    }

    pub fn gain(&self, term: PidTerm) -> f32 {
        match term {
            PidTerm::Bias => self.gains.bias,
            PidTerm::Proportional => self.gains.proportional,
            PidTerm::Integral => self.gains.integral,
            PidTerm::Derivative => self.gains.derivative,
        }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Replace all gains; the integral sum only restarts when its gain changed.
    pub fn set_gains(&mut self, gains: PidGains) {
        if gains.integral != self.gains.integral {
            self.current.integral = 0.0;
        }
        self.gains = gains;
    }

    /// Scale the accumulated integral sum.
    pub fn scale_integral(&mut self, factor: f32) {
        self.current.integral *= factor;
    }

    /// Per-term contributions to the last computed output.
    pub fn contributions(&self) -> &PidGains {
        &self.current
    }

    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn output_avg(&self) -> f32 {
        self.output_avg.unwrap_or(0.0)
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Regulation target, `None` in manual mode.
    pub fn set_point(&self) -> Option<i16> {
        (!self.manual).then_some(self.set_point)
    }

    /// Target regardless of mode.
    pub fn target(&self) -> i16 {
        self.set_point
    }
}
