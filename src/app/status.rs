//! Status records and their CSV line form.
//!
//! ```text
//!   225,78.5,U,U,U,40,35,0          set point, 4 probes, output, avg, lid secs
//!   HMPS,0.00,12.00,3.25,-0.40,0.08 bias, P, I, D, pit − pit avg
//! ```
//!
//! `U` stands in for any value that is not currently defined.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::PidGains;
use crate::sensors::PROBE_COUNT;

/// Longest possible status line with four probes.
pub const STATUS_LINE_LEN: usize = 96;

const UNDEFINED: char = 'U';
const DELIMITER: char = ',';

/// One control-period snapshot for the status link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    /// `None` in manual output mode.
    pub set_point: Option<i16>,
    pub temperatures: [Option<f32>; PROBE_COUNT],
    pub output: u8,
    pub output_avg: f32,
    /// Remaining lid-open suppression, whole seconds.
    pub lid_countdown_secs: u32,
}

impl StatusReport {
    /// Render into a fixed-capacity line (no allocation).
    pub fn to_line(&self) -> Result<String<STATUS_LINE_LEN>, fmt::Error> {
        let mut line = String::new();
        write!(line, "{self}")?;
        Ok(line)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.set_point {
            Some(sp) => write!(f, "{sp}")?,
            None => f.write_char(UNDEFINED)?,
        }
        for t in &self.temperatures {
            f.write_char(DELIMITER)?;
            match t {
                Some(t) => write!(f, "{t:.1}")?,
                None => f.write_char(UNDEFINED)?,
            }
        }
        write!(
            f,
            ",{},{},{}",
            self.output, self.output_avg as i32, self.lid_countdown_secs
        )
    }
}

/// Per-term PID contributions plus pit trend deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStatusReport {
    pub contributions: PidGains,
    /// Instantaneous pit temperature minus its smoothed average.
    pub pit_deviation: f32,
}

impl PidStatusReport {
    pub fn to_line(&self) -> Result<String<STATUS_LINE_LEN>, fmt::Error> {
        let mut line = String::new();
        write!(line, "{self}")?;
        Ok(line)
    }
}

impl fmt::Display for PidStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.contributions;
        write!(
            f,
            "HMPS,{:.2},{:.2},{:.2},{:.2},{:.2}",
            c.bias, c.proportional, c.integral, c.derivative, self.pit_deviation
        )
    }
}
