//! Raw-to-temperature conversion.
//!
//! Two physical models share one calibration layout of four coefficients:
//!
//! - Thermistor: the fourth coefficient is the divider's reference
//!   resistance; the first three are Steinhart-Hart A, B, C.
//! - Thermocouple / linear analog: the fourth coefficient is either a
//!   full-scale temperature (>= 100) or a mV/°C slope against a 3.3 V
//!   reference (< 100).
//!
//! The unit mode can also select two diagnostic pass-throughs: the raw ADC
//! value and the computed thermistor resistance.

use serde::{Deserialize, Serialize};

use super::sampler::ADC_MAX;
use crate::error::Error;

/// Readings at or below this are treated as a fault (°C).
pub const TEMP_MIN_C: f32 = -20.0;
/// Readings above this are treated as a fault (°C).
pub const TEMP_MAX_C: f32 = 500.0;

const KELVIN_OFFSET: f32 = 273.15;
const REFERENCE_MV: f32 = 3300.0;

/// Probe hardware type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProbeType {
    /// Channel unused; never sampled.
    #[default]
    Disabled = 0,
    /// NTC thermistor on the local ADC.
    Thermistor = 1,
    /// Samples are pushed in by an external receiver; thermistor model.
    Remote = 2,
    /// Thermocouple amplifier or other linear analog output on the local ADC.
    Thermocouple = 3,
}

impl ProbeType {
    /// Whether the controller reads this probe from the local ADC.
    pub fn samples_locally(self) -> bool {
        matches!(self, Self::Thermistor | Self::Thermocouple)
    }
}

impl TryFrom<u8> for ProbeType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Thermistor),
            2 => Ok(Self::Remote),
            3 => Ok(Self::Thermocouple),
            other => Err(Error::InvalidProbeType(other)),
        }
    }
}

/// Reporting unit for every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Fahrenheit,
    Celsius,
    /// Averaged ADC value, unconverted.
    Raw,
    /// Thermistor resistance in ohms (the pit probe still reports °C).
    Resistance,
}

impl Units {
    pub fn as_char(self) -> char {
        match self {
            Self::Fahrenheit => 'F',
            Self::Celsius => 'C',
            Self::Raw => 'A',
            Self::Resistance => 'R',
        }
    }

    /// Raw and resistance modes skip smoothing and alarms.
    pub fn is_diagnostic(self) -> bool {
        matches!(self, Self::Raw | Self::Resistance)
    }
}

impl TryFrom<char> for Units {
    type Error = Error;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'F' => Ok(Self::Fahrenheit),
            'C' => Ok(Self::Celsius),
            'A' => Ok(Self::Raw),
            'R' => Ok(Self::Resistance),
            other => Err(Error::InvalidUnits(other)),
        }
    }
}

/// Result of converting one averaged raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Calibrated temperature in the display unit, offset applied.
    Temperature(f32),
    /// Diagnostic value (raw ADC or resistance); not smoothed or alarmed.
    Diagnostic(f32),
    /// Sensor fault or open circuit.
    Undefined,
}

/// Per-probe calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub coefficients: [f32; 4],
    pub offset: f32,
}

impl Calibration {
    /// Convert an averaged raw reading.
    ///
    /// `is_pit` keeps the pit probe reporting temperature in resistance
    /// mode so the controller never regulates against ohms.
    pub fn convert(&self, probe_type: ProbeType, raw: u16, units: Units, is_pit: bool) -> Conversion {
        if units == Units::Raw {
            return Conversion::Diagnostic(f32::from(raw));
        }
        if raw == 0 {
            return Conversion::Undefined;
        }

        let celsius = match probe_type {
            ProbeType::Thermocouple => {
                let mut scale = self.coefficients[3];
                // A zero slope produces inf/NaN here; the range check rejects it.
                if scale < 100.0 {
                    scale = REFERENCE_MV / scale;
                }
                f32::from(raw) / ADC_MAX * scale
            }
            ProbeType::Thermistor | ProbeType::Remote | ProbeType::Disabled => {
                let r = self.resistance(raw);
                if units == Units::Resistance && !is_pit {
                    return Conversion::Diagnostic(r);
                }
                self.steinhart_hart_c(r)
            }
        };

        self.to_display(celsius, units)
    }

    /// Thermistor resistance with the fixed resistor on the Vcc side.
    pub fn resistance(&self, raw: u16) -> f32 {
        self.coefficients[3] / ((ADC_MAX / f32::from(raw)) - 1.0)
    }

    fn steinhart_hart_c(&self, resistance: f32) -> f32 {
        let [a, b, c, _] = self.coefficients;
        let ln_r = resistance.ln();
        let kelvin = 1.0 / ((c * ln_r * ln_r + b) * ln_r + a);
        kelvin - KELVIN_OFFSET
    }

    fn to_display(&self, celsius: f32, units: Units) -> Conversion {
        // NaN fails both comparisons, so test for acceptance instead of rejection.
        if !(celsius > TEMP_MIN_C && celsius <= TEMP_MAX_C) {
            return Conversion::Undefined;
        }
        let value = match units {
            Units::Fahrenheit => celsius * (9.0 / 5.0) + 32.0,
            _ => celsius,
        };
        Conversion::Temperature(value + self.offset)
    }
}
