//! One temperature channel: sampler, calibration, smoothing and alarms.

use super::alarm::{AlarmSide, ProbeAlarm};
use super::convert::{Calibration, Conversion, ProbeType, Units};
use super::sampler::{ProbeSampler, Window};
use crate::config::ProbeConfig;

/// EMA smoothing constant for probe temperatures.
pub const TEMP_AVG_SMOOTH: f32 = 1.0 / 20.0;

/// Exponential moving average seeded by the first value.
pub fn ema(smooth: f32, avg: &mut Option<f32>, value: f32) {
    *avg = Some(match *avg {
        Some(a) => a + smooth * (value - a),
        None => value,
    });
}

#[derive(Debug, Clone)]
pub struct TempProbe {
    probe_type: ProbeType,
    calibration: Calibration,
    sampler: ProbeSampler,
    temperature: Option<f32>,
    temperature_avg: Option<f32>,
    pub alarms: ProbeAlarm,
}

impl Default for TempProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TempProbe {
    pub const fn new() -> Self {
        Self {
            probe_type: ProbeType::Disabled,
            calibration: Calibration {
                coefficients: [0.0; 4],
                offset: 0.0,
            },
            sampler: ProbeSampler::new(),
            temperature: None,
            temperature_avg: None,
            alarms: ProbeAlarm::new(),
        }
    }

    /// Apply stored settings. Unchanged type and thresholds keep the
    /// temperature history and alarm arming.
    pub fn load_config(&mut self, config: &ProbeConfig) {
        if config.probe_type != self.probe_type {
            self.set_probe_type(config.probe_type);
        }
        self.calibration = Calibration {
            coefficients: config.coefficients,
            offset: config.offset,
        };
        let thresholds = [(AlarmSide::Low, config.alarm_low), (AlarmSide::High, config.alarm_high)];
        for (side, value) in thresholds {
            if value != self.alarms.threshold(side) {
                self.alarms.set_threshold(side, value);
            }
        }
    }

    /// Change the type; discards the window and any temperature history.
    pub fn set_probe_type(&mut self, probe_type: ProbeType) {
        self.probe_type = probe_type;
        self.sampler.reset();
        self.temperature = None;
        self.temperature_avg = None;
    }

    pub fn probe_type(&self) -> ProbeType {
        self.probe_type
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.calibration.offset = offset;
    }

    pub fn set_coefficients(&mut self, coefficients: [f32; 4]) {
        self.calibration.coefficients = coefficients;
    }

    pub fn sampler_mut(&mut self) -> &mut ProbeSampler {
        &mut self.sampler
    }

    /// Last calibrated value, `None` on sensor fault or absence.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn temperature_avg(&self) -> Option<f32> {
        self.temperature_avg
    }

    pub fn has_temperature(&self) -> bool {
        self.temperature.is_some()
    }

    /// Reduce the sampling window and update temperature, EMA and alarms.
    ///
    /// An empty window (nothing sampled this period) keeps the previous
    /// temperature.
    pub fn calc_temp(&mut self, units: Units, is_pit: bool, lid_open: bool) {
        match self.sampler.reduce() {
            Window::Empty => {}
            Window::Invalid => {
                if units == Units::Raw {
                    self.temperature = Some(0.0);
                    return;
                }
                self.temperature = None;
            }
            Window::Average(raw) => {
                match self.calibration.convert(self.probe_type, raw, units, is_pit) {
                    Conversion::Diagnostic(v) => {
                        self.temperature = Some(v);
                        return;
                    }
                    Conversion::Temperature(t) => self.temperature = Some(t),
                    Conversion::Undefined => self.temperature = None,
                }
            }
        }

        match self.temperature {
            Some(t) => {
                ema(TEMP_AVG_SMOOTH, &mut self.temperature_avg, t);
                self.alarms.update(t, lid_open);
            }
            None => self.alarms.silence_all(),
        }
    }
}
