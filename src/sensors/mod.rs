//! Sensor subsystem: probe conversion pipeline and the fixed [`ProbeSet`].
//!
//! ```text
//!   10-bit reads ─▶ ProbeSampler ─▶ Calibration ─▶ EMA ─▶ ProbeAlarm
//!   (oversampled)   (window mean)   (°F/°C/diag)
//! ```
//!
//! Roles are positional: index [`PIT`] is the probe the controller
//! regulates, the rest are food/ambient probes.

pub mod alarm;
pub mod convert;
pub mod probe;
pub mod sampler;

use convert::{ProbeType, Units};
use probe::TempProbe;

pub const PIT: usize = 0;
pub const FOOD1: usize = 1;
pub const FOOD2: usize = 2;
pub const AMBIENT: usize = 3;
pub const PROBE_COUNT: usize = 4;

/// Fixed-capacity, positionally indexed set of probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeSet {
    probes: [TempProbe; PROBE_COUNT],
}

impl ProbeSet {
    pub const fn new() -> Self {
        Self {
            probes: [
                TempProbe::new(),
                TempProbe::new(),
                TempProbe::new(),
                TempProbe::new(),
            ],
        }
    }

    pub fn get(&self, idx: usize) -> Option<&TempProbe> {
        self.probes.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut TempProbe> {
        self.probes.get_mut(idx)
    }

    pub fn pit(&self) -> &TempProbe {
        &self.probes[PIT]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TempProbe> {
        self.probes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TempProbe> {
        self.probes.iter_mut()
    }

    /// Reduce every probe's window and refresh temperatures and alarms.
    pub fn calc_all(&mut self, units: Units, lid_open: bool) {
        for (i, probe) in self.probes.iter_mut().enumerate() {
            probe.calc_temp(units, i == PIT, lid_open);
        }
    }

    pub fn count_of_type(&self, probe_type: ProbeType) -> usize {
        self.probes
            .iter()
            .filter(|p| p.probe_type() == probe_type)
            .count()
    }

    pub fn any_food_active(&self) -> bool {
        self.probes[FOOD1..].iter().any(TempProbe::has_temperature)
    }

    pub fn silence_all_alarms(&mut self) {
        for p in &mut self.probes {
            p.alarms.silence_all();
        }
    }

    pub fn any_alarm_ringing(&self) -> bool {
        self.probes.iter().any(|p| p.alarms.any_ringing())
    }
}
