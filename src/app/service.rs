//! Controller service: the hexagonal core.
//!
//! [`GrillController`] owns the probe set, PID state, lid-open detector
//! and actuator shaping.  It is an explicit context object: the entry
//! point owns it and hands it to whichever layer needs probe or alarm
//! state.  All I/O flows through port traits injected at call sites.
//!
//! ```text
//!   ClockPort  ──▶ ┌──────────────────────────────┐ ──▶ FanPort
//!  AnalogPort  ──▶ │        GrillController       │ ──▶ ServoPort
//!                  │ probes · PID · lid · shaping │ ──▶ EventSink
//!                  └──────────────────────────────┘
//! ```
//!
//! [`do_work`](GrillController::do_work) is polled.  Every sub-tick
//! (125 ms by default) takes one oversampled burst per local probe; every
//! `samples_per_period`-th sub-tick runs the full
//! reduce → convert → control → shape cycle.

use log::{debug, info, warn};

use crate::config::{
    ControllerConfig, FanConfig, OutputFlags, ProbeConfig, ServoConfig, TimingConfig,
    probe_offset_in_range,
};
use crate::control::lid::{INTEGRAL_REACHED_SCALE, LidOpenDetector, LidTransition};
use crate::control::pid::{PidController, PidTerm, PitReading};
use crate::drivers::fan::FanOutput;
use crate::drivers::servo::servo_pulse_us;
use crate::error::{Error, Result};
use crate::sensors::alarm::AlarmSide;
use crate::sensors::convert::{ProbeType, Units};
use crate::sensors::probe::TempProbe;
use crate::sensors::sampler::OVERSAMPLE_COUNT;
use crate::sensors::{PROBE_COUNT, ProbeSet};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{AnalogPort, ClockPort, ConfigPort, EventSink, FanPort, ServoPort};
use super::status::{PidStatusReport, StatusReport};

/// Seconds a configuration change must settle before it is persisted.
const AUTO_SAVE_DELAY_SECS: u32 = 5;

const ALARM_SIDES: [AlarmSide; 2] = [AlarmSide::Low, AlarmSide::High];

// ───────────────────────────────────────────────────────────────
// GrillController
// ───────────────────────────────────────────────────────────────

pub struct GrillController {
    probes: ProbeSet,
    pid: PidController,
    lid: LidOpenDetector,
    fan: FanOutput,
    fan_config: FanConfig,
    servo_config: ServoConfig,
    outputs: OutputFlags,
    units: Units,
    timing: TimingConfig,
    /// `None` until the first poll, so the first poll qualifies.
    last_work_ms: Option<u32>,
    last_cycle_ms: Option<u32>,
    period_counter: u8,
    servo_pulse_us: u16,
    /// Ringing state already reported, per probe and side.
    alarm_reported: [[bool; 2]; PROBE_COUNT],
    cycle_count: u64,
    config_dirty: bool,
    dirty_since_cycle: u64,
}

impl GrillController {
    /// Construct and configure the controller.  Rejects an invalid config.
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        let mut ctl = Self {
            probes: ProbeSet::new(),
            pid: PidController::new(config.pid, config.set_point),
            lid: LidOpenDetector::new(config.lid_open.duration_secs, config.lid_open.offset_percent),
            fan: FanOutput::new(),
            fan_config: config.fan,
            servo_config: config.servo,
            outputs: config.outputs,
            units: config.units,
            timing: config.timing,
            last_work_ms: None,
            last_cycle_ms: None,
            // First qualifying sub-tick completes a period.
            period_counter: config.timing.samples_per_period - 1,
            servo_pulse_us: 0,
            alarm_reported: [[false; 2]; PROBE_COUNT],
            cycle_count: 0,
            config_dirty: false,
            dirty_since_cycle: 0,
        };
        ctl.apply_config(config);
        ctl.config_dirty = false;
        Ok(ctl)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!(
            "Controller started: set point {}{}, {} local probe(s)",
            self.pid.target(),
            self.units.as_char(),
            self.probes
                .iter()
                .filter(|p| p.probe_type().samples_locally())
                .count()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Poll the controller.  Returns `true` when a full control cycle ran;
    /// the caller decides whether to emit status.
    ///
    /// The `hw` parameter satisfies every hardware port at once, which
    /// avoids juggling several mutable borrows of one board.
    pub fn do_work<H>(&mut self, hw: &mut H, sink: &mut impl EventSink) -> bool
    where
        H: ClockPort + AnalogPort + FanPort + ServoPort,
    {
        let now = hw.millis();
        if let Some(last) = self.last_work_ms {
            if now.wrapping_sub(last) < self.timing.sub_tick_ms() {
                return false;
            }
        }
        self.last_work_ms = Some(now);

        // A boost lasts exactly one sub-tick.
        if let Some(duty) = self.fan.end_boost() {
            hw.set_fan_duty(duty);
        }

        self.sample_local_probes(hw);

        self.period_counter += 1;
        if self.period_counter < self.timing.samples_per_period {
            return false;
        }
        self.period_counter = 0;

        let elapsed_ms = self
            .last_cycle_ms
            .map_or(self.timing.measure_period_ms, |t| now.wrapping_sub(t));
        self.last_cycle_ms = Some(now);

        self.run_cycle(elapsed_ms, sink);
        self.commit_outputs(hw);
        self.cycle_count += 1;
        true
    }

    /// Emit the status record, plus the PID breakdown when available.
    pub fn emit_status(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Status(self.build_status()));
        if let Some(pid) = self.build_pid_status() {
            sink.emit(&AppEvent::PidStatus(pid));
        }
    }

    fn sample_local_probes(&mut self, hw: &mut impl AnalogPort) {
        for (channel, probe) in self.probes.iter_mut().enumerate() {
            if probe.probe_type().samples_locally() {
                let burst = (0..OVERSAMPLE_COUNT).map(|_| hw.read_analog(channel));
                probe.sampler_mut().add_burst(burst);
            }
        }
    }

    fn run_cycle(&mut self, elapsed_ms: u32, sink: &mut impl EventSink) {
        self.probes.calc_all(self.units, self.lid.is_open());
        self.report_alarm_edges(sink);

        if self.pid.is_manual() {
            // Suppression still forces zero; only the clock runs.
            if self.lid.tick_countdown(elapsed_ms) {
                info!("Lid: countdown expired in manual mode");
                sink.emit(&AppEvent::LidResumed);
            }
            self.pid.apply_manual(self.lid.is_open());
        } else {
            let pit = self.pit_reading();
            self.pid.compute(pit, self.lid.is_open());
            let transition = self.lid.evaluate(
                pit.map(|p| p.temperature),
                self.pid.target(),
                self.pid.output_avg(),
                elapsed_ms,
            );
            self.handle_lid_transition(transition, sink);
        }

        self.pid.update_output_avg();
        debug!(
            "Cycle {}: output {}% (avg {:.1}), lid {}s",
            self.cycle_count,
            self.pid.output(),
            self.pid.output_avg(),
            self.lid.countdown_secs()
        );
    }

    fn handle_lid_transition(&mut self, transition: Option<LidTransition>, sink: &mut impl EventSink) {
        match transition {
            Some(LidTransition::TemperatureReached { resumed }) => {
                self.pid.scale_integral(INTEGRAL_REACHED_SCALE);
                info!("Pit reached set point {}", self.pid.target());
                sink.emit(&AppEvent::TemperatureReached);
                if resumed {
                    sink.emit(&AppEvent::LidResumed);
                }
            }
            Some(LidTransition::Resumed) => sink.emit(&AppEvent::LidResumed),
            Some(LidTransition::Detected) => {
                warn!(
                    "Lid open inferred: pit {}% or more below set point, suppressing for {}s",
                    self.lid.offset_percent(),
                    self.lid.duration_secs()
                );
                sink.emit(&AppEvent::LidOpened { inferred: true });
            }
            None => {}
        }
    }

    fn report_alarm_edges(&mut self, sink: &mut impl EventSink) {
        for (idx, probe) in self.probes.iter().enumerate() {
            for (i, side) in ALARM_SIDES.into_iter().enumerate() {
                let ringing = probe.alarms.is_ringing(side);
                if ringing && !self.alarm_reported[idx][i] {
                    warn!("Probe {} {:?} alarm ringing", idx, side);
                    sink.emit(&AppEvent::AlarmRinging { probe: idx, side });
                }
                self.alarm_reported[idx][i] = ringing;
            }
        }
    }

    /// Translate the controller output into port calls.
    fn commit_outputs(&mut self, hw: &mut (impl FanPort + ServoPort)) {
        let output = self.pid.output();

        let slots = self.fan_config.long_pwm_period_ms / self.timing.measure_period_ms;
        let slots = u16::try_from(slots).unwrap_or(u16::MAX).max(1);
        let cmd = self.fan.shape(output, &self.fan_config, &self.outputs, slots);
        hw.set_fan_duty(cmd.immediate_duty());

        if self.servo_config.enabled {
            self.servo_pulse_us = servo_pulse_us(output, &self.servo_config, &self.outputs);
            hw.commit_servo_pulse(self.servo_pulse_us);
        }
    }

    fn pit_reading(&self) -> Option<PitReading> {
        let pit = self.probes.pit();
        let temperature = pit.temperature()?;
        Some(PitReading {
            temperature,
            average: pit.temperature_avg().unwrap_or(temperature),
        })
    }

    // ── Mutators ──────────────────────────────────────────────

    /// Regulate toward `value`.  Leaves manual mode, clears the integral
    /// sum, the reached latch and any lid-open countdown.
    pub fn set_set_point(&mut self, value: i16) -> Result<()> {
        if value <= 0 {
            return Err(Error::Config("set point must be positive"));
        }
        self.pid.set_set_point(value);
        self.lid.cancel();
        self.lid.clear_reached();
        self.mark_config_dirty();
        info!("Set point {}{}", value, self.units.as_char());
        Ok(())
    }

    /// Manual mode with a fixed output (clamped to 100).
    pub fn set_manual_output(&mut self, value: u8) {
        self.pid.set_manual_output(value);
        self.lid.clear_reached();
        info!("Manual output {}%", self.pid.output());
    }

    pub fn set_pid_constant(&mut self, term: PidTerm, value: f32) {
        self.pid.set_gain(term, value);
        self.mark_config_dirty();
        info!("PID {:?} = {}", term, value);
    }

    /// Select the reporting unit.  Probe history is discarded on a change
    /// so averages never mix units.
    pub fn set_units(&mut self, code: char) -> Result<()> {
        let units = Units::try_from(code)?;
        if units != self.units {
            self.units = units;
            for probe in self.probes.iter_mut() {
                probe.set_probe_type(probe.probe_type());
            }
            self.mark_config_dirty();
            info!("Units {}", code);
        }
        Ok(())
    }

    pub fn set_lid_open_duration(&mut self, secs: u16) {
        self.lid.set_duration_secs(secs);
        self.mark_config_dirty();
    }

    pub fn set_lid_open_offset(&mut self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(Error::Config("lid open offset must be 0–100"));
        }
        self.lid.set_offset_percent(percent);
        self.mark_config_dirty();
        Ok(())
    }

    /// External lid switch.  Opening starts a full countdown and silences
    /// every alarm; closing ends suppression.
    pub fn set_lid_open(&mut self, open: bool, sink: &mut impl EventSink) {
        if open {
            self.lid.trigger();
            self.silence_alarms();
            info!("Lid opened, suppressing for {}s", self.lid.duration_secs());
            sink.emit(&AppEvent::LidOpened { inferred: false });
            sink.emit(&AppEvent::AlarmsSilenced);
        } else if self.lid.is_open() {
            self.lid.cancel();
            info!("Lid closed, resuming control");
            sink.emit(&AppEvent::LidResumed);
        }
    }

    pub fn set_probe_type(&mut self, probe: usize, probe_type: ProbeType) -> Result<()> {
        self.probe_mut(probe)?.set_probe_type(probe_type);
        self.mark_config_dirty();
        info!("Probe {} type {:?}", probe, probe_type);
        Ok(())
    }

    pub fn set_probe_offset(&mut self, probe: usize, offset: f32) -> Result<()> {
        if !probe_offset_in_range(offset) {
            return Err(Error::Config("probe offset out of range"));
        }
        self.probe_mut(probe)?.set_offset(offset);
        self.mark_config_dirty();
        Ok(())
    }

    pub fn set_probe_coefficients(&mut self, probe: usize, coefficients: [f32; 4]) -> Result<()> {
        self.probe_mut(probe)?.set_coefficients(coefficients);
        self.mark_config_dirty();
        Ok(())
    }

    /// `0` silences the side, a negative value disables it.
    pub fn set_alarm_threshold(&mut self, probe: usize, side: AlarmSide, value: i16) -> Result<()> {
        self.probe_mut(probe)?.alarms.set_threshold(side, value);
        if value != 0 {
            self.mark_config_dirty();
        }
        Ok(())
    }

    pub fn set_fan_speeds(&mut self, min: u8, max: u8) -> Result<()> {
        if max > 100 || min > max {
            return Err(Error::Config("fan speeds must satisfy min <= max <= 100"));
        }
        self.fan_config.min_speed = min;
        self.fan_config.max_speed = max;
        self.mark_config_dirty();
        Ok(())
    }

    pub fn set_fan_boost(&mut self, enabled: bool) {
        self.fan_config.boost = enabled;
        self.mark_config_dirty();
    }

    pub fn set_servo_range(&mut self, min_us: u16, max_us: u16) -> Result<()> {
        let candidate = ServoConfig {
            min_pulse_us: min_us,
            max_pulse_us: max_us,
            ..self.servo_config
        };
        let mut check = self.current_config();
        check.servo = candidate;
        check.validate()?;
        self.servo_config = candidate;
        self.mark_config_dirty();
        Ok(())
    }

    pub fn set_servo_enabled(&mut self, enabled: bool) {
        self.servo_config.enabled = enabled;
        self.mark_config_dirty();
    }

    pub fn set_output_flags(&mut self, flags: OutputFlags) {
        self.outputs = flags;
        self.mark_config_dirty();
    }

    pub fn silence_alarms(&mut self) {
        self.probes.silence_all_alarms();
        self.alarm_reported = [[false; 2]; PROBE_COUNT];
    }

    /// Feed one oversampled value from an external receiver into a
    /// [`ProbeType::Remote`] probe.
    pub fn add_remote_sample(&mut self, probe: usize, value: u16) -> Result<()> {
        let p = self.probe_mut(probe)?;
        if p.probe_type() != ProbeType::Remote {
            return Err(Error::InvalidProbeType(p.probe_type() as u8));
        }
        p.sampler_mut().add_sample(value);
        Ok(())
    }

    /// Validate and apply a complete configuration.
    pub fn load_config(&mut self, config: &ControllerConfig) -> Result<()> {
        config.validate()?;
        self.apply_config(config);
        info!("Configuration applied");
        Ok(())
    }

    fn apply_config(&mut self, config: &ControllerConfig) {
        for (probe, pc) in self.probes.iter_mut().zip(config.probes.iter()) {
            probe.load_config(pc);
        }
        self.pid.set_gains(config.pid);
        // Only a changed target leaves manual mode and clears the latch.
        if config.set_point != self.pid.target() {
            self.pid.set_set_point(config.set_point);
            self.lid.cancel();
            self.lid.clear_reached();
        }
        self.units = config.units;
        self.fan_config = config.fan;
        self.servo_config = config.servo;
        self.outputs = config.outputs;
        self.lid.set_duration_secs(config.lid_open.duration_secs);
        self.lid.set_offset_percent(config.lid_open.offset_percent);
        if self.timing != config.timing {
            self.timing = config.timing;
            self.period_counter = 0;
        }
        self.mark_config_dirty();
    }

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            AppCommand::SetSetPoint(v) => self.set_set_point(v)?,
            AppCommand::SetManualOutput(v) => self.set_manual_output(v),
            AppCommand::SetPidConstant { term, value } => self.set_pid_constant(term, value),
            AppCommand::SetUnits(c) => self.set_units(c)?,
            AppCommand::SetLidOpenDuration(s) => self.set_lid_open_duration(s),
            AppCommand::SetLidOpenOffset(p) => self.set_lid_open_offset(p)?,
            AppCommand::LidOpen(open) => {
                self.set_lid_open(open, sink);
                return Ok(());
            }
            AppCommand::SetProbeType { probe, probe_type } => self.set_probe_type(probe, probe_type)?,
            AppCommand::SetProbeOffset { probe, offset } => self.set_probe_offset(probe, offset)?,
            AppCommand::SetProbeCoefficients {
                probe,
                coefficients,
            } => self.set_probe_coefficients(probe, coefficients)?,
            AppCommand::SetAlarmThreshold { probe, side, value } => {
                self.set_alarm_threshold(probe, side, value)?
            }
            AppCommand::SetFanSpeeds { min, max } => self.set_fan_speeds(min, max)?,
            AppCommand::SetServoRange { min_us, max_us } => self.set_servo_range(min_us, max_us)?,
            AppCommand::SilenceAlarms => {
                self.silence_alarms();
                sink.emit(&AppEvent::AlarmsSilenced);
                return Ok(());
            }
            AppCommand::RemoteSample { probe, value } => {
                self.add_remote_sample(probe, value)?;
                return Ok(());
            }
            AppCommand::UpdateConfig(config) => self.load_config(&config)?,
        }
        sink.emit(&AppEvent::ConfigChanged);
        Ok(())
    }

    fn probe_mut(&mut self, idx: usize) -> Result<&mut TempProbe> {
        self.probes.get_mut(idx).ok_or(Error::InvalidProbe(idx))
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_status(&self) -> StatusReport {
        let mut temperatures = [None; PROBE_COUNT];
        for (slot, probe) in temperatures.iter_mut().zip(self.probes.iter()) {
            *slot = probe.temperature();
        }
        StatusReport {
            set_point: self.pid.set_point(),
            temperatures,
            output: self.pid.output(),
            output_avg: self.pid.output_avg(),
            lid_countdown_secs: self.lid.countdown_secs(),
        }
    }

    /// PID breakdown, `None` while the pit has no temperature.
    pub fn build_pid_status(&self) -> Option<PidStatusReport> {
        let pit = self.pit_reading()?;
        Some(PidStatusReport {
            contributions: *self.pid.contributions(),
            pit_deviation: pit.temperature - pit.average,
        })
    }

    /// Live configuration, including changes made through mutators.
    pub fn current_config(&self) -> ControllerConfig {
        let mut probes = [ProbeConfig::default(); PROBE_COUNT];
        for (pc, probe) in probes.iter_mut().zip(self.probes.iter()) {
            *pc = ProbeConfig {
                probe_type: probe.probe_type(),
                coefficients: probe.calibration().coefficients,
                offset: probe.calibration().offset,
                alarm_low: probe.alarms.threshold(AlarmSide::Low),
                alarm_high: probe.alarms.threshold(AlarmSide::High),
            };
        }
        ControllerConfig {
            probes,
            pid: *self.pid.gains(),
            set_point: self.pid.target(),
            units: self.units,
            fan: self.fan_config,
            servo: self.servo_config,
            outputs: self.outputs,
            lid_open: crate::config::LidOpenConfig {
                offset_percent: self.lid.offset_percent(),
                duration_secs: self.lid.duration_secs(),
            },
            timing: self.timing,
        }
    }

    pub fn probe(&self, idx: usize) -> Option<&TempProbe> {
        self.probes.get(idx)
    }

    pub fn pit_temperature(&self) -> Option<f32> {
        self.probes.pit().temperature()
    }

    pub fn output(&self) -> u8 {
        self.pid.output()
    }

    pub fn output_avg(&self) -> f32 {
        self.pid.output_avg()
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn is_manual(&self) -> bool {
        self.pid.is_manual()
    }

    pub fn set_point(&self) -> Option<i16> {
        self.pid.set_point()
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn is_lid_open(&self) -> bool {
        self.lid.is_open()
    }

    pub fn lid_countdown_secs(&self) -> u32 {
        self.lid.countdown_secs()
    }

    pub fn temperature_reached(&self) -> bool {
        self.lid.temperature_reached()
    }

    pub fn count_of_type(&self, probe_type: ProbeType) -> usize {
        self.probes.count_of_type(probe_type)
    }

    pub fn any_food_probe_active(&self) -> bool {
        self.probes.any_food_active()
    }

    pub fn any_alarm_ringing(&self) -> bool {
        self.probes.any_alarm_ringing()
    }

    /// Last committed servo pulse width (µs).
    pub fn servo_pulse_us(&self) -> u16 {
        self.servo_pulse_us
    }

    /// Last committed steady fan duty (0–255).
    pub fn fan_duty(&self) -> u8 {
        self.fan.duty()
    }

    /// Full control cycles executed since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ── Config dirty-flag management ──────────────────────────

    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_cycle = self.cycle_count;
        }
    }

    /// Persist once the config has been stable for a few seconds.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let cycles = self.cycle_count.saturating_sub(self.dirty_since_cycle);
        let secs = cycles * u64::from(self.timing.measure_period_ms) / 1000;
        if secs < u64::from(AUTO_SAVE_DELAY_SECS) {
            return false;
        }
        self.save_now(storage)
    }

    /// Save immediately if dirty (call before shutdown).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if self.config_dirty {
            self.save_now(storage);
        }
    }

    fn save_now(&mut self, storage: &impl ConfigPort) -> bool {
        match storage.save(&self.current_config()) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
