//! Integration tests for the sampling → conversion → PID → shaping
//! pipeline, driven through `GrillController::do_work`.

use pitpid::app::commands::AppCommand;
use pitpid::app::events::AppEvent;
use pitpid::app::ports::ConfigPort;
use pitpid::control::pid::PidTerm;
use pitpid::sensors::alarm::AlarmSide;
use pitpid::sensors::convert::{ProbeType, Units};
use pitpid::{Error, GrillController};

use super::mock_hw::{
    MockConfigStore, MockHardware, RecordingSink, gains, run_cycles, test_config,
};

fn make_controller(set_point: i16, b: f32, p: f32) -> (GrillController, MockHardware, RecordingSink) {
    let ctl = GrillController::new(&test_config(set_point, gains(b, p, 0.0, 0.0))).unwrap();
    (ctl, MockHardware::new(), RecordingSink::new())
}

// ── Steady state at set point ────────────────────────────────

#[test]
fn steady_pit_at_225f_holds_output_at_zero() {
    let mut config = test_config(225, gains(0.0, 2.0, 0.0, 0.0));
    config.units = Units::Fahrenheit;
    // 107 °C reads 224.6 °F; the offset lands it on 225.
    config.probes[0].offset = 0.4;
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 107);

    for _ in 0..10 {
        run_cycles(&mut ctl, &mut hw, &mut sink, 1);
        assert_eq!(ctl.output(), 0);
        assert_eq!(hw.last_fan(), Some(0));
    }
    let pit = ctl.pit_temperature().unwrap();
    assert!((pit - 225.0).abs() < 0.01, "got {pit}");
}

// ── Output reaches both actuators ─────────────────────────────

#[test]
fn proportional_output_drives_fan_and_servo() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);

    assert_eq!(ctl.output(), 50);
    assert_eq!(hw.last_fan(), Some(127));
    assert_eq!(hw.last_servo(), Some(1500));
    assert_eq!(ctl.servo_pulse_us(), 1500);
}

#[test]
fn status_line_after_first_cycle() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);

    let line = ctl.build_status().to_line().unwrap();
    assert_eq!(line.as_str(), "100,75.0,U,U,U,50,50,0");

    let pid = ctl.build_pid_status().unwrap().to_line().unwrap();
    assert_eq!(pid.as_str(), "HMPS,0.00,50.00,0.00,0.00,0.00");

    ctl.emit_status(&mut sink);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Status(_))), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PidStatus(_))), 1);
}

// ── Sensor faults ─────────────────────────────────────────────

#[test]
fn saturated_pit_probe_forces_zero_output() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 50);

    hw.adc[0] = 1023;
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.pit_temperature(), None);
    assert_eq!(ctl.output(), 0);
    assert!(ctl.build_pid_status().is_none());
    assert!(ctl.build_status().to_string().starts_with("100,U,"));
}

#[test]
fn unplugged_probe_recovers_when_reconnected() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.adc[0] = 0;
    run_cycles(&mut ctl, &mut hw, &mut sink, 2);
    assert_eq!(ctl.pit_temperature(), None);

    hw.set_celsius(0, 90);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.pit_temperature(), Some(90.0));
    assert_eq!(ctl.output(), 20);
}

// ── Fan shaping through the controller ───────────────────────

#[test]
fn boost_lasts_one_sub_tick() {
    let mut config = test_config(100, gains(0.0, 2.0, 0.0, 0.0));
    config.fan.boost = true;
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 75);

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(hw.fan_writes, vec![255]);

    assert!(!ctl.do_work(&mut hw, &mut sink));
    assert_eq!(hw.fan_writes, vec![255, 127]);
    assert_eq!(ctl.fan_duty(), 127);
}

#[test]
fn low_demand_uses_long_pwm() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 98);
    run_cycles(&mut ctl, &mut hw, &mut sink, 10);
    assert_eq!(ctl.output(), 4);
    assert_eq!(hw.fan_writes, vec![25, 25, 25, 25, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn inverted_fan_and_servo() {
    let mut config = test_config(100, gains(0.0, 2.0, 0.0, 0.0));
    config.outputs.invert_fan = true;
    config.outputs.invert_servo = true;
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 50);

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 100);
    assert_eq!(hw.last_fan(), Some(0));
    assert_eq!(hw.last_servo(), Some(1000));
}

#[test]
fn disabled_servo_is_never_committed() {
    let mut config = test_config(100, gains(0.0, 2.0, 0.0, 0.0));
    config.servo.enabled = false;
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert!(hw.servo_commits.is_empty());
}

// ── Alarms ────────────────────────────────────────────────────

#[test]
fn food_alarm_rings_once_then_silences() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    ctl.set_alarm_threshold(1, AlarmSide::High, 80).unwrap();
    hw.set_celsius(0, 100);
    hw.set_celsius(1, 70);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.any_alarm_ringing());

    hw.set_celsius(1, 85);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert!(ctl.any_alarm_ringing());
    let ringing = |e: &AppEvent| {
        matches!(
            e,
            AppEvent::AlarmRinging {
                probe: 1,
                side: AlarmSide::High
            }
        )
    };
    assert_eq!(sink.count(ringing), 1);

    ctl.handle_command(AppCommand::SilenceAlarms, &mut sink).unwrap();
    assert!(!ctl.any_alarm_ringing());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::AlarmsSilenced)), 1);

    // Still above the threshold, but disarmed: stays quiet.
    run_cycles(&mut ctl, &mut hw, &mut sink, 2);
    assert!(!ctl.any_alarm_ringing());
}

#[test]
fn low_alarm_needs_arming_first() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    ctl.set_alarm_threshold(0, AlarmSide::Low, 90).unwrap();
    hw.set_celsius(0, 60);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert!(!ctl.any_alarm_ringing());

    for c in [70, 80, 91, 85] {
        hw.set_celsius(0, c);
        run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    }
    assert!(ctl.probe(0).unwrap().alarms.is_ringing(AlarmSide::Low));
}

// ── Manual mode ───────────────────────────────────────────────

#[test]
fn manual_output_overrides_pid_and_hides_set_point() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 75);
    ctl.handle_command(AppCommand::SetManualOutput(60), &mut sink).unwrap();
    run_cycles(&mut ctl, &mut hw, &mut sink, 2);
    assert!(ctl.is_manual());
    assert_eq!(ctl.output(), 60);
    assert!(ctl.build_status().to_string().starts_with("U,75.0,"));

    ctl.handle_command(AppCommand::SetSetPoint(100), &mut sink).unwrap();
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.is_manual());
    assert_eq!(ctl.output(), 50);
}

// ── Configuration mutators ────────────────────────────────────

#[test]
fn units_change_applies_next_cycle() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);

    assert_eq!(
        ctl.handle_command(AppCommand::SetUnits('K'), &mut sink),
        Err(Error::InvalidUnits('K'))
    );
    ctl.handle_command(AppCommand::SetUnits('F'), &mut sink).unwrap();
    assert_eq!(ctl.pit_temperature(), None);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!((ctl.pit_temperature().unwrap() - 167.0).abs() < 0.01);
}

#[test]
fn raw_units_report_adc_value() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    ctl.set_units('A').unwrap();
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.pit_temperature(), Some(300.0));
    assert_eq!(ctl.probe(0).unwrap().temperature_avg(), None);
}

#[test]
fn remote_probe_fed_by_command() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    ctl.handle_command(
        AppCommand::SetProbeType {
            probe: 2,
            probe_type: ProbeType::Remote,
        },
        &mut sink,
    )
    .unwrap();
    ctl.handle_command(
        AppCommand::SetProbeCoefficients {
            probe: 2,
            coefficients: [1.129_148e-3, 2.341_25e-4, 8.767_41e-8, 10_000.0],
        },
        &mut sink,
    )
    .unwrap();
    ctl.handle_command(AppCommand::RemoteSample { probe: 2, value: 2048 }, &mut sink)
        .unwrap();
    hw.set_celsius(0, 75);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);

    let t = ctl.probe(2).unwrap().temperature().unwrap();
    assert!((t - 25.0).abs() < 0.2, "got {t}");
    assert_eq!(ctl.count_of_type(ProbeType::Remote), 1);
    assert!(ctl.any_food_probe_active());
}

#[test]
fn integral_gain_change_resets_sum() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 0.0, 1.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 95);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert_eq!(ctl.pid().contributions().integral, 15.0);

    ctl.handle_command(
        AppCommand::SetPidConstant {
            term: PidTerm::Integral,
            value: 0.5,
        },
        &mut sink,
    )
    .unwrap();
    assert_eq!(ctl.pid().contributions().integral, 0.0);
}

#[test]
fn reapplying_current_config_keeps_live_state() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 0.0, 1.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.set_alarm_threshold(1, AlarmSide::High, 80).unwrap();
    hw.set_celsius(0, 95);
    hw.set_celsius(1, 70);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert!(ctl.probe(1).unwrap().alarms.is_armed(AlarmSide::High));

    let config = ctl.current_config();
    ctl.handle_command(AppCommand::UpdateConfig(config.clone()), &mut sink).unwrap();
    assert_eq!(ctl.pit_temperature(), Some(95.0));
    assert_eq!(ctl.pid().contributions().integral, 15.0);
    assert!(ctl.probe(1).unwrap().alarms.is_armed(AlarmSide::High));

    // A different integral gain or probe type still restarts that state.
    let mut changed = config;
    changed.pid.integral = 0.5;
    changed.probes[1].probe_type = ProbeType::Disabled;
    ctl.handle_command(AppCommand::UpdateConfig(changed), &mut sink).unwrap();
    assert_eq!(ctl.pid().contributions().integral, 0.0);
    assert_eq!(ctl.probe(1).unwrap().temperature(), None);
    assert_eq!(ctl.pit_temperature(), Some(95.0));
}

#[test]
fn invalid_config_update_is_rejected_whole() {
    let (mut ctl, _hw, mut sink) = make_controller(100, 0.0, 2.0);
    let mut bad = ctl.current_config();
    bad.set_point = 180;
    bad.fan.min_speed = 90;
    bad.fan.max_speed = 50;
    assert!(matches!(
        ctl.handle_command(AppCommand::UpdateConfig(bad), &mut sink),
        Err(Error::Config(_))
    ));
    assert_eq!(ctl.set_point(), Some(100));
}

#[test]
fn config_changes_auto_save_after_settling() {
    let (mut ctl, mut hw, mut sink) = make_controller(100, 0.0, 2.0);
    let store = MockConfigStore::default();
    hw.set_celsius(0, 75);

    ctl.handle_command(AppCommand::SetSetPoint(150), &mut sink).unwrap();
    assert!(ctl.is_config_dirty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ConfigChanged)), 1);

    run_cycles(&mut ctl, &mut hw, &mut sink, 4);
    assert!(!ctl.auto_save_if_needed(&store));
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(ctl.auto_save_if_needed(&store));
    assert!(!ctl.is_config_dirty());
    assert_eq!(store.saves.get(), 1);
    assert_eq!(store.load().unwrap().set_point, 150);

    // Reload into a fresh controller.
    let again = GrillController::new(&store.load().unwrap()).unwrap();
    assert_eq!(again.set_point(), Some(150));
}
