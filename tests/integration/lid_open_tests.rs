//! Lid-open supervision: external switch, inference from a temperature
//! drop, countdown expiry and early resume.

use pitpid::{Error, GrillController};
use pitpid::app::commands::AppCommand;
use pitpid::app::events::AppEvent;
use pitpid::config::ControllerConfig;
use pitpid::sensors::alarm::AlarmSide;

use super::mock_hw::{MockHardware, RecordingSink, gains, run_cycles, test_config};

fn with_lid_duration(mut config: ControllerConfig, secs: u16) -> ControllerConfig {
    config.lid_open.duration_secs = secs;
    config
}

/// Reach 100 °C, then drop 10 % so the lid is inferred open.
fn reach_then_drop(ctl: &mut GrillController, hw: &mut MockHardware, sink: &mut RecordingSink) {
    hw.set_celsius(0, 100);
    run_cycles(ctl, hw, sink, 1);
    assert!(ctl.temperature_reached());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TemperatureReached)), 1);

    hw.set_celsius(0, 90);
    run_cycles(ctl, hw, sink, 1);
    assert!(ctl.is_lid_open());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::LidOpened { inferred: true })),
        1
    );
}

// ── External lid switch ───────────────────────────────────────

#[test]
fn external_open_zeroes_output_and_silences_alarms() {
    let mut ctl = GrillController::new(&test_config(100, gains(40.0, 0.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.set_alarm_threshold(1, AlarmSide::High, 80).unwrap();

    hw.set_celsius(0, 75);
    hw.set_celsius(1, 70);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    hw.set_celsius(1, 85);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 40);
    assert!(ctl.any_alarm_ringing());

    ctl.handle_command(AppCommand::LidOpen(true), &mut sink).unwrap();
    assert!(ctl.is_lid_open());
    assert!(!ctl.any_alarm_ringing());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::LidOpened { inferred: false })),
        1
    );

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 0);
    assert_eq!(hw.last_fan(), Some(0));
    assert!(!ctl.any_alarm_ringing());
    assert_eq!(ctl.lid_countdown_secs(), 239);
    assert!(ctl.build_status().to_string().ends_with(",239"));

    ctl.handle_command(AppCommand::LidOpen(false), &mut sink).unwrap();
    assert!(!ctl.is_lid_open());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LidResumed)), 1);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 40);
}

#[test]
fn closing_an_already_closed_lid_is_silent() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut sink = RecordingSink::new();
    ctl.handle_command(AppCommand::LidOpen(false), &mut sink).unwrap();
    assert!(sink.events.is_empty());
}

#[test]
fn new_set_point_cancels_countdown() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut sink = RecordingSink::new();
    ctl.set_lid_open(true, &mut sink);
    assert!(ctl.is_lid_open());
    ctl.set_set_point(110).unwrap();
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.lid_countdown_secs(), 0);
}

// ── Inferred lid open ─────────────────────────────────────────

#[test]
fn inferred_open_runs_full_countdown_then_resumes() {
    let config = with_lid_duration(test_config(100, gains(0.0, 2.0, 0.0, 0.0)), 60);
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.set_alarm_threshold(1, AlarmSide::High, 80).unwrap();
    hw.set_celsius(1, 70);

    reach_then_drop(&mut ctl, &mut hw, &mut sink);
    // Detection happens after the PID ran, so this cycle still drove.
    assert_eq!(ctl.output(), 20);

    // Food crosses its alarm while the lid is open: armed but quiet.
    hw.set_celsius(1, 85);
    for _ in 0..59 {
        run_cycles(&mut ctl, &mut hw, &mut sink, 1);
        assert!(ctl.is_lid_open());
        assert_eq!(ctl.output(), 0);
        assert!(!ctl.any_alarm_ringing());
    }
    assert_eq!(ctl.lid_countdown_secs(), 1);

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.output(), 0);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LidResumed)), 1);

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output(), 20);
    assert!(ctl.any_alarm_ringing());
    // Reached latch was cleared by the trigger: no second detection.
    assert!(!ctl.temperature_reached());
    assert!(!ctl.is_lid_open());
}

#[test]
fn pit_back_at_set_point_resumes_early() {
    let config = with_lid_duration(test_config(100, gains(0.0, 2.0, 0.0, 0.0)), 120);
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    reach_then_drop(&mut ctl, &mut hw, &mut sink);

    // Early resume needs at least 30 s of suppression.
    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 30);
    assert!(ctl.is_lid_open());
    assert_eq!(ctl.lid_countdown_secs(), 90);

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.is_lid_open());
    assert!(ctl.temperature_reached());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TemperatureReached)), 2);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LidResumed)), 1);
}

#[test]
fn first_reach_scales_integral_once() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 0.0, 1.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 95);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert_eq!(ctl.pid().contributions().integral, 15.0);

    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(ctl.temperature_reached());
    assert_eq!(ctl.pid().contributions().integral, 3.75);

    run_cycles(&mut ctl, &mut hw, &mut sink, 5);
    assert_eq!(ctl.pid().contributions().integral, 3.75);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TemperatureReached)), 1);
}

#[test]
fn huge_offset_is_rejected_and_control_continues() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(ctl.temperature_reached());

    assert!(matches!(ctl.set_probe_offset(0, -1.0e8), Err(Error::Config(_))));
    assert!(matches!(ctl.set_probe_offset(0, f32::NAN), Err(Error::Config(_))));
    assert!(ctl.set_probe_offset(0, -5.0).is_ok());

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.pit_temperature(), Some(95.0));
    assert!(!ctl.is_lid_open());
}

#[test]
fn small_drop_is_not_a_lid() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    hw.set_celsius(0, 95);
    run_cycles(&mut ctl, &mut hw, &mut sink, 5);
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.output(), 10);
}

#[test]
fn no_inference_before_set_point_reached() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 60);
    run_cycles(&mut ctl, &mut hw, &mut sink, 10);
    assert!(!ctl.temperature_reached());
    assert!(!ctl.is_lid_open());
}

#[test]
fn high_output_drop_is_out_of_fuel_not_lid() {
    let mut ctl = GrillController::new(&test_config(100, gains(100.0, 2.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert_eq!(ctl.output_avg(), 100.0);

    hw.set_celsius(0, 90);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.output(), 100);
}

// ── Manual mode ───────────────────────────────────────────────

#[test]
fn manual_output_held_at_zero_until_countdown_expires() {
    let config = with_lid_duration(test_config(100, gains(0.0, 2.0, 0.0, 0.0)), 30);
    let mut ctl = GrillController::new(&config).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 75);

    ctl.set_lid_open(true, &mut sink);
    ctl.set_manual_output(60);
    for _ in 0..29 {
        run_cycles(&mut ctl, &mut hw, &mut sink, 1);
        assert_eq!(ctl.output(), 0);
    }
    assert!(ctl.is_lid_open());

    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.output(), 60);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LidResumed)), 1);
}

#[test]
fn manual_mode_never_infers_lid() {
    let mut ctl = GrillController::new(&test_config(100, gains(0.0, 2.0, 0.0, 0.0))).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    hw.set_celsius(0, 100);
    run_cycles(&mut ctl, &mut hw, &mut sink, 1);
    assert!(ctl.temperature_reached());

    ctl.set_manual_output(30);
    hw.set_celsius(0, 50);
    run_cycles(&mut ctl, &mut hw, &mut sink, 3);
    assert!(!ctl.is_lid_open());
    assert_eq!(ctl.output(), 30);
}
