//! Fuzz target: controller under arbitrary ADC reads and commands
//!
//! Each input byte pair either scripts a probe's ADC value, sends a
//! command, or advances the clock by one sub-tick.  Checks:
//! - No panics
//! - Output stays within 0–100
//! - The servo pulse never leaves the configured end stops
//!
//! cargo fuzz run fuzz_controller

#![no_main]

use libfuzzer_sys::fuzz_target;
use pitpid::app::commands::AppCommand;
use pitpid::app::events::AppEvent;
use pitpid::app::ports::{AnalogPort, ClockPort, EventSink, FanPort, ServoPort};
use pitpid::control::pid::PidTerm;
use pitpid::sensors::PROBE_COUNT;
use pitpid::sensors::alarm::AlarmSide;
use pitpid::sensors::convert::ProbeType;
use pitpid::{ControllerConfig, GrillController};

struct Hw {
    now: u32,
    adc: [u16; PROBE_COUNT],
}

impl ClockPort for Hw {
    fn millis(&self) -> u32 {
        self.now
    }
}
impl AnalogPort for Hw {
    fn read_analog(&mut self, channel: usize) -> u16 {
        self.adc[channel]
    }
}
impl FanPort for Hw {
    fn set_fan_duty(&mut self, _duty: u8) {}
}
impl ServoPort for Hw {
    fn commit_servo_pulse(&mut self, _width_us: u16) {}
}

struct Discard;
impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fn command(op: u8, arg: u8) -> AppCommand {
    let probe = usize::from(arg) % (PROBE_COUNT + 1);
    match op % 12 {
        0 => AppCommand::SetSetPoint(i16::from(arg) * 2 - 10),
        1 => AppCommand::SetManualOutput(arg),
        2 => AppCommand::SetPidConstant {
            term: PidTerm::try_from(arg % 4).unwrap_or(PidTerm::Bias),
            value: f32::from(arg) / 10.0,
        },
        3 => AppCommand::SetUnits(['F', 'C', 'A', 'R', 'X'][usize::from(arg) % 5]),
        4 => AppCommand::SetLidOpenDuration(u16::from(arg)),
        5 => AppCommand::SetLidOpenOffset(arg),
        6 => AppCommand::LidOpen(arg & 1 == 1),
        7 => AppCommand::SetProbeType {
            probe,
            probe_type: ProbeType::try_from(arg % 5).unwrap_or(ProbeType::Disabled),
        },
        8 => AppCommand::SetAlarmThreshold {
            probe,
            side: if arg & 1 == 1 { AlarmSide::High } else { AlarmSide::Low },
            value: i16::from(arg) - 20,
        },
        9 => AppCommand::SetFanSpeeds {
            min: arg % 50,
            max: arg,
        },
        10 => AppCommand::RemoteSample {
            probe,
            value: u16::from(arg) << 4,
        },
        _ => AppCommand::SilenceAlarms,
    }
}

fuzz_target!(|data: &[u8]| {
    let config = ControllerConfig::default();
    let Ok(mut ctl) = GrillController::new(&config) else {
        return;
    };
    let mut hw = Hw {
        now: 0,
        adc: [512; PROBE_COUNT],
    };
    let mut sink = Discard;

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        match op >> 6 {
            0 => hw.adc[usize::from(op) % PROBE_COUNT] = u16::from(arg) * 4,
            1 => {
                let _ = ctl.handle_command(command(op, arg), &mut sink);
            }
            _ => {
                hw.now = hw.now.wrapping_add(125);
                ctl.do_work(&mut hw, &mut sink);
            }
        }
        assert!(ctl.output() <= 100);
        let servo = ctl.current_config().servo;
        let pulse = ctl.servo_pulse_us();
        assert!(pulse == 0 || (servo.min_pulse_us..=servo.max_pulse_us).contains(&pulse));
    }
});
