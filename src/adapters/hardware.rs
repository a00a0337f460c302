//! Hardware adapter: bridges board peripherals to the controller ports.
//!
//! [`PwmFan`] wraps any `embedded-hal` PWM channel as a [`FanPort`].
//! [`Board`] bundles a clock, an ADC, the fan and the shared servo pulse
//! cell so one `&mut` satisfies every port
//! [`do_work`](crate::app::service::GrillController::do_work) needs.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::{AnalogPort, ClockPort, FanPort, ServoPort};
use crate::drivers::fan::DUTY_MAX;
use crate::drivers::servo::ServoPulse;

/// Blower on an `embedded-hal` PWM channel.
pub struct PwmFan<P: SetDutyCycle> {
    pwm: P,
    duty: u8,
}

impl<P: SetDutyCycle> PwmFan<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, duty: 0 }
    }

    /// Last duty successfully written (0–255).
    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> FanPort for PwmFan<P> {
    fn set_fan_duty(&mut self, duty: u8) {
        match self
            .pwm
            .set_duty_cycle_fraction(u16::from(duty), u16::from(DUTY_MAX))
        {
            Ok(()) => self.duty = duty,
            Err(e) => warn!("Fan PWM write failed: {:?}", e),
        }
    }
}

/// Concrete adapter that combines all controller-facing hardware.
pub struct Board<'a, C, A, F> {
    pub clock: C,
    pub analog: A,
    pub fan: F,
    servo: &'a ServoPulse,
}

impl<'a, C, A, F> Board<'a, C, A, F>
where
    C: ClockPort,
    A: AnalogPort,
    F: FanPort,
{
    pub fn new(clock: C, analog: A, fan: F, servo: &'a ServoPulse) -> Self {
        Self {
            clock,
            analog,
            fan,
            servo,
        }
    }
}

impl<C: ClockPort, A, F> ClockPort for Board<'_, C, A, F> {
    fn millis(&self) -> u32 {
        self.clock.millis()
    }
}

impl<C, A: AnalogPort, F> AnalogPort for Board<'_, C, A, F> {
    fn read_analog(&mut self, channel: usize) -> u16 {
        self.analog.read_analog(channel)
    }
}

impl<C, A, F: FanPort> FanPort for Board<'_, C, A, F> {
    fn set_fan_duty(&mut self, duty: u8) {
        self.fan.set_fan_duty(duty);
    }
}

impl<C, A, F> ServoPort for Board<'_, C, A, F> {
    fn commit_servo_pulse(&mut self, width_us: u16) {
        self.servo.store(width_us);
    }
}
