//! Blower duty synthesis.
//!
//! Small blowers stall below a minimum duty.  Demand under that minimum is
//! produced as a "long pulse" PWM instead: the super period (10 s by
//! default) is split into one slot per control period, and the fan runs at
//! its minimum duty for a share of slots proportional to
//! `demand / minimum`, then stays off for the rest.
//!
//! ```text
//!   demand 4%, min 10%, 10 slots:  ████░░░░░░ ████░░░░░░ ...
//! ```
//!
//! Starting from a stopped blower, an optional boost drives it fully on
//! for one sampling sub-tick to break static friction.

use crate::config::{FanConfig, OutputFlags};

/// Hardware duty for a fully-on blower.
pub const DUTY_MAX: u8 = u8::MAX;

/// What to write to the blower PWM this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanCommand {
    /// Steady hardware duty (0–255), inversion applied.
    pub duty: u8,
    /// Drive [`DUTY_MAX`] until the next sub-tick, then `duty`.
    pub boost: bool,
}

impl FanCommand {
    /// Value to write right now.
    pub fn immediate_duty(&self) -> u8 {
        if self.boost { DUTY_MAX } else { self.duty }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FanOutput {
    long_pwm_slot: u16,
    last_duty: u8,
    boost_active: bool,
}

impl FanOutput {
    pub const fn new() -> Self {
        Self {
            long_pwm_slot: 0,
            last_duty: 0,
            boost_active: false,
        }
    }

    /// Blower speed (percent) requested by a controller output.
    pub fn nominal_speed(output: u8, config: &FanConfig, flags: &OutputFlags) -> u8 {
        if flags.fan_only_max && output < 100 {
            return 0;
        }
        (u16::from(output) * u16::from(config.max_speed) / 100) as u8
    }

    /// Shape one controller output into a hardware command.
    ///
    /// `slots` is the number of control periods per long-PWM super period.
    pub fn shape(
        &mut self,
        output: u8,
        config: &FanConfig,
        flags: &OutputFlags,
        slots: u16,
    ) -> FanCommand {
        let mut speed = Self::nominal_speed(output, config, flags);

        if speed >= config.min_speed {
            self.long_pwm_slot = 0;
        } else {
            let on_slots = u32::from(slots) * u32::from(speed) / u32::from(config.min_speed);
            speed = if on_slots > u32::from(self.long_pwm_slot) {
                config.min_speed
            } else {
                0
            };
            self.long_pwm_slot += 1;
            if self.long_pwm_slot >= slots {
                self.long_pwm_slot = 0;
            }
        }

        let mut duty = (u16::from(speed) * u16::from(DUTY_MAX) / 100) as u8;
        if flags.invert_fan {
            duty = DUTY_MAX - duty;
        }

        let boost = config.boost && self.last_duty == 0 && duty != 0;
        self.boost_active = boost;
        self.last_duty = duty;
        FanCommand { duty, boost }
    }

    /// End a boost started by the previous [`shape`](Self::shape).
    /// Returns the steady duty to restore.
    pub fn end_boost(&mut self) -> Option<u8> {
        if self.boost_active {
            self.boost_active = false;
            Some(self.last_duty)
        } else {
            None
        }
    }

    /// Last committed steady hardware duty.
    pub fn duty(&self) -> u8 {
        self.last_duty
    }

    pub fn is_boosting(&self) -> bool {
        self.boost_active
    }
}
