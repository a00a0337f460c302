//! Actuator drivers: blower duty shaping and the servo pulse generator.

pub mod fan;
pub mod servo;
