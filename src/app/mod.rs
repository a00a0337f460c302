//! Application core: pure control logic, zero I/O.
//!
//! This module sequences the pit controller: sampling, conversion, PID,
//! lid-open supervision and actuator shaping.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
