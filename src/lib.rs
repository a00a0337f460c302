//! Pit temperature controller library.
//!
//! Probe sampling and calibration, PID control with lid-open
//! supervision, and blower/servo output shaping.  Hardware is reached
//! only through the port traits in [`app::ports`], so the whole pipeline
//! runs and tests on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod sensors;

pub use app::service::GrillController;
pub use config::ControllerConfig;
pub use error::{Error, Result};
