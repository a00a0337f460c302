//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements             | Connects to                 |
//! |----------------|------------------------|-----------------------------|
//! | `hardware`     | FanPort (`PwmFan`)     | `embedded-hal` PWM channel  |
//! |                | all ports (`Board`)    | clock + ADC + fan + servo   |
//! | `log_sink`     | EventSink              | `log` facade                |
//! | `config_store` | ConfigPort             | postcard slot / JSON file   |
//! | `time`         | ClockPort              | `Instant` / manual clock    |
//! | `sim`          | AnalogPort, PWM, pin   | simulated pit plant         |

pub mod config_store;
pub mod hardware;
pub mod log_sink;
pub mod sim;
pub mod time;
