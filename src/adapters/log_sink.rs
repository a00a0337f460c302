//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events through the `log`
//! facade.  Status and PID lines are printed verbatim so a host tool can
//! parse them from the log stream.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) => info!("{}", s),
            AppEvent::PidStatus(p) => info!("{}", p),
            AppEvent::Started => info!("START | controller running"),
            AppEvent::TemperatureReached => info!("PIT   | set point reached"),
            AppEvent::LidOpened { inferred } => {
                info!(
                    "LID   | open ({})",
                    if *inferred { "inferred" } else { "switch" }
                );
            }
            AppEvent::LidResumed => info!("LID   | resumed"),
            AppEvent::AlarmRinging { probe, side } => {
                warn!("ALARM | probe {} {:?}", probe, side);
            }
            AppEvent::AlarmsSilenced => info!("ALARM | silenced"),
            AppEvent::ConfigChanged => info!("CONF  | changed"),
        }
    }
}
