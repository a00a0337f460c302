//! pitpid-sim: host simulation entry point.
//!
//! Runs the controller against a simulated pit, in accelerated time,
//! with the servo pulse generator on its own thread standing in for the
//! timer compare interrupt.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  Board<ManualClock, SimulatedPit, PwmFan<SimBlower>>         │
//! │  LogEventSink (EventSink)   MemoryConfigStore (ConfigPort)   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          GrillController (pure logic)                  │  │
//! │  │  probes · PID · lid-open · fan/servo shaping           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  servo-isr thread ◀── SERVO_PULSE (AtomicU16) ── commit      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `pitpid-sim [config.json] [minutes]`
#![deny(unused_must_use)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;

use pitpid::adapters::config_store::{JsonFileConfigStore, MemoryConfigStore};
use pitpid::adapters::hardware::{Board, PwmFan};
use pitpid::adapters::log_sink::LogEventSink;
use pitpid::adapters::sim::{BlowerDuty, SIM_PROBE, SimBlower, SimPin, SimulatedPit};
use pitpid::adapters::time::{HostClock, ManualClock};
use pitpid::app::ports::{ClockPort, ConfigPort};
use pitpid::config::ControllerConfig;
use pitpid::drivers::servo::{SERVO_REFRESH_US, ServoPulse, ServoPulseGenerator};
use pitpid::sensors::{AMBIENT, FOOD1, FOOD2, PIT};
use pitpid::{Error, GrillController};

// ── Shared with the servo "interrupt" ─────────────────────────

static SERVO_PULSE: ServoPulse = ServoPulse::new();
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const DEFAULT_MINUTES: u32 = 90;
const AMBIENT_C: f32 = 20.0;
/// Simulated lid opening: start minute and length.
const LID_OPEN_AT_MIN: u32 = 60;
const LID_OPEN_MS: u32 = 90_000;
/// Emit a status line every this many control cycles.
const STATUS_EVERY: u64 = 30;

fn sim_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    for idx in [PIT, FOOD1, FOOD2, AMBIENT] {
        config.probes[idx] = SIM_PROBE;
    }
    config.probes[FOOD1].alarm_high = 160;
    config
}

/// Stand-in for the timer compare ISR.  Only touches `SERVO_PULSE`.
fn spawn_servo_isr() -> Result<thread::JoinHandle<SimPin>> {
    thread::Builder::new()
        .name("servo-isr".into())
        .spawn(|| {
            let clock = HostClock::new();
            let mut generator = ServoPulseGenerator::new(SimPin::default(), &SERVO_PULSE);
            let mut frame_start = clock.micros();
            let mut counter_us = SERVO_REFRESH_US;
            while !SHUTDOWN.load(Ordering::Acquire) {
                let next = match generator.on_compare(counter_us) {
                    Ok(next) => next,
                    Err(never) => match never {},
                };
                if next.reset_counter {
                    frame_start = clock.micros();
                }
                let elapsed = clock.micros().wrapping_sub(frame_start);
                thread::sleep(Duration::from_micros(u64::from(
                    next.compare_us.saturating_sub(elapsed),
                )));
                counter_us = next.compare_us;
            }
            generator.release()
        })
        .context("spawning servo thread")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("pitpid-sim v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Arguments and configuration ────────────────────────
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => JsonFileConfigStore::new(&path)
            .load()
            .map_err(Error::from)
            .with_context(|| format!("loading {path}"))?,
        None => sim_config(),
    };
    let minutes: u32 = match args.next() {
        Some(m) => m.parse().with_context(|| format!("invalid minutes '{m}'"))?,
        None => DEFAULT_MINUTES,
    };
    let store = MemoryConfigStore::new();
    store.save(&config).map_err(Error::from)?;

    // ── 2. Adapters ───────────────────────────────────────────
    let blower = BlowerDuty::default();
    let mut board = Board::new(
        ManualClock::new(0),
        SimulatedPit::new(AMBIENT_C, blower.clone()),
        PwmFan::new(SimBlower::new(blower)),
        &SERVO_PULSE,
    );
    let mut sink = LogEventSink::new();
    let servo_isr = spawn_servo_isr()?;

    // ── 3. Controller ─────────────────────────────────────────
    let mut ctl = GrillController::new(&config)?;
    ctl.start(&mut sink);

    // ── 4. Main loop (accelerated time) ───────────────────────
    let sub_tick = config.timing.sub_tick_ms();
    let end_ms = minutes.saturating_mul(60_000);
    let mut lid_opened = false;

    while board.millis() < end_ms {
        board.clock.advance(sub_tick);
        board.analog.step(sub_tick);

        if !lid_opened && board.millis() >= LID_OPEN_AT_MIN * 60_000 {
            info!("SIM   | lid opened for {}s", LID_OPEN_MS / 1000);
            board.analog.open_lid(LID_OPEN_MS);
            lid_opened = true;
        }

        if ctl.do_work(&mut board, &mut sink) {
            if ctl.cycle_count() % STATUS_EVERY == 0 {
                ctl.emit_status(&mut sink);
            }
            ctl.auto_save_if_needed(&store);
        }
    }

    // ── 5. Shutdown ───────────────────────────────────────────
    ctl.emit_status(&mut sink);
    ctl.force_save_if_dirty(&store);
    SHUTDOWN.store(true, Ordering::Release);
    let pin = servo_isr
        .join()
        .map_err(|_| anyhow!("servo thread panicked"))?;
    info!(
        "Done: {} cycles, pit {:.1}°C, food {:.1}°C, {} servo frames",
        ctl.cycle_count(),
        board.analog.pit_c(),
        board.analog.food_c(),
        pin.rising_edges()
    );
    info!("Final config: {}", serde_json::to_string(&ctl.current_config())?);
    Ok(())
}
