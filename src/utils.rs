use std::time::Duration;

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::JsValue;
use web_sys::console;
use web_sys::js_sys::Date;

pub fn set_panic_hook() {
    // Better panic messages in the browser console.
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// `log` backend writing to the browser console.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => console::error_1(&line),
            Level::Warn => console::warn_1(&line),
            Level::Info => console::info_1(&line),
            Level::Debug | Level::Trace => console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger once; later calls only move the level.
pub fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("console logger already installed");
    }
    log::set_max_level(level);
}

/// Millisecond timestamp from the JS clock.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WasmInstant {
    timestamp: f64,
}

impl WasmInstant {
    pub fn now() -> Self {
        Self::at(Date::now())
    }

    pub fn at(timestamp: f64) -> Self {
        Self { timestamp }
    }
}

impl std::ops::Add<Duration> for WasmInstant {
    type Output = WasmInstant;

    fn add(self, duration: Duration) -> Self::Output {
        Self {
            timestamp: self.timestamp + duration.as_millis() as f64,
        }
    }
}

/// Tracks when target selection started so the click that opened it cannot
/// also cancel it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackClock {
    started: Option<WasmInstant>,
}

impl AttackClock {
    pub fn arm(&mut self, now: WasmInstant) {
        self.started = Some(now);
    }

    pub fn disarm(&mut self) {
        self.started = None;
    }

    pub fn blocks_abort(&self, now: WasmInstant, grace: Duration) -> bool {
        self.started.is_some_and(|started| now < started + grace)
    }
}
