//! Filesystem logging facility
//!
//! Routes `log` records from the volume manager to the kernel console.
//! Log levels are configured based on build configuration (debug/release).

use core::fmt;
use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Function the kernel console exposes for formatted output
pub type ConsoleWriter = fn(fmt::Arguments);

/// Global logger instance shared by every mounted volume
pub static LOGGER: Logger = Logger::new();

/// Thread-safe logger forwarding to a console writer
pub struct Logger {
    console: Mutex<Option<ConsoleWriter>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a logger with no console attached
    pub const fn new() -> Logger {
        Logger {
            console: Mutex::new(None),
        }
    }

    /// Attaches (or replaces) the console that receives records
    pub fn attach(&self, console: ConsoleWriter) {
        *self.console.lock() = Some(console);
    }
}

impl Log for Logger {
    /// Determines if a log message should be processed based on its level
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    /// Formats messages as "[LEVEL] message" and hands them to the console
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let console = self.console.lock();
        if let Some(write) = *console {
            write(format_args!("[{}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Initializes the logging system
///
/// # Arguments
/// * `console` - Writer that prints to the kernel console
///
/// # Notes
/// * Sets different log levels for debug/release builds:
///   - Debug builds: LevelFilter::Debug
///   - Release builds: LevelFilter::Info
/// * A second call only swaps the console; the `log` facade accepts one logger.
pub fn init(console: ConsoleWriter) {
    LOGGER.attach(console);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(
            #[cfg(debug_assertions)]
            LevelFilter::Debug,
            #[cfg(not(debug_assertions))]
            LevelFilter::Info,
        );
    }
}
