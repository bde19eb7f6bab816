use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::serial_println;

pub struct KernelLogger {
    level: LevelFilter,
}

impl KernelLogger {
    pub const fn new(level: LevelFilter) -> Self {
        KernelLogger { level }
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            serial_println!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger::new(crate::constants::serial::LOG_LEVEL);

/// Install the serial logger. Fails if a logger is already set.
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LOGGER.level);
    Ok(())
}
