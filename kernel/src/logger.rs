//! Simple logger implementation for the kernel
//!
//! Formats `log` records into a fixed stack buffer (no allocation, usable
//! with the scheduler locked) and hands the bytes to a console sink
//! registered at boot.

use core::fmt::Write;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

/// Size of the per-record formatting buffer; longer lines are truncated.
pub const LINE_MAX: usize = 512;

/// Console output routine (serial port, VGA, host stderr...).
pub type ConsoleSink = fn(&[u8]);

/// Simple logger that writes to the registered console
struct KernelLogger {
    sink: Once<ConsoleSink>,
}

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(sink) = self.sink.get() {
            let mut buf = [0u8; LINE_MAX];
            let len = render(record.level(), record.args(), &mut buf);
            sink(&buf[..len]);
        }
    }

    fn flush(&self) {}
}

/// Simple buffer writer for formatting without alloc
pub struct BufferWriter<'a> {
    pub buffer: &'a mut [u8],
    pub pos: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }
}

impl Write for BufferWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buffer.len() - self.pos;
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buffer[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Format `[LEVEL] message\n` into `buf`, returning the length used.
pub fn render(level: Level, args: &core::fmt::Arguments<'_>, buf: &mut [u8]) -> usize {
    let mut writer = BufferWriter::new(buf);
    let _ = writeln!(writer, "[{}] {}", level_str(level), args);
    writer.pos
}

/// Global logger instance
static LOGGER: KernelLogger = KernelLogger { sink: Once::new() };

/// Install the kernel logger.
///
/// Call this early in boot, before the scheduler is initialized.
pub fn init(sink: ConsoleSink, level: LevelFilter) -> Result<(), SetLoggerError> {
    LOGGER.sink.call_once(|| sink);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    log::info!("[LOGGER] Logger initialized at {}", level);
    Ok(())
}
