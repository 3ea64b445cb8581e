//! Capture a logger's output for the duration of a test.
//!
//! ```no_run
//! use callsite_log::{testutils::LogCollector, Logger, LogLevel};
//!
//! let logger = Logger::new();
//! let collector = LogCollector::new(&logger, Some(LogLevel::Debug));
//! logger.debug("inside the test");
//! assert_eq!(collector.lines().len(), 1);
//! ```
//!
//! Output and level are restored when the collector drops. If the test is
//! failing at that point the captured lines are written to stderr.

use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{LogLevel, Logger};

/// What a logger must offer to have its output collected.
pub trait Collectable {
    fn level(&self) -> LogLevel;
    fn set_level(&self, level: LogLevel);
    fn replace_output(&self, out: Box<dyn Write + Send>) -> Box<dyn Write + Send>;
}

impl Collectable for Logger {
    fn level(&self) -> LogLevel {
        Logger::level(self)
    }

    fn set_level(&self, level: LogLevel) {
        Logger::set_level(self, level)
    }

    fn replace_output(&self, out: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        Logger::replace_output(self, out)
    }
}

/// In-memory sink shared between a logger and whoever inspects its output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct LogCollector<'a, L: Collectable + ?Sized = Logger> {
    logger: &'a L,
    buffer: SharedBuffer,
    saved_out: Option<Box<dyn Write + Send>>,
    saved_level: Option<LogLevel>,
}

impl<'a, L: Collectable + ?Sized> LogCollector<'a, L> {
    pub fn new(logger: &'a L, level: Option<LogLevel>) -> Self {
        let buffer = SharedBuffer::default();
        let saved_out = Some(logger.replace_output(Box::new(buffer.clone())));

        let saved_level = level.map(|level| {
            let saved = logger.level();
            logger.set_level(level);
            saved
        });

        LogCollector {
            logger,
            buffer,
            saved_out,
            saved_level,
        }
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    pub fn contents(&self) -> String {
        self.buffer.contents()
    }

    pub fn lines(&self) -> Vec<String> {
        self.buffer.lines()
    }

    pub fn restore(self) {}
}

impl<L: Collectable + ?Sized> Drop for LogCollector<'_, L> {
    fn drop(&mut self) {
        if let Some(out) = self.saved_out.take() {
            self.logger.replace_output(out);
        }
        if let Some(level) = self.saved_level.take() {
            self.logger.set_level(level);
        }

        if std::thread::panicking() {
            eprint!("{}", self.buffer.contents());
        }
    }
}
