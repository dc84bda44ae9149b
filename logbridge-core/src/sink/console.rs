//! Console sink

use super::{Output, Sink};
use crate::format::Encoding;
use crate::level::Level;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Writes human-readable lines to stdout (or any writer)
pub struct ConsoleSink {
    level: Level,
    colorize: bool,
    target: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink targeting the process's standard output. Levels are
    /// coloured when stdout is a terminal.
    pub fn new(level: Level) -> Self {
        let stdout = io::stdout();
        let colorize = stdout.is_terminal();
        Self::with_writer(level, stdout).colorize(colorize)
    }

    /// Console sink targeting an arbitrary writer, e.g. stderr or a
    /// [`SharedBuffer`](super::SharedBuffer).
    pub fn with_writer<W: Write + Send + 'static>(level: Level, writer: W) -> Self {
        Self { level, colorize: false, target: Mutex::new(Box::new(writer)) }
    }

    /// Toggle ANSI colour codes around the level.
    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("level", &self.level)
            .field("colorize", &self.colorize)
            .finish_non_exhaustive()
    }
}

impl Sink for ConsoleSink {
    fn output(&self) -> Output {
        Output::Console
    }

    fn level(&self) -> Level {
        self.level
    }

    fn encoding(&self) -> Encoding {
        if self.colorize {
            Encoding::ColorText
        } else {
            Encoding::Text
        }
    }

    fn write(&self, line: &[u8]) -> anyhow::Result<()> {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        target.write_all(line)?;
        target.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self, _timeout: Duration) {
        let _ = self.target.lock().unwrap_or_else(PoisonError::into_inner).flush();
    }
}
