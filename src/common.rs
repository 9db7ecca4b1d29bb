// Licensed under the Apache-2.0 license

//! Crate-wide support types.
//!
//! Drivers in this crate never print directly. They take a [`Logger`] as a
//! type parameter so firmware can route messages to a UART while tests and
//! size-constrained builds use [`NoOpLogger`] and pay nothing for it.

use core::fmt;

/// Sink for driver diagnostics.
pub trait Logger {
    /// Progress information (configuration values, phase transitions).
    fn debug(&mut self, args: fmt::Arguments<'_>);

    /// A bus phase failed or the hardware reported an unexpected state.
    fn error(&mut self, args: fmt::Arguments<'_>);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Logger writing one line per message to an `embedded_io` writer.
///
/// Write failures are dropped: losing a log line must never change the
/// outcome of a bus operation.
pub struct IoLogger<W: embedded_io::Write> {
    writer: W,
    debug_enabled: bool,
}

impl<W: embedded_io::Write> IoLogger<W> {
    /// Create a logger that emits both debug and error lines.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            debug_enabled: true,
        }
    }

    /// Suppress debug lines, keeping only errors.
    #[must_use]
    pub fn errors_only(mut self) -> Self {
        self.debug_enabled = false;
        self
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for IoLogger<W> {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        if self.debug_enabled {
            let _ = write!(self.writer, "[twi] {args}\r\n");
        }
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        let _ = write!(self.writer, "[twi] error: {args}\r\n");
    }
}
