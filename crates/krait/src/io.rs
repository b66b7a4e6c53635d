//! Console output sink.
//!
//! `console.log` and friends write through a [`ConsoleWriter`] owned by the
//! engine, so embedders can capture or silence script output. The default
//! writer goes to the process stdout/stderr.

use std::io::Write as _;

/// Which console stream a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// `console.log`
    Log,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
}

/// Receives formatted console output, one line per call.
pub trait ConsoleWriter {
    /// Called with the fully formatted line (no trailing newline).
    fn write_line(&mut self, stream: ConsoleStream, line: &str);
}

/// Default writer: `log` to stdout, `warn`/`error` to stderr.
#[derive(Debug, Default)]
pub struct StdConsole;

impl ConsoleWriter for StdConsole {
    fn write_line(&mut self, stream: ConsoleStream, line: &str) {
        match stream {
            ConsoleStream::Log => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            ConsoleStream::Warn | ConsoleStream::Error => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// Collects console output in memory; used by tests and embedders that want
/// to inspect script output. The line buffer is shared, so a clone kept by
/// the host observes everything the engine-owned writer collects.
#[derive(Debug, Clone, Default)]
pub struct CollectConsole {
    lines: std::rc::Rc<std::cell::RefCell<Vec<(ConsoleStream, String)>>>,
}

impl CollectConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected lines regardless of stream.
    #[must_use]
    pub fn lines(&self) -> Vec<(ConsoleStream, String)> {
        self.lines.borrow().clone()
    }

    /// Collected text, one element per line.
    #[must_use]
    pub fn text(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, line)| line.clone()).collect()
    }
}

impl ConsoleWriter for CollectConsole {
    fn write_line(&mut self, stream: ConsoleStream, line: &str) {
        self.lines.borrow_mut().push((stream, line.to_owned()));
    }
}

/// Discards all console output.
#[derive(Debug, Default)]
pub struct NoConsole;

impl ConsoleWriter for NoConsole {
    fn write_line(&mut self, _stream: ConsoleStream, _line: &str) {}
}
