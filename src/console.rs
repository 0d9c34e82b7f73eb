//! Console sinks behind a uniform colored-write contract.
//!
//! Two strategies exist: passing pre-escaped ANSI text straight through, and
//! replaying decoded color spans through the platform color API. Which one a
//! provider uses is decided once at construction, never per record.

use crate::ansi::{self, Color};
use colored::Colorize;
use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex};

/// Destination for formatted console output.
///
/// `write` appends one colored span; `background`/`foreground` of `None`
/// leave the stream at its current colors. Implementations must be safe to
/// call from the background worker and, during shutdown races, from
/// producer threads.
pub trait Console: Send + Sync {
    fn write(&self, text: &str, background: Option<Color>, foreground: Option<Color>) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;
}

/// Raw passthrough console for ANSI-native terminals.
///
/// Color arrives embedded in the text as escape codes, so the color
/// parameters are ignored and the span is written verbatim.
pub struct AnsiConsole {
    use_stderr: bool,
}

impl AnsiConsole {
    pub fn stdout() -> Self {
        AnsiConsole { use_stderr: false }
    }

    pub fn stderr() -> Self {
        AnsiConsole { use_stderr: true }
    }
}

impl Console for AnsiConsole {
    fn write(&self, text: &str, _background: Option<Color>, _foreground: Option<Color>) -> io::Result<()> {
        if self.use_stderr {
            io::stderr().lock().write_all(text.as_bytes())
        } else {
            io::stdout().lock().write_all(text.as_bytes())
        }
    }

    fn flush(&self) -> io::Result<()> {
        if self.use_stderr {
            io::stderr().lock().flush()
        } else {
            io::stdout().lock().flush()
        }
    }
}

fn term_color(color: Color) -> colored::Color {
    match color {
        Color::Black => colored::Color::Black,
        Color::DarkRed => colored::Color::Red,
        Color::DarkGreen => colored::Color::Green,
        Color::DarkYellow => colored::Color::Yellow,
        Color::DarkBlue => colored::Color::Blue,
        Color::DarkMagenta => colored::Color::Magenta,
        Color::DarkCyan => colored::Color::Cyan,
        Color::Gray => colored::Color::White,
        Color::DarkGray => colored::Color::BrightBlack,
        Color::Red => colored::Color::BrightRed,
        Color::Green => colored::Color::BrightGreen,
        Color::Yellow => colored::Color::BrightYellow,
        Color::Blue => colored::Color::BrightBlue,
        Color::Magenta => colored::Color::BrightMagenta,
        Color::Cyan => colored::Color::BrightCyan,
        Color::White => colored::Color::BrightWhite,
    }
}

/// Console writing discrete colored spans through the platform color API
/// (the `colored` crate, which owns terminal capability detection and
/// Windows virtual-terminal enablement).
///
/// Background is applied before foreground; the stream is reset after the
/// span whenever any color was set.
pub struct ColoredConsole {
    use_stderr: bool,
}

impl ColoredConsole {
    pub fn stdout() -> Self {
        ColoredConsole { use_stderr: false }
    }

    pub fn stderr() -> Self {
        ColoredConsole { use_stderr: true }
    }

    fn write_to(&self, bytes: impl std::fmt::Display) -> io::Result<()> {
        if self.use_stderr {
            write!(io::stderr().lock(), "{bytes}")
        } else {
            write!(io::stdout().lock(), "{bytes}")
        }
    }
}

impl Console for ColoredConsole {
    fn write(&self, text: &str, background: Option<Color>, foreground: Option<Color>) -> io::Result<()> {
        if background.is_none() && foreground.is_none() {
            return self.write_to(text);
        }
        let mut span = colored::ColoredString::from(text);
        if let Some(bg) = background {
            span = span.on_color(term_color(bg));
        }
        if let Some(fg) = foreground {
            span = span.color(term_color(fg));
        }
        self.write_to(span)
    }

    fn flush(&self) -> io::Result<()> {
        if self.use_stderr {
            io::stderr().lock().flush()
        } else {
            io::stdout().lock().flush()
        }
    }
}

/// Bridge for targets without native ANSI support: decodes the inline
/// escape stream back into discrete colored writes on an inner console.
///
/// Decoding happens once per write, not per character; unmatched escape
/// sequences stay in the content and are written as-is.
pub struct AnsiParsingConsole {
    inner: Arc<dyn Console>,
}

impl AnsiParsingConsole {
    pub fn new(inner: Arc<dyn Console>) -> Self {
        AnsiParsingConsole { inner }
    }

    pub fn stdout() -> Self {
        AnsiParsingConsole::new(Arc::new(ColoredConsole::stdout()))
    }

    pub fn stderr() -> Self {
        AnsiParsingConsole::new(Arc::new(ColoredConsole::stderr()))
    }
}

impl Console for AnsiParsingConsole {
    fn write(&self, text: &str, background: Option<Color>, foreground: Option<Color>) -> io::Result<()> {
        let mut result = Ok(());
        ansi::parse(text, |content, bg, fg| {
            if result.is_ok() {
                result = self
                    .inner
                    .write(content, bg.or(background), fg.or(foreground));
            }
        });
        result
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Build the platform console pair for stdout and stderr.
///
/// Windows gets the parsing console in front of the platform color API;
/// everything else passes ANSI through untouched.
pub(crate) fn default_console_pair() -> (Arc<dyn Console>, Arc<dyn Console>) {
    #[cfg(windows)]
    {
        (
            Arc::new(AnsiParsingConsole::stdout()),
            Arc::new(AnsiParsingConsole::stderr()),
        )
    }
    #[cfg(not(windows))]
    {
        (Arc::new(AnsiConsole::stdout()), Arc::new(AnsiConsole::stderr()))
    }
}

/// One write observed by [`TestConsole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub text: String,
    pub background: Option<Color>,
    pub foreground: Option<Color>,
}

/// In-memory console double.
///
/// Records every write; `hold`/`release` gate the writer so tests can pin
/// the background worker mid-drain (backpressure and shutdown scenarios).
#[derive(Default)]
pub struct TestConsole {
    writes: Mutex<Vec<RecordedWrite>>,
    held: Mutex<bool>,
    released: Condvar,
}

impl TestConsole {
    pub fn new() -> Self {
        TestConsole::default()
    }

    /// Block subsequent writes until [`release`](Self::release).
    pub fn hold(&self) {
        *self.held.lock().expect("test console lock poisoned") = true;
    }

    pub fn release(&self) {
        *self.held.lock().expect("test console lock poisoned") = false;
        self.released.notify_all();
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().expect("test console lock poisoned").clone()
    }

    /// All written text concatenated, escape codes included.
    pub fn written_text(&self) -> String {
        self.writes()
            .iter()
            .map(|w| w.text.as_str())
            .collect()
    }
}

impl Console for TestConsole {
    fn write(&self, text: &str, background: Option<Color>, foreground: Option<Color>) -> io::Result<()> {
        let mut held = self.held.lock().expect("test console lock poisoned");
        while *held {
            held = self.released.wait(held).expect("test console lock poisoned");
        }
        drop(held);
        self.writes.lock().expect("test console lock poisoned").push(RecordedWrite {
            text: text.to_string(),
            background,
            foreground,
        });
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}
