//! Line-oriented screen output.
//!
//! The line editor and the multiplexer draw through the [`Screen`] trait:
//! [`TerminalScreen`] writes escape sequences to a real terminal, and
//! [`RecordingScreen`] keeps a virtual model of the visible text for tests.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use crossterm::{
    queue,
    terminal::{Clear, ClearType, SetTitle},
};

/// Operations the editor needs from the terminal.
pub trait Screen {
    /// Return to column zero and erase to the end of the line.
    fn clear_line(&mut self) -> io::Result<()>;

    /// Write bytes as-is.
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Ring the bell.
    fn ring_bell(&mut self) -> io::Result<()>;

    /// Set the window title.
    fn set_title(&mut self, title: &str) -> io::Result<()>;

    /// Push buffered output to the terminal.
    fn flush(&mut self) -> io::Result<()>;
}

/// Screen backed by an escape-sequence capable writer (stdout by default).
#[derive(Debug)]
pub struct TerminalScreen<W: Write> {
    out: W,
}

impl TerminalScreen<io::Stdout> {
    /// Screen on the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalScreen<W> {
    /// Screen writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn clear_line(&mut self) -> io::Result<()> {
        self.out.write_all(b"\r")?;
        queue!(self.out, Clear(ClearType::UntilNewLine))
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn ring_bell(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x07")
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        queue!(self.out, SetTitle(title))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Virtual screen for tests.
///
/// Interprets carriage return, line feed, bell, and the erase-line command;
/// other escape sequences are dropped so styled output reads as plain text.
/// Clones share the same model, so a test can keep a handle while the
/// runtime owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingScreen {
    inner: Arc<Mutex<Model>>,
}

#[derive(Debug, Default)]
struct Model {
    lines: Vec<String>,
    current: Vec<char>,
    cursor: usize,
    bells: usize,
    clears: usize,
    titles: Vec<String>,
    escape: Escape,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Escape {
    #[default]
    None,
    Start,
    Csi,
    Osc,
}

impl RecordingScreen {
    /// Empty screen.
    pub fn new() -> Self {
        Self::default()
    }

    fn model(&self) -> MutexGuard<'_, Model> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Text on the line the cursor is on.
    pub fn current_line(&self) -> String {
        self.model().current.iter().collect()
    }

    /// Lines completed with a line feed, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.model().lines.clone()
    }

    /// Number of bells rung.
    pub fn bells(&self) -> usize {
        self.model().bells
    }

    /// Number of line erasures.
    pub fn clears(&self) -> usize {
        self.model().clears
    }

    /// Window titles set, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.model().titles.clone()
    }

    fn feed(&self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let mut model = self.model();
        for c in text.chars() {
            model.feed(c);
        }
    }
}

impl Model {
    fn feed(&mut self, c: char) {
        match (self.escape, c) {
            (Escape::None, '\x1b') => self.escape = Escape::Start,
            (Escape::Start, '[') => self.escape = Escape::Csi,
            (Escape::Start, ']') => self.escape = Escape::Osc,
            (Escape::Start, _) => self.escape = Escape::None,
            (Escape::Csi, '@'..='~') => {
                self.escape = Escape::None;
                if c == 'K' {
                    self.erase_to_end();
                }
            },
            (Escape::Osc, '\x07') => self.escape = Escape::None,
            (Escape::Csi | Escape::Osc, _) => {},
            (Escape::None, '\r') => self.cursor = 0,
            (Escape::None, '\n') => {
                let line = std::mem::take(&mut self.current).into_iter().collect();
                self.lines.push(line);
                self.cursor = 0;
            },
            (Escape::None, '\x07') => self.bells += 1,
            (Escape::None, c) => {
                if self.cursor < self.current.len() {
                    self.current[self.cursor] = c;
                } else {
                    self.current.push(c);
                }
                self.cursor += 1;
            },
        }
    }

    fn erase_to_end(&mut self) {
        self.current.truncate(self.cursor);
        self.clears += 1;
    }
}

impl Screen for RecordingScreen {
    fn clear_line(&mut self) -> io::Result<()> {
        self.feed(b"\r\x1b[K");
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.feed(bytes);
        Ok(())
    }

    fn ring_bell(&mut self) -> io::Result<()> {
        self.feed(b"\x07");
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.model().titles.push(title.to_owned());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for RecordingScreen {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
