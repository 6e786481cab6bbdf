//! Output relay.
//!
//! Every line the client shows goes through [`OutputRelay`], whichever
//! context produced it. Before the multiplexer is live, lines are written
//! straight to the terminal. Once it is live, they are handed to the wakeup
//! bridge so only the foreground ever touches the terminal and typed input is
//! never corrupted.
//!
//! The relay is also the sink for `tracing`: [`OutputRelay`] implements
//! [`MakeWriter`], so a `fmt` layer can format diagnostics and the relay
//! delivers them with the matching tag and routing.

use std::{
    fmt::Write as _,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use chatline_app::{AppAction, Level, SessionContext, Styled, Tone};
use crossterm::style::{Color, Stylize};
use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

use crate::{transcript::Transcript, wakeup::WakeupSender};

/// strftime pattern for line timestamps.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Routes output lines to the terminal or the wakeup bridge.
#[derive(Clone)]
pub struct OutputRelay {
    session: Arc<SessionContext>,
    wakeup: WakeupSender,
    direct: SharedWriter,
    transcript: Arc<Mutex<Option<Transcript>>>,
}

impl std::fmt::Debug for OutputRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRelay").field("wakeup", &self.wakeup).finish_non_exhaustive()
    }
}

impl OutputRelay {
    /// Relay writing directly to stdout until the multiplexer is live.
    pub fn new(session: Arc<SessionContext>, wakeup: WakeupSender) -> Self {
        Self::with_writer(session, wakeup, io::stdout())
    }

    /// Relay writing directly to `writer` until the multiplexer is live.
    pub fn with_writer(
        session: Arc<SessionContext>,
        wakeup: WakeupSender,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            session,
            wakeup,
            direct: Arc::new(Mutex::new(Box::new(writer))),
            transcript: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared session context.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Write end of the wakeup bridge.
    pub fn wakeup(&self) -> &WakeupSender {
        &self.wakeup
    }

    /// Timestamped line with a level tag. Debug lines are dropped unless the
    /// session threshold admits them.
    pub fn emit(&self, level: Level, text: &str) {
        if !level.is_enabled(self.session.debug_level()) {
            return;
        }
        let stamp = timestamp();
        let tag = level.tag();
        let colored = tag.with(level_color(level)).bold();
        self.route(format!("\r[{stamp}] [{colored}] {text}\n").as_bytes());
        self.record(&format!("[{stamp}] [{tag}] {text}"));
    }

    /// Timestamped styled line.
    pub fn print(&self, line: &Styled) {
        let stamp = timestamp();
        let mut rendered = String::new();
        for span in line.spans() {
            let _ = match span.tone {
                Some(tone) => write!(rendered, "{}", span.text.as_str().with(tone_color(tone)).bold()),
                None => rendered.write_str(&span.text),
            };
        }
        self.route(format!("\r[{stamp}] {rendered}\n").as_bytes());
        self.record(&format!("[{stamp}] {line}"));
    }

    /// Text without timestamp, one or more lines.
    pub fn plain(&self, text: &str) {
        self.route(format!("{text}\n").as_bytes());
        self.record(text);
    }

    /// Ring the terminal bell.
    pub fn bell(&self) {
        self.route(b"\x07");
    }

    /// Deliver an output action. Actions that are not output are handed back.
    pub fn deliver(&self, action: AppAction) -> Option<AppAction> {
        match action {
            AppAction::Print(line) => self.print(&line),
            AppAction::Plain(text) => self.plain(&text),
            AppAction::Log(level, text) => self.emit(level, &text),
            AppAction::Bell => self.bell(),
            other => return Some(other),
        }
        None
    }

    /// Start copying delivered lines to `transcript`.
    pub fn attach_transcript(&self, transcript: Transcript) {
        if let Ok(mut slot) = self.transcript.lock() {
            *slot = Some(transcript);
        }
    }

    /// Stop copying lines, returning the transcript.
    pub fn detach_transcript(&self) -> Option<Transcript> {
        self.transcript.lock().ok().and_then(|mut slot| slot.take())
    }

    fn route(&self, bytes: &[u8]) {
        if self.session.is_fully_started() {
            // A failed send has nowhere to be reported; the line is dropped.
            let _ = self.wakeup.notify_output(bytes);
            return;
        }
        if let Ok(mut out) = self.direct.lock() {
            let _ = out.write_all(bytes).and_then(|()| out.flush());
        }
    }

    fn record(&self, text: &str) {
        if let Ok(mut slot) = self.transcript.lock()
            && let Some(transcript) = slot.as_mut()
        {
            let _ = transcript.record(text);
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error | Level::Warn => Color::Red,
        Level::Info => Color::Cyan,
        Level::Debug(_) => Color::Green,
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Red => Color::Red,
        Tone::Green => Color::Green,
        Tone::Cyan => Color::Cyan,
    }
}

/// Level a `tracing` event is shown at.
fn level_of(meta: &Metadata<'_>) -> Level {
    let level = *meta.level();
    if level == tracing::Level::ERROR {
        Level::Error
    } else if level == tracing::Level::WARN {
        Level::Warn
    } else if level == tracing::Level::INFO {
        Level::Info
    } else if level == tracing::Level::DEBUG {
        Level::Debug(1)
    } else {
        Level::Debug(5)
    }
}

/// Buffers one formatted `tracing` event and emits it when dropped.
#[derive(Debug)]
pub struct RelayWriter {
    relay: OutputRelay,
    level: Level,
    buf: Vec<u8>,
}

impl Write for RelayWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RelayWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        if !text.is_empty() {
            self.relay.emit(self.level, text);
        }
    }
}

impl<'a> MakeWriter<'a> for OutputRelay {
    type Writer = RelayWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RelayWriter { relay: self.clone(), level: Level::Info, buf: Vec::new() }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        RelayWriter { relay: self.clone(), level: level_of(meta), buf: Vec::new() }
    }
}
