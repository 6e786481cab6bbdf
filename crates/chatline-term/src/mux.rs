//! Foreground multiplexer.
//!
//! [`Multiplexer::read_line`] is the poll loop: it waits on the wakeup bridge
//! and the keyboard at the same time, writes output blocks over the prompt
//! line, feeds keystrokes to the [`LineEditor`], and returns once a line is
//! submitted, the keyboard closes, or a stop is requested. While interactive
//! mode is on, it is the only writer to the terminal.

use std::sync::Arc;

use chatline_app::{Prompt, SessionContext};

use crate::{
    editor::{KeyOutcome, LineEditor},
    keyboard::Keyboard,
    screen::Screen,
    terminal::{TerminalError, TerminalGuard},
    wakeup::{Wakeup, WakeupReceiver},
};

/// How a [`Multiplexer::read_line`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A non-empty line was submitted.
    Line(String),
    /// The keyboard reached end-of-file, or the bridge failed.
    Disconnected,
    /// A stop was requested.
    Stopped,
}

/// Supplies the prompt each time it is drawn.
pub trait PromptSource {
    /// Current prompt text.
    fn prompt(&mut self) -> &str;
}

impl PromptSource for Prompt {
    fn prompt(&mut self) -> &str {
        self.as_str()
    }
}

impl PromptSource for String {
    fn prompt(&mut self) -> &str {
        self.as_str()
    }
}

/// Owns the keyboard, the read end of the bridge, and the screen.
pub struct Multiplexer<S: Screen> {
    session: Arc<SessionContext>,
    keyboard: Keyboard,
    wakeup: WakeupReceiver,
    screen: S,
    editor: LineEditor,
    guard: Option<TerminalGuard>,
}

impl<S: Screen> Multiplexer<S> {
    /// Create a multiplexer. Interactive mode starts off.
    pub fn new(
        session: Arc<SessionContext>,
        keyboard: Keyboard,
        wakeup: WakeupReceiver,
        screen: S,
    ) -> Self {
        Self { session, keyboard, wakeup, screen, editor: LineEditor::new(), guard: None }
    }

    /// Switch output routing to the bridge, optionally taking the terminal
    /// out of canonical mode first.
    pub fn enter_interactive_mode(&mut self, raw_mode: bool) -> Result<(), TerminalError> {
        if raw_mode && self.guard.is_none() {
            self.guard = Some(TerminalGuard::enter_raw_mode()?);
        }
        self.session.mark_fully_started();
        Ok(())
    }

    /// Route output directly again, restore the terminal, and show any
    /// output still queued in the bridge.
    ///
    /// Queued output is drained before and after direct routing resumes, so
    /// a line that raced the switch is never shown ahead of older ones.
    pub fn leave_interactive_mode(&mut self) {
        self.drain_to_screen();
        self.session.mark_stopped();
        self.guard = None;
        self.drain_to_screen();
    }

    fn drain_to_screen(&mut self) {
        for block in self.wakeup.drain() {
            let _ = self.screen.write_raw(&block);
        }
        let _ = self.screen.flush();
    }

    /// Whether the terminal is currently in non-canonical mode.
    pub fn is_raw(&self) -> bool {
        self.guard.is_some()
    }

    /// Screen the multiplexer draws on.
    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    /// Read one line, displaying output as it arrives.
    ///
    /// Screen write failures are not fatal; the next repaint recovers.
    pub async fn read_line(&mut self, prompt: &mut impl PromptSource) -> ReadOutcome {
        let _ = self.editor.begin(prompt.prompt(), &mut self.screen);

        loop {
            tokio::select! {
                biased;

                wakeup = self.wakeup.recv() => match wakeup {
                    Ok(Wakeup::Output(block)) => {
                        let _ = self.editor.handle_output(&block, prompt.prompt(), &mut self.screen);
                    },
                    Ok(Wakeup::Stop) => {
                        self.session.mark_shutting_down();
                        self.editor.reset();
                        return ReadOutcome::Stopped;
                    },
                    Err(e) => {
                        tracing::debug!("wakeup bridge failed: {:?}", e);
                        self.editor.reset();
                        return ReadOutcome::Disconnected;
                    },
                },

                byte = self.keyboard.next_byte() => match byte {
                    Some(byte) => {
                        if let Ok(KeyOutcome::Complete(line)) =
                            self.editor.handle_key(byte, prompt.prompt(), &mut self.screen)
                        {
                            return ReadOutcome::Line(line);
                        }
                    },
                    None => {
                        self.editor.reset();
                        return ReadOutcome::Disconnected;
                    },
                },
            }
        }
    }
}
