//! Terminal session guard.
//!
//! Switches stdin out of canonical mode so keystrokes arrive one byte at a
//! time, and puts the original attributes back on every exit path: the
//! guard's `Drop` for normal returns and unwinding, plus a panic hook for
//! builds that abort on panic. Echo and signal generation are left alone, so
//! the terminal still echoes typed characters and Ctrl-C still raises SIGINT.

use std::{
    io,
    sync::{Mutex, Once},
};

use nix::{
    errno::Errno,
    sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios},
};
use thiserror::Error;

/// Attributes to restore from the panic hook.
static SAVED: Mutex<Option<Termios>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

/// Terminal attribute errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Reading the current attributes failed (for example stdin is not a
    /// terminal).
    #[error("tcgetattr failed: {0}")]
    GetAttr(Errno),

    /// Applying the new attributes failed.
    #[error("tcsetattr failed: {0}")]
    SetAttr(Errno),
}

/// Holds the original stdin attributes while non-canonical mode is active.
///
/// Dropping the guard restores them.
#[derive(Debug)]
pub struct TerminalGuard {
    original: Termios,
}

impl TerminalGuard {
    /// Disable canonical input on stdin.
    ///
    /// On error nothing has been changed.
    pub fn enter_raw_mode() -> Result<Self, TerminalError> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin).map_err(TerminalError::GetAttr)?;

        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(TerminalError::SetAttr)?;

        if let Ok(mut saved) = SAVED.lock() {
            *saved = Some(original.clone());
        }
        install_panic_hook();
        tracing::debug!("terminal switched to non-canonical input");

        Ok(Self { original })
    }

    /// Put the original attributes back.
    fn restore(&self) -> Result<(), TerminalError> {
        if let Ok(mut saved) = SAVED.lock() {
            *saved = None;
        }
        termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, &self.original)
            .map_err(TerminalError::SetAttr)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("Failed to restore terminal attributes: {:?}", e);
        }
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Ok(saved) = SAVED.lock()
                && let Some(original) = saved.as_ref()
            {
                let _ = termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, original);
            }
            previous(info);
        }));
    });
}
