//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::Dispatcher`] and [`crate::EventFormatter`] for the
//! runtime to execute.

use crate::{ConnectParams, Level, Request, Styled};

/// Actions produced by the application state machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Timestamped line with styled content.
    Print(Styled),

    /// Line printed verbatim, no timestamp or tag.
    Plain(String),

    /// Timestamped, tagged line at the given level.
    Log(Level, String),

    /// Ring the terminal bell.
    Bell,

    /// Send a request through the engine.
    Send(Request),

    /// Connect (or reconnect) to a server.
    Connect(ConnectParams),

    /// Change the terminal window title.
    SetTitle(String),
}

impl AppAction {
    /// Shorthand for an error line.
    pub fn error(text: impl Into<String>) -> Self {
        AppAction::Log(Level::Error, text.into())
    }

    /// Shorthand for a warning line.
    pub fn warn(text: impl Into<String>) -> Self {
        AppAction::Log(Level::Warn, text.into())
    }

    /// Shorthand for an informational line.
    pub fn info(text: impl Into<String>) -> Self {
        AppAction::Log(Level::Info, text.into())
    }
}
