//! Application layer for chatline
//!
//! Pure state machines and the protocol-engine seam. Nothing in this crate
//! touches the terminal or the network, so command handling and event
//! formatting run the same way in production and in tests.
//!
//! # Components
//!
//! - [`Engine`] / [`Connector`]: Traits implemented by the protocol engine
//! - [`Dispatcher`]: Command state machine (parsed line in, actions out)
//! - [`EventFormatter`]: Inbound protocol events to display actions
//! - [`SessionContext`]: Process-wide flags shared between tasks
//! - [`Prompt`]: Bounded prompt display string

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
pub mod command;
mod dispatch;
mod engine;
mod event;
mod format;
mod level;
mod prompt;
mod request;
mod session;
mod styled;

pub use action::AppAction;
pub use command::{ArgError, Command};
pub use dispatch::{Dispatcher, HELP_TEXT};
pub use engine::{ConnectParams, Connector, DEFAULT_PORT, Engine, EngineError};
pub use event::{CtcpKind, Event, MessageKind};
pub use format::EventFormatter;
pub use level::{Level, MAX_DEBUG_LEVEL};
pub use prompt::{DEFAULT_PROMPT, MAX_CHANNEL_LEN, MAX_PROMPT_LEN, Prompt};
pub use request::Request;
pub use session::SessionContext;
pub use styled::{Span, Styled, Tone};

/// Client name and version, used in banners and CTCP VERSION replies.
pub const CLIENT_VERSION: &str = concat!("chatline ", env!("CARGO_PKG_VERSION"));
