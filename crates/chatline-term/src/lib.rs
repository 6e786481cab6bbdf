//! Terminal front-end for chatline
//!
//! Interactive line-mode I/O over two channels at once: the keyboard and the
//! inbound protocol stream. A receive task formats server events while the
//! foreground multiplexer owns the terminal; everything the background
//! produces travels over a wakeup bridge so it never tears the line being
//! typed.
//!
//! # Components
//!
//! - [`TerminalGuard`]: Non-canonical mode, restored on drop and on panic
//! - [`wakeup`]: Datagram bridge carrying output blocks and stop requests
//! - [`OutputRelay`]: Routes every line to the screen or the bridge
//! - [`LineEditor`] / [`Multiplexer`]: Prompt, line buffer, and poll loop
//! - [`ReceiveTask`]: Runs the engine's receive loop in the background
//! - [`ShutdownCoordinator`]: SIGINT to stop request
//! - [`Runtime`]: The whole session, generic over engine and screen

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod editor;
pub mod keyboard;
pub mod loopback;
pub mod mux;
pub mod receive;
pub mod relay;
pub mod runtime;
pub mod screen;
pub mod shutdown;
pub mod terminal;
pub mod transcript;
pub mod wakeup;

pub use editor::{KeyOutcome, LineEditor, MAX_LINE_LEN};
pub use keyboard::Keyboard;
pub use loopback::{LoopbackConnector, LoopbackEngine};
pub use mux::{Multiplexer, PromptSource, ReadOutcome};
pub use receive::ReceiveTask;
pub use relay::OutputRelay;
pub use runtime::{DEFAULT_USERNAME, Runtime, RuntimeConfig, RuntimeError};
pub use screen::{RecordingScreen, Screen, TerminalScreen};
pub use shutdown::ShutdownCoordinator;
pub use terminal::{TerminalError, TerminalGuard};
pub use transcript::Transcript;
pub use wakeup::{MAX_CHUNK, Wakeup, WakeupReceiver, WakeupSender};
