//! Protocol engine seam.
//!
//! The [`Engine`] trait decouples the interactive front-end from the chat
//! protocol. Connection setup, transport security, authentication and message
//! framing all live behind it; the front-end only needs a receive loop to run
//! on a background task, synchronous request functions, and a few accessors.

use std::future::Future;

use thiserror::Error;

use crate::{Event, Request};

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 6667;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No live connection.
    #[error("not connected")]
    NotConnected,

    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Transport failed after connecting.
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Parameters for establishing a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Nickname/username to register with.
    pub username: String,
    /// Channels to join once connected, comma-separated.
    pub autojoin: Option<String>,
}

impl ConnectParams {
    /// Parameters for `host` on the default port with no autojoin.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self { host: host.into(), port: DEFAULT_PORT, username: username.into(), autojoin: None }
    }
}

/// A connected protocol engine.
///
/// Shared between the foreground (requests, accessors) and the receive task
/// (the receive loop), so every method takes `&self`.
///
/// # Implementations
///
/// - **Loopback**: in-process simulated server used by the binary and tests
/// - **Network**: any real protocol implementation plugged in by the embedder
pub trait Engine: Send + Sync + 'static {
    /// Run the receive loop until the connection ends.
    ///
    /// Calls `on_event` once per inbound event. Returns when the server
    /// closes the connection or the transport fails. The future may be
    /// dropped at any await point; implementations must tolerate abrupt
    /// cancellation.
    fn run(
        &self,
        on_event: &mut (dyn FnMut(Event) + Send),
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Whether the connection is still live.
    fn is_connected(&self) -> bool;

    /// Send a request to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected or the engine refuses the request.
    fn send(&self, request: Request) -> Result<(), EngineError>;

    /// Current nickname (empty before registration).
    fn nickname(&self) -> String;

    /// Server hostname.
    fn hostname(&self) -> String;
}

/// Factory for engines.
pub trait Connector: Send + Sync {
    /// Engine produced by this connector.
    type Engine: Engine;

    /// Establish a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(
        &self,
        params: &ConnectParams,
    ) -> impl Future<Output = Result<Self::Engine, EngineError>> + Send;
}
