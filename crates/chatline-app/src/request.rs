//! Outbound requests to the protocol engine.

use crate::CtcpKind;

/// Requests the foreground (or the receive callback) asks the engine to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Raw protocol line, sent as typed.
    Raw(String),

    /// Leave the network.
    Quit {
        /// Optional quit message.
        message: Option<String>,
    },

    /// Join channels.
    Join {
        /// Comma-separated channel list.
        channels: String,
    },

    /// Leave channels.
    Part {
        /// Comma-separated channel list.
        channels: String,
    },

    /// Regular message.
    Message {
        /// Channel or nickname.
        target: String,
        /// Message text.
        text: String,
    },

    /// Notice (no automatic replies expected).
    Notice {
        /// Channel or nickname.
        target: String,
        /// Notice text.
        text: String,
    },

    /// CTCP ACTION message.
    Action {
        /// Channel or nickname.
        target: String,
        /// Action text.
        text: String,
    },

    /// CTCP request.
    CtcpRequest {
        /// Nickname or channel.
        target: String,
        /// Extension to request.
        ctcp: CtcpKind,
    },

    /// CTCP reply to an earlier request.
    CtcpReply {
        /// Nickname of the requester.
        target: String,
        /// Extension being answered.
        ctcp: CtcpKind,
        /// Reply data.
        body: String,
    },

    /// Change nickname.
    Nick {
        /// Requested nickname.
        nickname: String,
    },

    /// Set a channel topic.
    Topic {
        /// Channel.
        channel: String,
        /// New topic.
        topic: String,
    },

    /// List channels.
    List {
        /// Optional comma-separated filter.
        filter: Option<String>,
    },

    /// Invite a user to a channel.
    Invite {
        /// User to invite.
        nickname: String,
        /// Channel.
        channel: String,
    },

    /// Authenticate after connecting.
    Identify {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },

    /// Answer to a server keepalive.
    Pong {
        /// Token from the ping.
        token: String,
    },
}
