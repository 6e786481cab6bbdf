//! Inbound protocol events.
//!
//! This module defines [`Event`], the set of parsed messages the protocol
//! engine hands to the receive callback. Parsing and framing belong to the
//! engine; this crate only consumes the result.

use std::{fmt, str::FromStr};

/// Whether a chat message was a regular message or a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Regular message. CTCP requests travel as these.
    Privmsg,
    /// Notice. CTCP replies travel as these.
    Notice,
}

/// Client-to-client extension carried inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtcpKind {
    /// `/me` style action.
    Action,
    /// Client version query.
    Version,
    /// Local time query.
    Time,
    /// Round-trip measurement.
    Ping,
    /// Direct client connection offer.
    Dcc,
    /// Substitution edit.
    Sed,
    /// Supported extension list.
    ClientInfo,
    /// User information.
    Finger,
    /// Where to get the client.
    Source,
    /// Free-form user information.
    UserInfo,
}

impl CtcpKind {
    /// Wire name of the extension.
    pub fn name(self) -> &'static str {
        match self {
            CtcpKind::Action => "ACTION",
            CtcpKind::Version => "VERSION",
            CtcpKind::Time => "TIME",
            CtcpKind::Ping => "PING",
            CtcpKind::Dcc => "DCC",
            CtcpKind::Sed => "SED",
            CtcpKind::ClientInfo => "CLIENTINFO",
            CtcpKind::Finger => "FINGER",
            CtcpKind::Source => "SOURCE",
            CtcpKind::UserInfo => "USERINFO",
        }
    }

    const ALL: [CtcpKind; 10] = [
        CtcpKind::Action,
        CtcpKind::Version,
        CtcpKind::Time,
        CtcpKind::Ping,
        CtcpKind::Dcc,
        CtcpKind::Sed,
        CtcpKind::ClientInfo,
        CtcpKind::Finger,
        CtcpKind::Source,
        CtcpKind::UserInfo,
    ];
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CtcpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CtcpKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown CTCP command {s}"))
    }
}

/// Events delivered by the protocol engine, one per inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Numeric server reply.
    Numeric {
        /// Three-digit reply code.
        code: u16,
        /// Message source.
        prefix: String,
        /// Reply text.
        body: String,
    },

    /// Chat message or notice.
    Message {
        /// Message or notice.
        kind: MessageKind,
        /// Sender (`nick!user@host`).
        prefix: String,
        /// Channel or nickname the message was sent to.
        target: String,
        /// Message text.
        body: String,
    },

    /// CTCP request (inside a message) or reply (inside a notice).
    Ctcp {
        /// Request or reply.
        kind: MessageKind,
        /// Sender (`nick!user@host`).
        prefix: String,
        /// Channel or nickname the message was sent to.
        target: String,
        /// Extension type.
        ctcp: CtcpKind,
        /// Extension arguments.
        body: String,
    },

    /// Keepalive from the server; must be answered with a pong.
    Ping {
        /// Token to echo back.
        token: String,
    },

    /// A user joined a channel.
    Join {
        /// Joining user.
        prefix: String,
        /// Channel joined.
        channel: String,
    },

    /// A user left a channel.
    Part {
        /// Leaving user.
        prefix: String,
        /// Channel left.
        channel: String,
    },

    /// A user disconnected from the network.
    Quit {
        /// Quitting user.
        prefix: String,
        /// Quit message, if any.
        reason: Option<String>,
    },

    /// A user was removed from a channel.
    Kick {
        /// User performing the kick.
        prefix: String,
        /// Kick details, if any.
        reason: Option<String>,
    },

    /// A user changed nickname.
    Nick {
        /// Old identity (`nick!user@host`).
        prefix: String,
        /// New nickname.
        nickname: String,
    },

    /// Mode change.
    Mode {
        /// Source of the change.
        prefix: String,
        /// Mode string and arguments.
        body: String,
    },

    /// Fatal error from the server, usually right before it closes the link.
    Error {
        /// Error text.
        body: String,
    },

    /// Channel topic changed.
    Topic {
        /// User who changed it.
        prefix: String,
        /// Channel and new topic.
        body: String,
    },

    /// Anything the formatter has no rule for.
    Other {
        /// Message source.
        prefix: String,
        /// Protocol command word.
        command: String,
        /// Remaining text.
        body: String,
    },
}

/// Nickname part of a `nick!user@host` prefix.
pub(crate) fn nick_of(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}
