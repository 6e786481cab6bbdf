//! Command dispatcher.
//!
//! [`Dispatcher`] is the foreground's state machine: it owns the [`Prompt`]
//! (and with it the foreground channel), updates the shared
//! [`SessionContext`], and turns each parsed [`Command`] into [`AppAction`]s
//! for the runtime to execute. It performs no I/O.

use std::{sync::Arc, time::Instant};

use crate::{
    AppAction, Command, ConnectParams, CtcpKind, DEFAULT_PORT, Prompt, Request, SessionContext,
    Styled,
};

/// Command summary printed by `/help`.
pub const HELP_TEXT: &str = "\
/help                     - Show client commands
/debug <0-10>             - Set client debug level
/dnd                      - Toggle Do Not Disturb
/fg <CHAN>                - Set the foreground (default) channel for sending messages to
/raw <MSG>                - Send a raw message to the server
/quit [<MSG>]             - Quit from server with optional MSG
/part <CHANS>             - Leave channel(s), comma-separated
/join <CHANS>             - Join channel(s), comma-separated
/msg <CHAN> <MSG>         - Send MSG to channel CHAN
/notice <CHAN> <MSG>      - Send MSG to channel CHAN, inhibit autoresponses
/me <ACTION>              - Send action msg to current foreground channel
/describe <USER> <ACTION> - Send action msg for specified user
/ctcp <TARGET> <CMD>      - Send CTCP command request to another user
/nick <NICK>              - Change nickname to NICK
/topic <CHAN> <TOPIC>     - Set channel CHAN's topic to TOPIC
/list [<CHANS>]           - List channels on server (with optional filter of comma-separated channels)
/invite <NICK> <CHAN>     - Invite user NICK to channel CHAN
/identify <USER> <PASS>   - Authenticate to the server if not authenticated already
/server <HOST> [<PORT>]   - Connect to a server, replacing any current connection
^C                        - Exit client";

const NOT_CONNECTED: &str = "Not connected to a server, operation not permitted.";
const NO_FOREGROUND: &str = "No current foreground channel. Type /help for help.";

/// Command state machine.
///
/// Pure state machine that processes commands and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug)]
pub struct Dispatcher {
    /// Shared session flags.
    session: Arc<SessionContext>,
    /// Prompt and foreground channel.
    prompt: Prompt,
    /// Name used when `/server` opens a connection.
    username: String,
}

impl Dispatcher {
    /// Create a dispatcher that registers as `username` on `/server`.
    pub fn new(session: Arc<SessionContext>, username: impl Into<String>) -> Self {
        Self { session, prompt: Prompt::new(), username: username.into() }
    }

    /// Current prompt.
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Mutable prompt, for refreshing the engine identity.
    pub fn prompt_mut(&mut self) -> &mut Prompt {
        &mut self.prompt
    }

    /// Process a command and return actions.
    ///
    /// `connected` is the engine's connection state at the time the line was
    /// submitted.
    pub fn handle(&mut self, command: Command, connected: bool) -> Vec<AppAction> {
        if !connected && !command.allowed_offline() {
            return vec![AppAction::error(NOT_CONNECTED)];
        }

        match command {
            Command::Help => vec![AppAction::Plain(HELP_TEXT.to_owned())],
            Command::Debug { level } => {
                if self.session.set_debug_level(level) {
                    vec![AppAction::Print(format!("Debug level is now {level}").into())]
                } else {
                    vec![]
                }
            },
            Command::DoNotDisturb => {
                let state = if self.session.toggle_do_not_disturb() { "enabled" } else { "disabled" };
                vec![AppAction::Print(format!("Do Not Disturb is now {state}").into())]
            },
            Command::Foreground { channel } => self.set_foreground(&channel),
            Command::Server { host, port } => {
                tracing::debug!("connecting to {}:{:?}", host, port);
                vec![AppAction::Connect(ConnectParams {
                    host,
                    port: port.unwrap_or(DEFAULT_PORT),
                    username: self.username.clone(),
                    autojoin: None,
                })]
            },
            Command::Raw { line } => send(Request::Raw(line)),
            Command::Quit { message } => send(Request::Quit { message }),
            Command::Part { channels } => send(Request::Part { channels }),
            Command::Join { channels } => send(Request::Join { channels }),
            Command::Msg { target, text } => send(Request::Message { target, text }),
            Command::Notice { target, text } => send(Request::Notice { target, text }),
            Command::Me { action } => match self.prompt.channel() {
                Some(channel) => {
                    send(Request::Action { target: channel.to_owned(), text: action })
                },
                None => vec![AppAction::warn(NO_FOREGROUND)],
            },
            Command::Describe { target, action } => {
                send(Request::Action { target, text: action })
            },
            Command::Ctcp { target, ctcp } => {
                if ctcp == CtcpKind::Ping {
                    self.session.record_ping(&target, Instant::now());
                }
                send(Request::CtcpRequest { target, ctcp })
            },
            Command::Nick { nickname } => send(Request::Nick { nickname }),
            Command::Topic { channel, topic } => send(Request::Topic { channel, topic }),
            Command::List { filter } => send(Request::List { filter }),
            Command::Invite { nickname, channel } => send(Request::Invite { nickname, channel }),
            Command::Identify { username, password } => {
                send(Request::Identify { username, password })
            },
            Command::Say { text } => match self.prompt.channel() {
                Some(channel) => send(Request::Message { target: channel.to_owned(), text }),
                None => vec![AppAction::warn(NO_FOREGROUND)],
            },
            Command::Unknown { command } => {
                vec![AppAction::warn(format!("Invalid command: {command}"))]
            },
            Command::InvalidArgs { error, .. } => vec![AppAction::error(error.to_string())],
        }
    }

    /// Select the foreground channel (also used for `--foreground`).
    pub fn set_foreground(&mut self, channel: &str) -> Vec<AppAction> {
        self.prompt.set_channel(channel);
        let title = self.prompt.channel().unwrap_or(channel).to_owned();
        vec![AppAction::SetTitle(title)]
    }

    /// Actions for a freshly established connection: autojoin, if any.
    pub fn on_connected(&self, params: &ConnectParams) -> Vec<AppAction> {
        let mut actions = vec![AppAction::Print(Styled::from(format!(
            "Connected to {}:{}",
            params.host, params.port
        )))];
        if let Some(channels) = params.autojoin.as_deref().filter(|c| !c.is_empty()) {
            actions.push(AppAction::Send(Request::Join { channels: channels.to_owned() }));
        }
        actions
    }
}

fn send(request: Request) -> Vec<AppAction> {
    vec![AppAction::Send(request)]
}
