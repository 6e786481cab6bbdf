//! Inbound event formatting.
//!
//! [`EventFormatter`] runs inside the receive callback. For each [`Event`] it
//! produces the lines to show and any automatic replies (keepalive pongs and
//! CTCP answers), all as [`AppAction`]s so the receive task stays a thin
//! executor.

use std::{sync::Arc, time::Instant};

use crate::{
    AppAction, CLIENT_VERSION, CtcpKind, Event, MessageKind, Request, SessionContext, Styled, Tone,
    event::nick_of,
};

/// Numerics whose body is shown as-is.
const PLAIN_NUMERICS: &[u16] = &[
    1, 2, 3, 4, 5, // welcome, host, created, server info, supported
    250, 251, 252, 253, 254, 255, // stats and user counts
    265, 266, // local and global users
    321, 322, 323, // channel list
    353, 366, // names
    372, 375, 376, // motd
    396, // visible host
];

/// Shown with the prefix.
const NO_TEXT_TO_SEND: u16 = 412;

/// Shown with the prefix, in red.
const ERROR_NUMERICS: &[u16] = &[404, 421];

/// strftime pattern for CTCP TIME replies.
const CTCP_TIME_FORMAT: &str = "%a %b %e %Y %I:%M:%S %P %Z";

/// Turns protocol events into display and reply actions.
#[derive(Debug, Clone)]
pub struct EventFormatter {
    session: Arc<SessionContext>,
}

impl EventFormatter {
    /// Create a formatter reading `session` flags.
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }

    /// Actions for one event. `own_nick` is our current nickname (may be
    /// empty before registration).
    pub fn render(&self, event: &Event, own_nick: &str) -> Vec<AppAction> {
        match event {
            Event::Numeric { code, prefix, body } => vec![numeric(*code, prefix, body)],
            Event::Message { prefix, target, body, .. } => {
                let mut actions = self.mention_bell(body, own_nick);
                actions.push(AppAction::Print(format!("{target} <{prefix}> {body}").into()));
                actions
            },
            Event::Ctcp { kind, prefix, target, ctcp, body } => {
                let mut actions = self.mention_bell(body, own_nick);
                match kind {
                    MessageKind::Privmsg => actions.extend(ctcp_request(*ctcp, prefix, target, body)),
                    MessageKind::Notice => actions.push(self.ctcp_reply(*ctcp, prefix, body)),
                }
                actions
            },
            Event::Ping { token } => vec![AppAction::Send(Request::Pong { token: token.clone() })],
            Event::Join { prefix, channel } => vec![verb(prefix, "has ", Tone::Green, "joined", channel)],
            Event::Part { prefix, channel } => vec![verb(prefix, "has ", Tone::Red, "left", channel)],
            Event::Quit { prefix, reason } => {
                vec![verb(prefix, "has ", Tone::Red, "quit", reason.as_deref().unwrap_or_default())]
            },
            Event::Kick { prefix, reason } => vec![verb(
                prefix,
                "has been ",
                Tone::Red,
                "kicked",
                reason.as_deref().unwrap_or_default(),
            )],
            Event::Nick { prefix, nickname } => {
                vec![verb(prefix, "is ", Tone::Cyan, "now known as", nickname)]
            },
            Event::Mode { prefix, body } => vec![AppAction::Print(format!("{prefix} {body}").into())],
            Event::Error { body } => vec![AppAction::Print(Styled::new().tone(Tone::Red, body.as_str()))],
            Event::Topic { prefix, body } => {
                let line = Styled::new()
                    .text(format!("{prefix} has "))
                    .tone(Tone::Green, "changed the topic")
                    .text(format!(" of {body}"));
                vec![AppAction::Print(line)]
            },
            Event::Other { prefix, command, body } => vec![AppAction::warn(format!(
                "Unhandled command: prefix: {prefix}, command: {command}, body: {body}"
            ))],
        }
    }

    /// Bell when we are addressed by name, unless do-not-disturb is on.
    fn mention_bell(&self, body: &str, own_nick: &str) -> Vec<AppAction> {
        if own_nick.is_empty() || self.session.do_not_disturb() {
            return vec![];
        }
        let mentioned = body
            .get(..own_nick.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(own_nick));
        if mentioned { vec![AppAction::Bell] } else { vec![] }
    }

    fn ctcp_reply(&self, ctcp: CtcpKind, prefix: &str, body: &str) -> AppAction {
        if ctcp != CtcpKind::Ping {
            return AppAction::Print(format!("CTCP {ctcp} reply {body} from {prefix}").into());
        }
        match self.session.ping_sent_at(nick_of(prefix)) {
            Some(sent) => {
                let secs = Instant::now().saturating_duration_since(sent).as_secs_f64();
                AppAction::Print(format!("Ping reply from {prefix} in {secs:.3} seconds").into())
            },
            None => AppAction::Print(format!("Ping reply from {prefix}").into()),
        }
    }
}

fn numeric(code: u16, prefix: &str, body: &str) -> AppAction {
    if PLAIN_NUMERICS.contains(&code) {
        AppAction::Print(body.into())
    } else if code == NO_TEXT_TO_SEND {
        AppAction::Print(format!("{prefix} {body}").into())
    } else if ERROR_NUMERICS.contains(&code) {
        AppAction::Print(Styled::new().tone(Tone::Red, format!("{prefix} {body}")))
    } else {
        AppAction::warn(format!("Unhandled numeric: prefix: {prefix}, num: {code}, body: {body}"))
    }
}

fn ctcp_request(ctcp: CtcpKind, prefix: &str, target: &str, body: &str) -> Vec<AppAction> {
    let reply = |body: String| {
        vec![AppAction::Send(Request::CtcpReply { target: nick_of(prefix).to_owned(), ctcp, body })]
    };
    match ctcp {
        CtcpKind::Action => {
            vec![AppAction::Print(format!("[ACTION] {prefix} {target} {body}").into())]
        },
        CtcpKind::Ping => reply(body.to_owned()),
        CtcpKind::Time => reply(chrono::Local::now().format(CTCP_TIME_FORMAT).to_string()),
        CtcpKind::Version => reply(CLIENT_VERSION.to_owned()),
        other => vec![AppAction::error(format!("Unhandled CTCP extended data type: {other}"))],
    }
}

/// `"<who> <lead><verb> <tail>"` with the verb colored.
fn verb(who: &str, lead: &str, tone: Tone, verb: &str, tail: &str) -> AppAction {
    let mut line = Styled::new().text(format!("{who} {lead}")).tone(tone, verb);
    if !tail.is_empty() {
        line = line.text(format!(" {tail}"));
    }
    AppAction::Print(line)
}
