//! In-process simulated server.
//!
//! [`LoopbackConnector`] produces engines that talk to a tiny chat server
//! living in the same process. No network: requests are answered by pushing
//! events onto a channel that the receive loop drains. It is the binary's
//! default connector and the engine the integration tests drive.
//!
//! The server greets with the usual welcome numerics and MOTD, reflects
//! joins, parts, nick and topic changes, echoes messages back from an `echo`
//! user, answers CTCP queries, sends a keepalive PING periodically, and
//! closes the connection after a QUIT.

use std::{
    collections::BTreeSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chatline_app::{
    CLIENT_VERSION, ConnectParams, Connector, CtcpKind, Engine, EngineError, Event, MessageKind,
    Request,
};
use tokio::{
    sync::mpsc,
    time::{Instant, interval_at},
};

/// Identity of the user that echoes messages back.
const ECHO_PREFIX: &str = "echo!echo@loopback";

/// Default spacing of server keepalive pings.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// Hostnames under this suffix never resolve.
const UNRESOLVABLE_SUFFIX: &str = ".invalid";

/// Creates [`LoopbackEngine`]s.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    ping_interval: Duration,
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self { ping_interval: DEFAULT_PING_INTERVAL }
    }
}

impl LoopbackConnector {
    /// Connector with a custom keepalive interval.
    pub fn with_ping_interval(ping_interval: Duration) -> Self {
        Self { ping_interval }
    }
}

impl Connector for LoopbackConnector {
    type Engine = LoopbackEngine;

    async fn connect(&self, params: &ConnectParams) -> Result<Self::Engine, EngineError> {
        if params.host.is_empty() {
            return Err(EngineError::Connect("empty hostname".into()));
        }
        if params.host.ends_with(UNRESOLVABLE_SUFFIX) {
            return Err(EngineError::Connect(format!("could not resolve {}", params.host)));
        }
        tracing::debug!("loopback connect to {}:{}", params.host, params.port);
        Ok(LoopbackEngine::new(params, self.ping_interval))
    }
}

enum Inbound {
    Event(Event),
    Close,
}

#[derive(Debug)]
struct State {
    nickname: String,
    username: String,
    channels: BTreeSet<String>,
}

impl State {
    fn prefix(&self) -> String {
        format!("{}!{}@loopback", self.nickname, self.username)
    }
}

/// Engine connected to the in-process server.
pub struct LoopbackEngine {
    host: String,
    state: Mutex<State>,
    connected: AtomicBool,
    tx: mpsc::UnboundedSender<Inbound>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    ping_interval: Duration,
}

impl LoopbackEngine {
    fn new(params: &ConnectParams, ping_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            host: params.host.clone(),
            state: Mutex::new(State {
                nickname: params.username.clone(),
                username: params.username.clone(),
                channels: BTreeSet::new(),
            }),
            connected: AtomicBool::new(true),
            tx,
            rx: Mutex::new(Some(rx)),
            ping_interval,
        };
        engine.greet(&params.username);
        engine
    }

    fn greet(&self, nickname: &str) {
        let host = &self.host;
        let lines = [
            (1, format!("Welcome to the loopback network, {nickname}")),
            (2, format!("Your host is {host}, running chatline-loopback")),
            (3, "This server was created just now".to_owned()),
            (4, format!("{host} chatline-loopback")),
            (375, format!("- {host} Message of the day -")),
            (372, "- Everything you say is echoed back by the echo user.".to_owned()),
            (376, "End of /MOTD command.".to_owned()),
        ];
        for (code, body) in lines {
            self.numeric(code, body);
        }
    }

    fn push(&self, event: Event) {
        let _ = self.tx.send(Inbound::Event(event));
    }

    fn numeric(&self, code: u16, body: String) {
        self.push(Event::Numeric { code, prefix: self.host.clone(), body });
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, State>, EngineError> {
        self.state.lock().map_err(|_| EngineError::Rejected("server state poisoned".into()))
    }

    fn join(&self, channels: &str) -> Result<(), EngineError> {
        let mut state = self.state()?;
        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            if !is_channel(channel) {
                self.numeric(403, format!("{channel} :No such channel"));
                continue;
            }
            state.channels.insert(channel.to_owned());
            self.push(Event::Join { prefix: state.prefix(), channel: channel.to_owned() });
            self.numeric(353, format!("= {channel} :{} echo", state.nickname));
            self.numeric(366, format!("{channel} :End of /NAMES list."));
        }
        Ok(())
    }

    fn part(&self, channels: &str) -> Result<(), EngineError> {
        let mut state = self.state()?;
        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            if state.channels.remove(channel) {
                self.push(Event::Part { prefix: state.prefix(), channel: channel.to_owned() });
            } else {
                self.numeric(442, format!("{channel} :You're not on that channel"));
            }
        }
        Ok(())
    }

    fn echo(&self, kind: MessageKind, target: &str, text: String) -> Result<(), EngineError> {
        let state = self.state()?;
        if text.is_empty() {
            self.numeric(412, ":No text to send".into());
            return Ok(());
        }
        let target = if is_channel(target) {
            if !state.channels.contains(target) {
                self.numeric(404, format!("{target} :Cannot send to channel"));
                return Ok(());
            }
            target.to_owned()
        } else {
            state.nickname.clone()
        };
        self.push(Event::Message { kind, prefix: ECHO_PREFIX.into(), target, body: text });
        Ok(())
    }

    fn ctcp_request(&self, target: &str, ctcp: CtcpKind) -> Result<(), EngineError> {
        let nickname = self.state()?.nickname.clone();
        let body = match ctcp {
            CtcpKind::Ping => chrono::Utc::now().timestamp().to_string(),
            CtcpKind::Version => format!("{CLIENT_VERSION} (loopback)"),
            CtcpKind::Time => chrono::Local::now().to_rfc2822(),
            CtcpKind::ClientInfo => "ACTION CLIENTINFO PING TIME VERSION".into(),
            _ => return Ok(()),
        };
        let peer = target.trim_start_matches(['#', '&']);
        self.push(Event::Ctcp {
            kind: MessageKind::Notice,
            prefix: format!("{peer}!{peer}@loopback"),
            target: nickname,
            ctcp,
            body,
        });
        Ok(())
    }

    fn list(&self, filter: Option<&str>) -> Result<(), EngineError> {
        let state = self.state()?;
        self.numeric(321, "Channel :Users  Name".into());
        let wanted: Option<Vec<&str>> = filter.map(|f| f.split(',').collect());
        for channel in &state.channels {
            if wanted.as_ref().is_none_or(|w| w.contains(&channel.as_str())) {
                self.numeric(322, format!("{channel} 2 :"));
            }
        }
        self.numeric(323, "End of /LIST".into());
        Ok(())
    }

    fn quit(&self, message: Option<String>) -> Result<(), EngineError> {
        let nickname = self.state()?.nickname.clone();
        let reason = message.unwrap_or_else(|| "Client quit".into());
        self.push(Event::Error { body: format!("Closing Link: {nickname} (Quit: {reason})") });
        let _ = self.tx.send(Inbound::Close);
        Ok(())
    }
}

fn is_channel(target: &str) -> bool {
    target.starts_with(['#', '&'])
}

impl Engine for LoopbackEngine {
    async fn run(&self, on_event: &mut (dyn FnMut(Event) + Send)) -> Result<(), EngineError> {
        let mut rx = self
            .rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| EngineError::Transport("receive loop already running".into()))?;

        let mut keepalive = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        loop {
            tokio::select! {
                biased;

                inbound = rx.recv() => match inbound {
                    Some(Inbound::Event(event)) => on_event(event),
                    Some(Inbound::Close) | None => break,
                },

                _ = keepalive.tick() => on_event(Event::Ping { token: self.host.clone() }),
            }
        }

        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, request: Request) -> Result<(), EngineError> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }

        match request {
            Request::Raw(line) => {
                let command = line.split(' ').next().unwrap_or_default().to_ascii_uppercase();
                let prefix = self.host.clone();
                self.push(Event::Numeric { code: 421, prefix, body: format!("{command} :Unknown command") });
            },
            Request::Quit { message } => self.quit(message)?,
            Request::Join { channels } => self.join(&channels)?,
            Request::Part { channels } => self.part(&channels)?,
            Request::Message { target, text } => self.echo(MessageKind::Privmsg, &target, text)?,
            Request::Notice { target, text } => self.echo(MessageKind::Notice, &target, text)?,
            Request::Action { target, text } => {
                let nickname = self.state()?.nickname.clone();
                let target = if is_channel(&target) { target } else { nickname };
                self.push(Event::Ctcp {
                    kind: MessageKind::Privmsg,
                    prefix: ECHO_PREFIX.into(),
                    target,
                    ctcp: CtcpKind::Action,
                    body: text,
                });
            },
            Request::CtcpRequest { target, ctcp } => self.ctcp_request(&target, ctcp)?,
            Request::Nick { nickname } => {
                let mut state = self.state()?;
                let prefix = state.prefix();
                state.nickname.clone_from(&nickname);
                self.push(Event::Nick { prefix, nickname });
            },
            Request::Topic { channel, topic } => {
                let prefix = self.state()?.prefix();
                self.push(Event::Topic { prefix, body: format!("{channel} :{topic}") });
            },
            Request::List { filter } => self.list(filter.as_deref())?,
            Request::Invite { nickname, channel } => {
                self.numeric(341, format!("{nickname} {channel}"));
            },
            Request::Identify { username, .. } => {
                let prefix = self.state()?.prefix();
                self.numeric(900, format!("{prefix} {username} :You are now logged in as {username}"));
            },
            Request::CtcpReply { .. } | Request::Pong { .. } => {},
        }
        Ok(())
    }

    fn nickname(&self) -> String {
        self.state.lock().map(|s| s.nickname.clone()).unwrap_or_default()
    }

    fn hostname(&self) -> String {
        self.host.clone()
    }
}
