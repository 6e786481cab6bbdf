//! Slash-command parsing.
//!
//! [`parse`] turns one submitted line into a [`Command`]. Lines starting with
//! `/` are commands (case-insensitive); anything else is text for the
//! foreground channel. Arguments are split on single spaces, and commands that
//! take free text keep the remainder verbatim.

use thiserror::Error;

use crate::{CtcpKind, MAX_DEBUG_LEVEL};

/// Commands that do not need a server connection.
const OFFLINE_COMMANDS: [&str; 5] = ["help", "debug", "dnd", "fg", "server"];

/// Why a command's arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// A required parameter was absent.
    #[error("Missing required parameter {0}")]
    Missing(&'static str),

    /// A parameter was present but unusable.
    #[error("Invalid {name}: {value}")]
    Invalid {
        /// Parameter name.
        name: &'static str,
        /// Value as typed.
        value: String,
    },
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/help`
    Help,
    /// `/debug <0-10>`
    Debug {
        /// New threshold.
        level: u8,
    },
    /// `/dnd`
    DoNotDisturb,
    /// `/fg <CHAN>`
    Foreground {
        /// Channel to send plain text to.
        channel: String,
    },
    /// `/server <HOST> [PORT]`
    Server {
        /// Hostname.
        host: String,
        /// Port, if given.
        port: Option<u16>,
    },
    /// `/raw <MSG>`
    Raw {
        /// Protocol line.
        line: String,
    },
    /// `/quit [MSG]`
    Quit {
        /// Quit message.
        message: Option<String>,
    },
    /// `/part <CHANS>`
    Part {
        /// Comma-separated channels.
        channels: String,
    },
    /// `/join <CHANS>`
    Join {
        /// Comma-separated channels.
        channels: String,
    },
    /// `/msg <TARGET> <MSG>`
    Msg {
        /// Channel or nickname.
        target: String,
        /// Message text.
        text: String,
    },
    /// `/notice <TARGET> <MSG>`
    Notice {
        /// Channel or nickname.
        target: String,
        /// Notice text.
        text: String,
    },
    /// `/me <ACTION>`
    Me {
        /// Action text.
        action: String,
    },
    /// `/describe <TARGET> <ACTION>`
    Describe {
        /// Channel or nickname.
        target: String,
        /// Action text.
        action: String,
    },
    /// `/ctcp <TARGET> <CMD>`
    Ctcp {
        /// Nickname or channel.
        target: String,
        /// Extension to request.
        ctcp: CtcpKind,
    },
    /// `/nick <NICK>`
    Nick {
        /// Requested nickname.
        nickname: String,
    },
    /// `/topic <CHAN> <TOPIC>`
    Topic {
        /// Channel.
        channel: String,
        /// New topic.
        topic: String,
    },
    /// `/list [CHANS]`
    List {
        /// Optional comma-separated filter.
        filter: Option<String>,
    },
    /// `/invite <NICK> <CHAN>`
    Invite {
        /// User to invite.
        nickname: String,
        /// Channel.
        channel: String,
    },
    /// `/identify <USER> <PASS>`
    Identify {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// Text for the foreground channel.
    Say {
        /// The line as typed.
        text: String,
    },
    /// Unrecognized `/command`.
    Unknown {
        /// Command word as typed.
        command: String,
    },
    /// Recognized command with bad arguments.
    InvalidArgs {
        /// Command word, lower-cased.
        command: String,
        /// What was wrong.
        error: ArgError,
    },
}

impl Command {
    /// Whether the command may run without a server connection.
    pub fn allowed_offline(&self) -> bool {
        match self {
            Command::Help
            | Command::Debug { .. }
            | Command::DoNotDisturb
            | Command::Foreground { .. }
            | Command::Server { .. } => true,
            Command::InvalidArgs { command, .. } => OFFLINE_COMMANDS.contains(&command.as_str()),
            _ => false,
        }
    }
}

/// Parse one submitted line.
pub fn parse(input: &str) -> Command {
    let Some(body) = input.strip_prefix('/') else {
        return Command::Say { text: input.to_owned() };
    };

    let mut args = Args::new(body);
    let word = args.word().unwrap_or_default();
    let name = word.to_ascii_lowercase();

    match parse_known(&name, &mut args) {
        Some(Ok(command)) => command,
        Some(Err(error)) => Command::InvalidArgs { command: name, error },
        None => Command::Unknown { command: word.to_owned() },
    }
}

fn parse_known(name: &str, args: &mut Args<'_>) -> Option<Result<Command, ArgError>> {
    let result = match name {
        "help" => Ok(Command::Help),
        "debug" => args.required("level").and_then(|raw| {
            raw.parse::<u8>()
                .ok()
                .filter(|level| *level <= MAX_DEBUG_LEVEL)
                .map(|level| Command::Debug { level })
                .ok_or_else(|| invalid("level", raw))
        }),
        "dnd" => Ok(Command::DoNotDisturb),
        "fg" => args.required("channel").map(|c| Command::Foreground { channel: c.into() }),
        "server" => parse_server(args),
        "raw" => args.rest_required("message").map(|line| Command::Raw { line: line.into() }),
        "quit" => Ok(Command::Quit { message: args.rest().map(str::to_owned) }),
        "part" => args.rest_required("channels").map(|c| Command::Part { channels: c.into() }),
        "join" => args.rest_required("channels").map(|c| Command::Join { channels: c.into() }),
        "msg" | "notice" | "describe" => {
            let target = args.required("target");
            let text = args.rest_required("message");
            target.and_then(|target| {
                text.map(|text| {
                    let (target, text) = (target.to_owned(), text.to_owned());
                    match name {
                        "msg" => Command::Msg { target, text },
                        "notice" => Command::Notice { target, text },
                        _ => Command::Describe { target, action: text },
                    }
                })
            })
        },
        "me" => args.rest_required("action").map(|a| Command::Me { action: a.into() }),
        "ctcp" => parse_ctcp(args),
        "nick" => args.required("nickname").map(|n| Command::Nick { nickname: n.into() }),
        "topic" => args.required("channel").and_then(|channel| {
            args.rest_required("topic")
                .map(|topic| Command::Topic { channel: channel.into(), topic: topic.into() })
        }),
        "list" => Ok(Command::List { filter: args.rest().map(str::to_owned) }),
        "invite" => args.required("nickname").and_then(|nickname| {
            args.required("channel").map(|channel| Command::Invite {
                nickname: nickname.into(),
                channel: channel.into(),
            })
        }),
        "identify" => args.required("username").and_then(|username| {
            args.required("password").map(|password| Command::Identify {
                username: username.into(),
                password: password.into(),
            })
        }),
        _ => return None,
    };
    Some(result)
}

fn parse_server(args: &mut Args<'_>) -> Result<Command, ArgError> {
    let host = args.required("hostname")?;
    let port = match args.word() {
        Some(raw) => Some(raw.parse::<u16>().map_err(|_| invalid("port", raw))?),
        None => None,
    };
    Ok(Command::Server { host: host.to_owned(), port })
}

fn parse_ctcp(args: &mut Args<'_>) -> Result<Command, ArgError> {
    let target = args.required("target")?;
    let raw = args.required("code")?;
    let ctcp = raw.parse::<CtcpKind>().map_err(|_| invalid("code", raw))?;
    Ok(Command::Ctcp { target: target.to_owned(), ctcp })
}

fn invalid(name: &'static str, value: &str) -> ArgError {
    ArgError::Invalid { name, value: value.to_owned() }
}

/// Single-space argument splitter over the text after the command word.
struct Args<'a> {
    rest: Option<&'a str>,
}

impl<'a> Args<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: Some(s) }
    }

    /// Next space-delimited word; `None` once exhausted or empty.
    fn word(&mut self) -> Option<&'a str> {
        let s = self.rest.take()?;
        let word = match s.split_once(' ') {
            Some((word, rest)) => {
                self.rest = Some(rest);
                word
            },
            None => s,
        };
        (!word.is_empty()).then_some(word)
    }

    /// Everything not consumed yet; `None` if empty.
    fn rest(&mut self) -> Option<&'a str> {
        self.rest.take().filter(|s| !s.is_empty())
    }

    fn required(&mut self, name: &'static str) -> Result<&'a str, ArgError> {
        self.word().ok_or(ArgError::Missing(name))
    }

    fn rest_required(&mut self, name: &'static str) -> Result<&'a str, ArgError> {
        self.rest().ok_or(ArgError::Missing(name))
    }
}
