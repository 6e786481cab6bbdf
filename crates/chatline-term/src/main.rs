//! chatline terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # Start offline, then use /server inside the client
//! chatline
//!
//! # Connect immediately, join two channels, and talk in one of them
//! chatline -s irc.example.net -u alice -a '#rust,#tokio' -f '#rust'
//! ```

use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use chatline_app::{ConnectParams, DEFAULT_PORT, MAX_DEBUG_LEVEL, SessionContext};
use chatline_term::{
    Keyboard, LoopbackConnector, Multiplexer, OutputRelay, Runtime, RuntimeConfig,
    TerminalScreen, wakeup,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// chatline terminal client
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(about = "Line-mode chat client with a non-blocking prompt")]
#[command(version)]
struct Args {
    /// Server hostname to connect to on startup
    #[arg(short, long, env = "CHATLINE_SERVER")]
    server: Option<String>,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Username (and initial nickname)
    #[arg(short, long, default_value = "guest")]
    username: String,

    /// Comma-separated channels to join after connecting
    #[arg(short, long)]
    autojoin: Option<String>,

    /// Initial foreground channel
    #[arg(short, long)]
    foreground: Option<String>,

    /// Increase debug level (repeatable)
    #[arg(short, action = clap::ArgAction::Count)]
    debug: u8,

    /// File received lines are appended to
    #[arg(long, default_value = "client.txt")]
    transcript: PathBuf,

    /// Do not keep a transcript
    #[arg(long)]
    no_transcript: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.debug > MAX_DEBUG_LEVEL {
        return Err(format!("Maximum debug level is {MAX_DEBUG_LEVEL}").into());
    }

    let session = Arc::new(SessionContext::new());
    session.set_debug_level(args.debug);

    let (wakeup_tx, wakeup_rx) = wakeup::bridge()?;
    let relay = OutputRelay::new(Arc::clone(&session), wakeup_tx);

    let default_level = if args.debug > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(relay.clone())
                .without_time()
                .with_target(false)
                .with_level(false)
                .with_ansi(false),
        )
        .with(filter)
        .init();

    let interactive = std::io::stdin().is_terminal();
    let config = RuntimeConfig {
        raw_mode: interactive,
        handle_interrupts: true,
        transcript: (!args.no_transcript).then_some(args.transcript),
        connect: args.server.map(|host| ConnectParams {
            host,
            port: args.port,
            username: args.username.clone(),
            autojoin: args.autojoin,
        }),
        foreground: args.foreground,
        username: args.username,
    };

    let mux = Multiplexer::new(session, Keyboard::stdin()?, wakeup_rx, TerminalScreen::stdout());
    let runtime = Runtime::new(config, LoopbackConnector::default(), relay, mux);

    Ok(runtime.run().await?)
}
