//! Async runtime
//!
//! Top-level session: prints the banner, optionally connects, then hands the
//! terminal to the [`Multiplexer`] and loops reading lines, turning each into
//! a [`Command`](chatline_app::Command) for the [`Dispatcher`] and executing
//! the resulting actions. Generic over the [`Connector`] and the [`Screen`]
//! so the whole session can run headless in tests.

use std::{io, path::PathBuf, sync::Arc};

use chatline_app::{
    AppAction, CLIENT_VERSION, ConnectParams, Connector, Dispatcher, Engine, EngineError, Level,
    Prompt, command,
};
use thiserror::Error;

use crate::{
    mux::{Multiplexer, PromptSource, ReadOutcome},
    receive::{ReceiveTask, execute},
    relay::OutputRelay,
    screen::Screen,
    shutdown::ShutdownCoordinator,
    terminal::TerminalError,
};

/// Username used when none is configured.
pub const DEFAULT_USERNAME: &str = "guest";

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Terminal attributes could not be changed.
    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),

    /// I/O error from terminal or signal setup.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The initial connection failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Session settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Take the terminal out of canonical mode while interactive.
    pub raw_mode: bool,
    /// Turn SIGINT into a stop request.
    pub handle_interrupts: bool,
    /// Where received lines are appended, if anywhere.
    pub transcript: Option<PathBuf>,
    /// Connect before going interactive.
    pub connect: Option<ConnectParams>,
    /// Initial foreground channel.
    pub foreground: Option<String>,
    /// Name used by `/server`.
    pub username: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            raw_mode: false,
            handle_interrupts: false,
            transcript: None,
            connect: None,
            foreground: None,
            username: DEFAULT_USERNAME.to_owned(),
        }
    }
}

/// Interactive client session.
pub struct Runtime<C: Connector, S: Screen> {
    config: RuntimeConfig,
    connector: C,
    relay: OutputRelay,
    mux: Multiplexer<S>,
    dispatcher: Dispatcher,
    engine: Option<Arc<C::Engine>>,
    receive: Option<ReceiveTask>,
}

impl<C: Connector, S: Screen> Runtime<C, S> {
    /// Assemble a session. Nothing happens until [`Runtime::run`].
    pub fn new(config: RuntimeConfig, connector: C, relay: OutputRelay, mux: Multiplexer<S>) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(relay.session()), config.username.clone());
        Self { config, connector, relay, mux, dispatcher, engine: None, receive: None }
    }

    /// Run the session until the user quits, the keyboard closes, or the
    /// server closes the connection.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        self.say(CLIENT_VERSION);
        let _ = self.mux.screen_mut().set_title(CLIENT_VERSION);

        let debug_level = self.relay.session().debug_level();
        if debug_level > 0 {
            self.say(&format!("client started with debug level {debug_level}"));
        }

        if let Some(params) = self.config.connect.clone() {
            if let Err(e) = self.connect(&params).await {
                self.say(&format!("Failed to connect to {}:{}", params.host, params.port));
                return Err(e.into());
            }
        } else {
            self.relay.emit(Level::Debug(1), "Started without active connection");
        }

        if let Some(channel) = self.config.foreground.clone() {
            let actions = self.dispatcher.set_foreground(&channel);
            self.apply_all(actions);
        }

        self.say("=== Client is now ready. Press ^C to exit ===");
        self.mux.enter_interactive_mode(self.config.raw_mode)?;
        let coordinator = if self.config.handle_interrupts {
            Some(ShutdownCoordinator::install(self.relay.wakeup().clone())?)
        } else {
            None
        };

        let outcome = loop {
            let mut prompt =
                LivePrompt { prompt: self.dispatcher.prompt_mut(), engine: self.engine.as_deref() };
            match self.mux.read_line(&mut prompt).await {
                ReadOutcome::Line(line) => self.submit(&line).await,
                other => break other,
            }
        };

        drop(coordinator);
        self.mux.leave_interactive_mode();

        let server_closed = self.receive.as_ref().is_some_and(ReceiveTask::is_finished);
        match outcome {
            ReadOutcome::Stopped if server_closed => self.say("\nServer closed the connection"),
            ReadOutcome::Stopped => self.say("\nClient requested disconnect..."),
            _ => self.say("\nClient disconnected"),
        }
        self.say("=== Client is exiting ===");

        if let Some(task) = self.receive.take() {
            task.cancel().await;
        }
        Ok(())
    }

    async fn submit(&mut self, line: &str) {
        let connected = self.engine.as_ref().is_some_and(|e| e.is_connected());
        let actions = self.dispatcher.handle(command::parse(line), connected);
        for action in actions {
            if let Some(params) = self.apply(action)
                && let Err(e) = self.connect(&params).await
            {
                tracing::debug!("connect to {}:{} failed: {:?}", params.host, params.port, e);
                self.relay.emit(Level::Error, &format!("Failed to connect to server {}", params.host));
            }
        }
    }

    /// Replace the current connection with a new one.
    async fn connect(&mut self, params: &ConnectParams) -> Result<(), EngineError> {
        if let Some(task) = self.receive.take() {
            task.cancel().await;
        }
        self.engine = None;

        let engine = Arc::new(self.connector.connect(params).await?);
        self.receive = Some(ReceiveTask::spawn(
            Arc::clone(&engine),
            self.relay.clone(),
            self.config.transcript.as_deref(),
        ));
        self.engine = Some(engine);

        let actions = self.dispatcher.on_connected(params);
        self.apply_all(actions);
        Ok(())
    }

    fn apply_all(&mut self, actions: Vec<AppAction>) {
        for action in actions {
            if let Some(params) = self.apply(action) {
                tracing::warn!("Ignoring nested connect to {}", params.host);
            }
        }
    }

    /// Execute one action. A connect request is handed back to the caller.
    fn apply(&mut self, action: AppAction) -> Option<ConnectParams> {
        let action = match self.engine.as_deref() {
            Some(engine) => execute(engine, &self.relay, action)?,
            None => self.relay.deliver(action)?,
        };

        match action {
            AppAction::Connect(params) => return Some(params),
            AppAction::SetTitle(title) => {
                let screen = self.mux.screen_mut();
                let _ = screen.set_title(&title).and_then(|()| screen.flush());
            },
            AppAction::Send(request) => {
                tracing::debug!("dropping {:?} without an engine", request);
                self.relay
                    .emit(Level::Error, &format!("Failed to send: {}", EngineError::NotConnected));
            },
            other => tracing::debug!("unexpected action {:?}", other),
        }
        None
    }

    /// Status line straight to the screen, bypassing relay and transcript.
    fn say(&mut self, text: &str) {
        let screen = self.mux.screen_mut();
        let _ = screen.write_raw(format!("{text}\n").as_bytes()).and_then(|()| screen.flush());
    }
}

/// Prompt that follows the engine's current nickname and host.
struct LivePrompt<'a, E> {
    prompt: &'a mut Prompt,
    engine: Option<&'a E>,
}

impl<E: Engine> PromptSource for LivePrompt<'_, E> {
    fn prompt(&mut self) -> &str {
        if let Some(engine) = self.engine {
            self.prompt.update(&engine.nickname(), &engine.hostname());
        }
        self.prompt.as_str()
    }
}
