//! End-to-end sessions against the loopback server.
//!
//! # Oracle Pattern
//!
//! Each test scripts the keyboard, runs a whole [`Runtime`] on a recording
//! screen, and checks the final state:
//! - How the session ended (exit banner lines)
//! - What the user saw while it ran
//! - What reached the transcript

use std::{path::Path, sync::Arc, time::Duration};

use chatline_app::{ConnectParams, SessionContext};
use chatline_term::{
    Keyboard, LoopbackConnector, Multiplexer, OutputRelay, RecordingScreen, Runtime,
    RuntimeConfig, RuntimeError, WakeupSender, wakeup,
};
use tokio::sync::mpsc;

struct Session {
    runtime: Runtime<LoopbackConnector, RecordingScreen>,
    keys: mpsc::Sender<Vec<u8>>,
    wakeup: WakeupSender,
    screen: RecordingScreen,
    session: Arc<SessionContext>,
}

fn session(config: RuntimeConfig) -> Session {
    let session = Arc::new(SessionContext::new());
    let (wakeup, rx) = wakeup::bridge().unwrap();
    let (keys, key_rx) = mpsc::channel(64);
    let screen = RecordingScreen::new();

    let relay = OutputRelay::with_writer(Arc::clone(&session), wakeup.clone(), screen.clone());
    let mux =
        Multiplexer::new(Arc::clone(&session), Keyboard::from_channel(key_rx), rx, screen.clone());
    let runtime = Runtime::new(config, LoopbackConnector::default(), relay, mux);

    Session { runtime, keys, wakeup, screen, session }
}

fn connected(transcript: Option<&Path>) -> RuntimeConfig {
    RuntimeConfig {
        connect: Some(ConnectParams::new("irc.loopback.test", "alice")),
        transcript: transcript.map(Path::to_path_buf),
        ..RuntimeConfig::default()
    }
}

fn shows(screen: &RecordingScreen, suffix: &str) -> bool {
    screen.lines().iter().any(|line| line.ends_with(suffix))
}

async fn run(runtime: Runtime<LoopbackConnector, RecordingScreen>) -> Result<(), RuntimeError> {
    tokio::time::timeout(Duration::from_secs(10), runtime.run()).await.unwrap()
}

#[tokio::test]
async fn quit_ends_with_server_close() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("client.txt");
    let Session { runtime, keys, screen, session, .. } = session(connected(Some(&transcript)));

    keys.send(b"/join #x\n/fg #x\nhi\n/quit bye\n".to_vec()).await.unwrap();
    run(runtime).await.unwrap();

    let lines = screen.lines();
    assert_eq!(lines.last().unwrap(), "=== Client is exiting ===");
    assert!(lines.contains(&"Server closed the connection".to_owned()));
    assert!(shows(&screen, "Connected to irc.loopback.test:6667"));
    assert!(shows(&screen, "alice!alice@loopback has joined #x"));
    assert!(shows(&screen, "#x <echo!echo@loopback> hi"));
    assert!(shows(&screen, "Closing Link: alice (Quit: bye)"));
    assert_eq!(screen.titles().last().unwrap(), "#x");
    assert!(session.is_shutting_down());
    assert!(!session.is_fully_started());

    let recorded = std::fs::read_to_string(&transcript).unwrap();
    assert!(recorded.contains("#x <echo!echo@loopback> hi"));
    assert!(recorded.contains("Welcome to the loopback network, alice"));
}

#[tokio::test]
async fn interrupt_requests_disconnect() {
    let Session { runtime, keys: _keys, wakeup, screen, .. } = session(connected(None));

    wakeup.notify_stop();
    run(runtime).await.unwrap();

    let lines = screen.lines();
    let farewell = lines[lines.len() - 2..].join("\n");
    insta::assert_snapshot!(farewell, @r"
    Client requested disconnect...
    === Client is exiting ===
    ");
}

#[tokio::test]
async fn keyboard_eof_disconnects() {
    let Session { runtime, keys, screen, .. } = session(RuntimeConfig::default());

    keys.send(b"/join #x\n/dnd\n".to_vec()).await.unwrap();
    drop(keys);
    run(runtime).await.unwrap();

    assert!(shows(&screen, "Not connected to a server, operation not permitted."));
    assert!(shows(&screen, "Do Not Disturb is now enabled"));
    assert!(screen.lines().contains(&"Client disconnected".to_owned()));
}

#[tokio::test]
async fn server_command_connects_while_offline() {
    let Session { runtime, keys, screen, .. } = session(RuntimeConfig {
        username: "carol".into(),
        ..RuntimeConfig::default()
    });

    keys.send(b"/server nowhere.invalid\n/server irc.loopback.test 7000\n/quit\n".to_vec())
        .await
        .unwrap();
    run(runtime).await.unwrap();

    assert!(shows(&screen, "Failed to connect to server nowhere.invalid"));
    assert!(shows(&screen, "Connected to irc.loopback.test:7000"));
    assert!(shows(&screen, "Welcome to the loopback network, carol"));
    assert!(screen.lines().contains(&"Server closed the connection".to_owned()));
}

#[tokio::test]
async fn startup_connect_failure_is_fatal() {
    let Session { runtime, screen, .. } = session(RuntimeConfig {
        connect: Some(ConnectParams::new("nowhere.invalid", "alice")),
        ..RuntimeConfig::default()
    });

    let result = run(runtime).await;

    assert!(matches!(result, Err(RuntimeError::Engine(_))));
    assert!(screen.lines().contains(&"Failed to connect to nowhere.invalid:6667".to_owned()));
}

#[tokio::test]
async fn autojoin_and_foreground_on_startup() {
    let Session { runtime, keys, screen, .. } = session(RuntimeConfig {
        connect: Some(ConnectParams {
            autojoin: Some("#a,#b".into()),
            ..ConnectParams::new("irc.loopback.test", "alice")
        }),
        foreground: Some("#b".into()),
        ..RuntimeConfig::default()
    });

    keys.send(b"hello b\n/quit\n".to_vec()).await.unwrap();
    run(runtime).await.unwrap();

    assert!(shows(&screen, "has joined #a"));
    assert!(shows(&screen, "has joined #b"));
    assert!(shows(&screen, "#b <echo!echo@loopback> hello b"));
    assert_eq!(screen.titles().last().unwrap(), "#b");
}
