//! Integration tests for the foreground multiplexer.
//!
//! # Oracle Pattern
//!
//! Tests drive the keyboard and the wakeup bridge concurrently, then verify:
//! - The outcome of each `read_line`
//! - What a user would see on the screen
//! - Session flags shared with the background tasks

use std::{sync::Arc, time::Duration};

use chatline_app::{Level, SessionContext};
use chatline_term::{
    MAX_LINE_LEN, Multiplexer, OutputRelay, ReadOutcome, RecordingScreen, WakeupSender,
    keyboard::Keyboard, wakeup,
};
use tokio::sync::mpsc;

struct Harness {
    mux: Multiplexer<RecordingScreen>,
    keys: mpsc::Sender<Vec<u8>>,
    wakeup: WakeupSender,
    screen: RecordingScreen,
    session: Arc<SessionContext>,
}

/// Multiplexer in interactive mode on a recording screen, without touching
/// the real terminal.
fn interactive() -> Harness {
    let session = Arc::new(SessionContext::new());
    let (wakeup, rx) = wakeup::bridge().unwrap();
    let (keys, key_rx) = mpsc::channel(64);
    let screen = RecordingScreen::new();
    let mut mux =
        Multiplexer::new(Arc::clone(&session), Keyboard::from_channel(key_rx), rx, screen.clone());
    mux.enter_interactive_mode(false).unwrap();
    assert!(!mux.is_raw());
    assert!(session.is_fully_started());
    Harness { mux, keys, wakeup, screen, session }
}

fn prompt() -> String {
    "chat> ".to_owned()
}

/// Let socket readiness and channel sends settle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn output_during_typing_keeps_partial_line() {
    let Harness { mut mux, keys, wakeup, screen, .. } = interactive();
    let mut prompt = prompt();

    let typist = async {
        keys.send(b"hel".to_vec()).await.unwrap();
        settle().await;
        wakeup.notify_output(b"\r[12:00:00] news\n").unwrap();
        settle().await;

        let visible = screen.current_line();
        keys.send(b"lo\n".to_vec()).await.unwrap();
        visible
    };

    let (outcome, visible) = tokio::join!(mux.read_line(&mut prompt), typist);

    assert_eq!(outcome, ReadOutcome::Line("hello".into()));
    assert_eq!(visible, "chat> hel");
    assert!(screen.lines().contains(&"[12:00:00] news".to_owned()));
}

#[tokio::test]
async fn partial_output_blocks_join_on_one_line() {
    let Harness { mut mux, keys, wakeup, screen, .. } = interactive();
    let mut prompt = prompt();

    let feeder = async {
        wakeup.notify_output(b"\rfirst half, ").unwrap();
        settle().await;
        wakeup.notify_output(b"second half\n").unwrap();
        settle().await;
        keys.send(b"x\n".to_vec()).await.unwrap();
    };

    let (outcome, ()) = tokio::join!(mux.read_line(&mut prompt), feeder);

    assert_eq!(outcome, ReadOutcome::Line("x".into()));
    assert!(screen.lines().contains(&"first half, second half".to_owned()));
    assert_eq!(screen.current_line(), "chat> ");
}

#[tokio::test]
async fn remote_stop_ends_read_and_stays_latched() {
    let Harness { mut mux, keys: _keys, wakeup, session, .. } = interactive();
    let mut prompt = prompt();

    wakeup.notify_stop();
    wakeup.notify_stop();
    wakeup.notify_stop();

    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Stopped);
    assert!(session.is_shutting_down());
    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Stopped);
}

#[tokio::test]
async fn stop_wins_over_pending_keys() {
    let Harness { mut mux, keys, wakeup, session, .. } = interactive();
    let mut prompt = prompt();

    keys.send(b"abc\n".to_vec()).await.unwrap();
    wakeup.notify_stop();

    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Stopped);
    assert!(session.is_shutting_down());
    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Stopped);
}

#[tokio::test]
async fn stop_while_waiting_for_keys() {
    let Harness { mut mux, keys, wakeup, .. } = interactive();
    let mut prompt = prompt();

    let stopper = async {
        keys.send(b"half a li".to_vec()).await.unwrap();
        settle().await;
        wakeup.notify_stop();
    };

    let (outcome, ()) = tokio::join!(mux.read_line(&mut prompt), stopper);
    assert_eq!(outcome, ReadOutcome::Stopped);
}

#[tokio::test]
async fn keyboard_eof_disconnects() {
    let Harness { mut mux, keys, .. } = interactive();
    let mut prompt = prompt();

    keys.send(b"first\nunfinished".to_vec()).await.unwrap();
    drop(keys);

    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Line("first".into()));
    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Disconnected);
}

#[tokio::test]
async fn full_buffer_submits_without_newline() {
    let Harness { mut mux, keys, .. } = interactive();
    let mut prompt = prompt();

    let mut input = vec![b'a'; MAX_LINE_LEN];
    input.extend_from_slice(b"b\n");
    keys.send(input).await.unwrap();

    let ReadOutcome::Line(first) = mux.read_line(&mut prompt).await else {
        panic!("expected a line");
    };
    assert_eq!(first.len(), MAX_LINE_LEN);
    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Line("b".into()));
}

#[tokio::test]
async fn empty_lines_redraw_the_prompt() {
    let Harness { mut mux, keys, screen, .. } = interactive();
    let mut prompt = prompt();

    keys.send(b"\n\r\x7fok\n".to_vec()).await.unwrap();

    assert_eq!(mux.read_line(&mut prompt).await, ReadOutcome::Line("ok".into()));
    assert_eq!(screen.bells(), 1);
}

#[tokio::test]
async fn relay_routes_through_bridge_only_while_interactive() {
    let session = Arc::new(SessionContext::new());
    let (tx, rx) = wakeup::bridge().unwrap();
    let (keys, key_rx) = mpsc::channel(8);
    let screen = RecordingScreen::new();
    let relay = OutputRelay::with_writer(Arc::clone(&session), tx, screen.clone());
    let mut mux =
        Multiplexer::new(Arc::clone(&session), Keyboard::from_channel(key_rx), rx, screen.clone());

    relay.plain("before");
    assert_eq!(screen.lines(), vec!["before".to_owned()]);

    mux.enter_interactive_mode(false).unwrap();
    relay.plain("queued");
    assert_eq!(screen.lines().len(), 1, "interactive output waits for the poll loop");

    let mut prompt = prompt();
    let typist = async {
        settle().await;
        keys.send(b"go\n".to_vec()).await.unwrap();
    };
    let (outcome, ()) = tokio::join!(mux.read_line(&mut prompt), typist);
    assert_eq!(outcome, ReadOutcome::Line("go".into()));
    assert!(screen.lines().contains(&"queued".to_owned()));

    relay.emit(Level::Warn, "left behind");
    mux.leave_interactive_mode();
    assert!(!session.is_fully_started());
    assert!(screen.lines().last().unwrap().ends_with("[WARN ] left behind"));

    relay.plain("after");
    assert_eq!(screen.lines().last().unwrap(), "after");
}

#[tokio::test]
async fn leaving_keeps_queued_output_ahead_of_later_lines() {
    let session = Arc::new(SessionContext::new());
    let (tx, rx) = wakeup::bridge().unwrap();
    let (_keys, key_rx) = mpsc::channel(8);
    let screen = RecordingScreen::new();
    let relay = OutputRelay::with_writer(Arc::clone(&session), tx, screen.clone());
    let mut mux =
        Multiplexer::new(Arc::clone(&session), Keyboard::from_channel(key_rx), rx, screen.clone());

    mux.enter_interactive_mode(false).unwrap();
    for i in 0..1_000 {
        relay.plain(&format!("queued {i}"));
    }
    mux.leave_interactive_mode();
    relay.plain("after");

    let lines = screen.lines();
    assert_eq!(lines.len(), 1_001);
    assert_eq!(lines[0], "queued 0");
    assert_eq!(lines[999], "queued 999");
    assert_eq!(lines[1_000], "after");
}
