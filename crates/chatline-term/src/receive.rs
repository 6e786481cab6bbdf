//! Receive task.
//!
//! Runs the engine's receive loop on a tokio task. Each inbound event is
//! formatted and its actions executed right away: lines go to the relay,
//! automatic replies go back to the engine. When the loop ends for any reason
//! the task wakes the foreground with a stop request, so a server-side close
//! ends the interactive session.

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chatline_app::{AppAction, Engine, Event, EventFormatter, Level};
use tokio::task::JoinHandle;

use crate::{relay::OutputRelay, transcript::Transcript};

/// Handle to a running receive loop.
#[derive(Debug)]
pub struct ReceiveTask {
    handle: JoinHandle<()>,
    finished: Arc<AtomicBool>,
    relay: OutputRelay,
}

impl ReceiveTask {
    /// Open the transcript (if a path is given) and start receiving.
    pub fn spawn<E: Engine>(engine: Arc<E>, relay: OutputRelay, transcript: Option<&Path>) -> Self {
        if let Some(path) = transcript {
            match Transcript::open(path) {
                Ok(transcript) => relay.attach_transcript(transcript),
                Err(e) => relay.emit(
                    Level::Error,
                    &format!("Failed to open transcript {}: {}", path.display(), e),
                ),
            }
        }

        let finished = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(receive_loop(engine, relay.clone(), Arc::clone(&finished)));
        Self { handle, finished, relay }
    }

    /// Whether the receive loop has ended on its own.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Abort the loop wherever it is, wait for the task, and close the
    /// transcript.
    pub async fn cancel(self) {
        self.handle.abort();
        if let Err(e) = self.handle.await
            && !e.is_cancelled()
        {
            tracing::warn!("Receive task failed: {:?}", e);
        }
        if let Some(transcript) = self.relay.detach_transcript()
            && let Err(e) = transcript.close()
        {
            tracing::warn!("Failed to close transcript: {:?}", e);
        }
    }
}

async fn receive_loop<E: Engine>(engine: Arc<E>, relay: OutputRelay, finished: Arc<AtomicBool>) {
    let formatter = EventFormatter::new(Arc::clone(relay.session()));

    let result = {
        let mut on_event = |event: Event| {
            let nickname = engine.nickname();
            for action in formatter.render(&event, &nickname) {
                if let Some(action) = execute(engine.as_ref(), &relay, action) {
                    tracing::debug!("ignoring {:?} from the receive loop", action);
                }
            }
        };
        engine.run(&mut on_event).await
    };

    match result {
        Ok(()) => relay.emit(Level::Info, "Receive loop has exited"),
        Err(e) => relay.emit(Level::Warn, &format!("Receive loop has exited: {e}")),
    }
    if engine.is_connected() {
        relay.emit(Level::Warn, "Engine still reports a connection after its receive loop ended");
    }

    finished.store(true, Ordering::Release);
    relay.wakeup().notify_stop();
}

/// Execute one action against the engine and relay.
///
/// Actions neither can handle (connect, title) are handed back.
pub(crate) fn execute<E: Engine>(
    engine: &E,
    relay: &OutputRelay,
    action: AppAction,
) -> Option<AppAction> {
    match relay.deliver(action)? {
        AppAction::Send(request) => {
            if let Err(e) = engine.send(request) {
                relay.emit(Level::Error, &format!("Failed to send: {e}"));
            }
            None
        },
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use chatline_app::{ConnectParams, Connector, Request, SessionContext};

    use super::*;
    use crate::{
        loopback::LoopbackConnector,
        screen::RecordingScreen,
        wakeup::{self, Wakeup},
    };

    #[tokio::test]
    async fn remote_close_wakes_the_foreground() {
        let session = Arc::new(SessionContext::new());
        session.mark_fully_started();
        let (tx, mut rx) = wakeup::bridge().unwrap();
        let relay = OutputRelay::with_writer(session, tx, RecordingScreen::new());
        let engine = Arc::new(
            LoopbackConnector::default()
                .connect(&ConnectParams::new("irc.loopback.test", "alice"))
                .await
                .unwrap(),
        );

        let task = ReceiveTask::spawn(Arc::clone(&engine), relay, None);
        engine.send(Request::Quit { message: None }).unwrap();

        loop {
            match rx.recv().await.unwrap() {
                Wakeup::Output(_) => {},
                Wakeup::Stop => break,
            }
        }
        assert!(task.is_finished());
        assert!(!engine.is_connected());
        task.cancel().await;
    }

    #[tokio::test]
    async fn send_failures_are_reported() {
        let session = Arc::new(SessionContext::new());
        let (tx, _rx) = wakeup::bridge().unwrap();
        let screen = RecordingScreen::new();
        let relay = OutputRelay::with_writer(session, tx, screen.clone());
        let engine = LoopbackConnector::default()
            .connect(&ConnectParams::new("irc.loopback.test", "alice"))
            .await
            .unwrap();
        engine.send(Request::Quit { message: None }).unwrap();
        engine.run(&mut |_: Event| {}).await.unwrap();

        let leftover =
            execute(&engine, &relay, AppAction::Send(Request::Join { channels: "#x".into() }));
        assert!(leftover.is_none());
        assert!(screen.lines()[0].ends_with("Failed to send: not connected"));

        let title = AppAction::SetTitle("#x".into());
        assert_eq!(execute(&engine, &relay, title.clone()), Some(title));
    }
}
