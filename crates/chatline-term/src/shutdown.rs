//! Shutdown coordinator.
//!
//! Turns SIGINT into a stop request on the wakeup bridge. The signal is
//! consumed by a tokio task rather than an async-signal handler, and the only
//! thing done per signal is [`WakeupSender::notify_stop`].

use std::io;

use tokio::{
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};

use crate::wakeup::WakeupSender;

/// Listens for interrupts while alive.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    handle: JoinHandle<()>,
}

impl ShutdownCoordinator {
    /// Start listening for SIGINT.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(wakeup: WakeupSender) -> io::Result<Self> {
        let mut interrupts = signal(SignalKind::interrupt())?;
        let handle = tokio::spawn(async move {
            while interrupts.recv().await.is_some() {
                wakeup.notify_stop();
            }
        });
        Ok(Self { handle })
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
