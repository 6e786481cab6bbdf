//! Wakeup bridge.
//!
//! A Unix datagram socket pair that lets any execution context (the receive
//! task, the shutdown coordinator, the tracing layer) wake the foreground
//! poll loop, either with a block of output to display or with a stop
//! request. Datagrams keep message boundaries, so a lone `0x00` datagram is
//! unambiguous: it is the stop sentinel and never part of output.
//!
//! A stop request also sets an atomic flag before sending the sentinel. If
//! the socket queue is full and the sentinel is dropped, the receiver still
//! observes the flag the next time it is polled.
//!
//! Sends never block. Output that does not fit in the socket waits in a
//! backlog owned by the bridge, and the receiver moves it into the socket as
//! it frees space. A producer that is also the reader (the foreground) can
//! therefore never wedge itself on a full socket.

use std::{
    collections::VecDeque,
    io,
    os::{fd::AsRawFd, unix::net::UnixDatagram as StdDatagram},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use nix::{
    errno::Errno,
    sys::socket::{self, MsgFlags},
};
use tokio::net::UnixDatagram;

/// Largest output block carried by one datagram.
pub const MAX_CHUNK: usize = 4095;

/// The stop request datagram.
const STOP_SENTINEL: u8 = 0;

/// What woke the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    /// A block of output to display (1..=[`MAX_CHUNK`] bytes).
    Output(Vec<u8>),
    /// Stop was requested.
    Stop,
}

#[derive(Debug)]
struct Shared {
    socket: StdDatagram,
    stop: AtomicBool,
    /// Blocks that did not fit in the socket yet, oldest first.
    backlog: Mutex<VecDeque<Vec<u8>>>,
}

impl Shared {
    fn backlog(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        match self.backlog.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Move backlogged blocks into the socket until it is full again.
    fn pump(&self) -> io::Result<()> {
        let mut backlog = self.backlog();
        pump_into(&self.socket, &mut backlog)
    }
}

fn pump_into(socket: &StdDatagram, backlog: &mut VecDeque<Vec<u8>>) -> io::Result<()> {
    while let Some(block) = backlog.front() {
        match socket::send(socket.as_raw_fd(), block, MsgFlags::MSG_DONTWAIT) {
            Ok(_) => {
                backlog.pop_front();
            },
            Err(Errno::EAGAIN | Errno::ENOBUFS) => break,
            Err(e) => {
                backlog.clear();
                return Err(e.into());
            },
        }
    }
    Ok(())
}

/// Write end of the bridge. Cheap to clone; safe to use from any thread.
#[derive(Debug, Clone)]
pub struct WakeupSender {
    shared: Arc<Shared>,
}

/// Read end of the bridge, owned by the multiplexer.
#[derive(Debug)]
pub struct WakeupReceiver {
    socket: UnixDatagram,
    shared: Arc<Shared>,
    stopped: bool,
    buf: Box<[u8; MAX_CHUNK + 1]>,
}

/// Create a connected bridge.
///
/// Must be called from within a tokio runtime; the read end registers with
/// its reactor.
pub fn bridge() -> io::Result<(WakeupSender, WakeupReceiver)> {
    let (tx, rx) = StdDatagram::pair()?;
    rx.set_nonblocking(true)?;
    let socket = UnixDatagram::from_std(rx)?;

    let shared = Arc::new(Shared {
        socket: tx,
        stop: AtomicBool::new(false),
        backlog: Mutex::new(VecDeque::new()),
    });
    let receiver = WakeupReceiver {
        socket,
        shared: Arc::clone(&shared),
        stopped: false,
        buf: Box::new([0; MAX_CHUNK + 1]),
    };
    Ok((WakeupSender { shared }, receiver))
}

impl WakeupSender {
    /// Request that the foreground stop.
    ///
    /// Never blocks, allocates, or locks. Calling it repeatedly is harmless.
    pub fn notify_stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let _ = socket::send(
            self.shared.socket.as_raw_fd(),
            &[STOP_SENTINEL],
            MsgFlags::MSG_DONTWAIT,
        );
    }

    /// Queue `bytes` for display, split into blocks of at most
    /// [`MAX_CHUNK`] bytes.
    ///
    /// Never blocks: blocks the socket cannot take yet stay in the backlog,
    /// behind anything already waiting there.
    pub fn notify_output(&self, bytes: &[u8]) -> io::Result<()> {
        let mut backlog = self.shared.backlog();
        backlog.extend(
            bytes.chunks(MAX_CHUNK).filter(|chunk| *chunk != [STOP_SENTINEL]).map(<[u8]>::to_vec),
        );
        pump_into(&self.shared.socket, &mut backlog)
    }

    /// Whether stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }
}

impl WakeupReceiver {
    /// Wait for the next wakeup.
    ///
    /// Cancel safe: if the future is dropped before completing, no datagram
    /// is lost. Once [`Wakeup::Stop`] has been returned, every later call
    /// returns it again immediately.
    pub async fn recv(&mut self) -> io::Result<Wakeup> {
        if self.stopped || self.shared.stop.load(Ordering::SeqCst) {
            self.stopped = true;
            return Ok(Wakeup::Stop);
        }

        let n = self.socket.recv(&mut self.buf[..]).await?;
        // A failed refill resurfaces on the producer's next send.
        let _ = self.shared.pump();
        match &self.buf[..n] {
            [STOP_SENTINEL] | [] => {
                self.stopped = true;
                Ok(Wakeup::Stop)
            },
            block => Ok(Wakeup::Output(block.to_vec())),
        }
    }

    /// Output blocks already queued, backlog included, without waiting.
    /// Stop sentinels are skipped.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut blocks = Vec::new();
        let fd = self.socket.as_raw_fd();
        loop {
            if self.shared.pump().is_err() {
                break;
            }
            let Ok(n) = socket::recv(fd, &mut self.buf[..], MsgFlags::MSG_DONTWAIT) else {
                break;
            };
            match &self.buf[..n] {
                [STOP_SENTINEL] | [] => {},
                block => blocks.push(block.to_vec()),
            }
        }
        blocks.extend(self.shared.backlog().drain(..));
        blocks
    }

    /// Whether a stop has already been consumed.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
