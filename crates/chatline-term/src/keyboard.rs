//! Keyboard byte source.
//!
//! A dedicated thread owns stdin and forwards whatever it reads over a
//! channel. Reading stdin from a future inside `select!` would orphan a
//! blocking read every time the other branch wins; a single owner thread
//! avoids competing readers and lost keystrokes.

use std::{
    collections::VecDeque,
    io::{self, Read},
    thread,
};

use tokio::sync::mpsc;

/// Bytes buffered between the stdin thread and the multiplexer.
const CHANNEL_DEPTH: usize = 16;

/// Byte-at-a-time view of the keyboard.
#[derive(Debug)]
pub struct Keyboard {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl Keyboard {
    /// Start reading the process's stdin on a background thread.
    ///
    /// The thread exits on end-of-file, on a read error, or once the
    /// keyboard is dropped.
    pub fn stdin() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(CHANNEL_DEPTH);
        thread::Builder::new().name("stdin".into()).spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                    Err(e) => {
                        tracing::debug!("stdin read failed: {:?}", e);
                        break;
                    },
                }
            }
        })?;
        Ok(Self::from_channel(rx))
    }

    /// Keyboard fed from an arbitrary channel. Closing the channel reads as
    /// end-of-file.
    pub fn from_channel(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx, pending: VecDeque::new() }
    }

    /// Next typed byte, or `None` at end-of-file.
    ///
    /// Cancel safe.
    pub async fn next_byte(&mut self) -> Option<u8> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Some(byte);
            }
            let bytes = self.rx.recv().await?;
            self.pending.extend(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_arrive_in_order_then_eof() {
        let (tx, rx) = mpsc::channel(4);
        let mut keyboard = Keyboard::from_channel(rx);
        tx.send(b"ab".to_vec()).await.unwrap();
        tx.send(Vec::new()).await.unwrap();
        tx.send(b"c".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(keyboard.next_byte().await, Some(b'a'));
        assert_eq!(keyboard.next_byte().await, Some(b'b'));
        assert_eq!(keyboard.next_byte().await, Some(b'c'));
        assert_eq!(keyboard.next_byte().await, None);
    }
}
