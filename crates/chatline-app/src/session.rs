//! Session-wide state shared between execution contexts.
//!
//! One [`SessionContext`] is created per process and handed (behind an `Arc`)
//! to every component that needs it, instead of ambient globals. Each flag
//! has a single writer and moves in one direction during the window where
//! other contexts read it, so relaxed atomics are enough.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Instant,
};

use crate::MAX_DEBUG_LEVEL;

/// Flags, debug threshold, and ping bookkeeping for one client session.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Multiplexer is live; output must go through the wakeup bridge.
    fully_started: AtomicBool,
    /// A stop request was consumed by the multiplexer.
    shutting_down: AtomicBool,
    /// Suppress the mention bell.
    do_not_disturb: AtomicBool,
    /// Debug output threshold, `0..=MAX_DEBUG_LEVEL`.
    debug_level: AtomicU8,
    /// Outstanding CTCP pings by lower-cased target.
    pings: Mutex<PingTracker>,
}

impl SessionContext {
    /// Fresh session with all flags cleared and debug level 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether output is currently routed through the wakeup bridge.
    pub fn is_fully_started(&self) -> bool {
        self.fully_started.load(Ordering::Acquire)
    }

    /// Switch output routing to the wakeup bridge.
    pub fn mark_fully_started(&self) {
        self.fully_started.store(true, Ordering::Release);
    }

    /// Switch output routing back to the terminal after the loop has stopped.
    pub fn mark_stopped(&self) {
        self.fully_started.store(false, Ordering::Release);
    }

    /// Whether a stop request has been consumed.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Record that a stop request was consumed.
    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    /// Whether the mention bell is suppressed.
    pub fn do_not_disturb(&self) -> bool {
        self.do_not_disturb.load(Ordering::Relaxed)
    }

    /// Flip do-not-disturb, returning the new value.
    pub fn toggle_do_not_disturb(&self) -> bool {
        !self.do_not_disturb.fetch_xor(true, Ordering::Relaxed)
    }

    /// Current debug threshold.
    pub fn debug_level(&self) -> u8 {
        self.debug_level.load(Ordering::Relaxed)
    }

    /// Set the debug threshold. Returns `false` if `level` is out of range.
    pub fn set_debug_level(&self, level: u8) -> bool {
        if level > MAX_DEBUG_LEVEL {
            return false;
        }
        self.debug_level.store(level, Ordering::Relaxed);
        true
    }

    /// Remember that a CTCP ping was sent to `target` at `at`.
    pub fn record_ping(&self, target: &str, at: Instant) {
        if let Ok(mut pings) = self.pings.lock() {
            pings.record(target, at);
        }
    }

    /// Send time of the ping a reply from `nickname` answers.
    ///
    /// Prefers a ping sent to that nickname; falls back to the most recent
    /// ping (replies to a channel ping come from individual members).
    pub fn ping_sent_at(&self, nickname: &str) -> Option<Instant> {
        self.pings.lock().ok().and_then(|pings| pings.sent_at(nickname))
    }
}

#[derive(Debug, Default)]
struct PingTracker {
    by_target: HashMap<String, Instant>,
    latest: Option<Instant>,
}

impl PingTracker {
    fn record(&mut self, target: &str, at: Instant) {
        self.by_target.insert(target.to_lowercase(), at);
        self.latest = Some(at);
    }

    fn sent_at(&self, nickname: &str) -> Option<Instant> {
        self.by_target.get(&nickname.to_lowercase()).copied().or(self.latest)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn dnd_toggles() {
        let session = SessionContext::new();
        assert!(!session.do_not_disturb());
        assert!(session.toggle_do_not_disturb());
        assert!(session.do_not_disturb());
        assert!(!session.toggle_do_not_disturb());
    }

    #[test]
    fn debug_level_is_bounded() {
        let session = SessionContext::new();
        assert!(session.set_debug_level(10));
        assert!(!session.set_debug_level(11));
        assert_eq!(session.debug_level(), 10);
    }

    #[test]
    fn fully_started_round_trip() {
        let session = SessionContext::new();
        assert!(!session.is_fully_started());
        session.mark_fully_started();
        assert!(session.is_fully_started());
        session.mark_stopped();
        assert!(!session.is_fully_started());
    }

    #[test]
    fn ping_lookup_prefers_exact_target() {
        let session = SessionContext::new();
        let first = Instant::now();
        let second = first + Duration::from_millis(5);
        session.record_ping("Alice", first);
        session.record_ping("#rust", second);

        assert_eq!(session.ping_sent_at("alice"), Some(first));
        assert_eq!(session.ping_sent_at("bob"), Some(second));
    }

    #[test]
    fn no_ping_no_time() {
        let session = SessionContext::new();
        assert_eq!(session.ping_sent_at("alice"), None);
    }
}
