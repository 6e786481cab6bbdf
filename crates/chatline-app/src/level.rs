//! Severity levels for delivered lines.

/// Highest accepted debug threshold.
pub const MAX_DEBUG_LEVEL: u8 = 10;

/// Severity of a line delivered to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Something failed.
    Error,
    /// Something looks wrong but the session continues.
    Warn,
    /// Informational.
    Info,
    /// Debug output, shown only when the threshold is at least this value.
    Debug(u8),
}

impl Level {
    /// Fixed-width tag printed between brackets.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug(_) => "DEBUG",
        }
    }

    /// Whether a line at this level is shown under `threshold`.
    pub fn is_enabled(self, threshold: u8) -> bool {
        match self {
            Level::Debug(n) => threshold >= n,
            Level::Error | Level::Warn | Level::Info => true,
        }
    }
}
