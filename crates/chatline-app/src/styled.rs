//! Styled text without terminal escape codes.
//!
//! Formatting code describes color as [`Tone`] spans; the terminal layer
//! decides how a tone is drawn. [`Styled`]'s `Display` output is the plain
//! text, which is also what ends up in the transcript.

use std::fmt;

/// Color hint for a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Errors, departures.
    Red,
    /// Arrivals, topic changes.
    Green,
    /// Renames, informational tags.
    Cyan,
}

/// A run of text with an optional tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Text of the span.
    pub text: String,
    /// Tone, or `None` for default color.
    pub tone: Option<Tone>,
}

/// A line made of styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styled {
    spans: Vec<Span>,
}

impl Styled {
    /// Empty line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append uncolored text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.spans.push(Span { text: text.into(), tone: None });
        self
    }

    /// Append text drawn in `tone`.
    #[must_use]
    pub fn tone(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.spans.push(Span { text: text.into(), tone: Some(tone) });
        self
    }

    /// Spans in display order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }
}

impl From<&str> for Styled {
    fn from(text: &str) -> Self {
        Styled::new().text(text)
    }
}

impl From<String> for Styled {
    fn from(text: String) -> Self {
        Styled::new().text(text)
    }
}

impl fmt::Display for Styled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for span in &self.spans {
            f.write_str(&span.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_plain_text() {
        let line = Styled::new().text("alice has ").tone(Tone::Green, "joined").text(" #rust");
        assert_eq!(line.to_string(), "alice has joined #rust");
        assert_eq!(line.spans()[1].tone, Some(Tone::Green));
    }
}
