//! Prompt display string.
//!
//! The prompt reflects the engine's nickname and hostname plus the foreground
//! channel. It is bounded to [`MAX_PROMPT_LEN`] bytes so a long hostname
//! cannot push the edit buffer off the line.

/// Prompt shown before the engine reports a hostname.
pub const DEFAULT_PROMPT: &str = "chat> ";

/// Upper bound on the prompt length in bytes.
pub const MAX_PROMPT_LEN: usize = 83;

/// Upper bound on the stored foreground channel name in bytes.
pub const MAX_CHANNEL_LEN: usize = 63;

/// Current prompt and foreground channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    channel: Option<String>,
    nick: String,
    host: String,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt {
    /// Prompt showing [`DEFAULT_PROMPT`] with no foreground channel.
    pub fn new() -> Self {
        Self {
            text: DEFAULT_PROMPT.to_owned(),
            channel: None,
            nick: String::new(),
            host: String::new(),
        }
    }

    /// Text to print before the edit buffer.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Foreground channel, if one is set.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Set the foreground channel (truncated to [`MAX_CHANNEL_LEN`]).
    pub fn set_channel(&mut self, channel: &str) {
        self.channel = Some(truncate(channel, MAX_CHANNEL_LEN).to_owned());
        self.rebuild();
    }

    /// Refresh the identity shown in the prompt. Returns `true` if the
    /// prompt text changed.
    pub fn update(&mut self, nick: &str, host: &str) -> bool {
        if self.nick == nick && self.host == host {
            return false;
        }
        nick.clone_into(&mut self.nick);
        host.clone_into(&mut self.host);
        let before = std::mem::take(&mut self.text);
        self.rebuild();
        before != self.text
    }

    fn rebuild(&mut self) {
        let text = match (self.nick.is_empty(), self.host.is_empty(), &self.channel) {
            (true, true, _) => DEFAULT_PROMPT.to_owned(),
            (true, false, _) => format!("{}> ", self.host),
            (false, _, Some(chan)) => format!("{}@{} ({})> ", self.nick, self.host, chan),
            (false, _, None) => format!("{}@{}> ", self.nick, self.host),
        };
        self.text = truncate(&text, MAX_PROMPT_LEN).to_owned();
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn default_prompt_before_connect() {
        assert_eq!(Prompt::new().as_str(), DEFAULT_PROMPT);
    }

    #[test]
    fn host_only_before_registration() {
        let mut prompt = Prompt::new();
        assert!(prompt.update("", "irc.example.org"));
        assert_eq!(prompt.as_str(), "irc.example.org> ");
    }

    #[test]
    fn nick_host_and_channel() {
        let mut prompt = Prompt::new();
        prompt.update("alice", "irc.example.org");
        assert_eq!(prompt.as_str(), "alice@irc.example.org> ");

        prompt.set_channel("#rust");
        assert_eq!(prompt.as_str(), "alice@irc.example.org (#rust)> ");
        assert_eq!(prompt.channel(), Some("#rust"));
    }

    #[test]
    fn unchanged_identity_reports_no_change() {
        let mut prompt = Prompt::new();
        prompt.update("alice", "host");
        assert!(!prompt.update("alice", "host"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }

    proptest! {
        #[test]
        fn prompt_is_bounded(
            nick in "\\PC{0,40}",
            host in "\\PC{0,60}",
            chan in proptest::option::of("\\PC{0,80}"),
        ) {
            let mut prompt = Prompt::new();
            if let Some(chan) = &chan {
                prompt.set_channel(chan);
            }
            prompt.update(&nick, &host);

            prop_assert!(prompt.as_str().len() <= MAX_PROMPT_LEN);
            prop_assert!(prompt.channel().is_none_or(|c| c.len() <= MAX_CHANNEL_LEN));
        }
    }
}
