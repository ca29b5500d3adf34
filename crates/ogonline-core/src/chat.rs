//! Chat history and chat commands.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub text: String,
    pub at: Instant,
}

#[derive(Debug)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    max_lines: usize,
    max_age: Duration,
}

impl ChatLog {
    pub fn new(max_lines: usize, max_age: Duration) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines,
            max_age,
        }
    }

    pub fn add(&mut self, text: impl Into<String>) {
        self.add_at(text, Instant::now());
    }

    pub fn add_at(&mut self, text: impl Into<String>, at: Instant) {
        let text = text.into();
        info!(target: "chat", "{text}");
        self.lines.push_back(ChatLine { text, at });
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    /// Drops lines older than the configured age.
    pub fn prune(&mut self, now: Instant) {
        while let Some(front) = self.lines.front() {
            if now.saturating_duration_since(front.at) <= self.max_age {
                break;
            }
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A chat line is a command when it starts with `/` and has more after it.
pub fn is_command(message: &str) -> bool {
    message.len() > 1 && message.starts_with('/')
}

/// Splits `/cmd a  b` into `["cmd", "a", "b"]`.
pub fn parse_command(message: &str) -> Vec<String> {
    message
        .strip_prefix('/')
        .unwrap_or(message)
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert!(is_command("/kick Turner"));
        assert!(!is_command("/"));
        assert!(!is_command("hello"));
        assert_eq!(parse_command("/kick   Turner now"), ["kick", "Turner", "now"]);
    }

    #[test]
    fn log_caps_lines_and_prunes_by_age() {
        let mut log = ChatLog::new(2, Duration::from_secs(10));
        let t0 = Instant::now();
        log.add_at("a", t0);
        log.add_at("b", t0 + Duration::from_secs(5));
        log.add_at("c", t0 + Duration::from_secs(6));
        assert_eq!(log.texts(), ["b", "c"]);

        log.prune(t0 + Duration::from_secs(15) + Duration::from_millis(500));
        assert_eq!(log.texts(), ["c"]);
    }
}
