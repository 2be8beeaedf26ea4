//! Console log channels.
//!
//! The coordinator reports progress to a [`ConsoleLog`] under a channel
//! name. Writing is fire-and-forget; implementations must not block.

use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use tracing::info;

/// Channel used by the coordinator and the sync commands.
pub const SYNC_CHANNEL: &str = "Sync";

/// A sink for human-readable console lines.
pub trait ConsoleLog: Send + Sync {
    /// Appends `message` to `channel`.
    fn log(&self, channel: &str, message: &str);
}

/// Forwards console lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ConsoleLog for TracingLog {
    fn log(&self, channel: &str, message: &str) {
        info!(channel, "{message}");
    }
}

/// In-memory console with one bounded line buffer per channel.
#[derive(Debug)]
pub struct ChannelLog {
    channels: RwLock<BTreeMap<String, VecDeque<String>>>,
    max_lines: usize,
}

impl ChannelLog {
    /// Default number of lines kept per channel.
    pub const DEFAULT_MAX_LINES: usize = 500;

    /// Creates an empty console.
    pub fn new() -> Self {
        Self::with_max_lines(Self::DEFAULT_MAX_LINES)
    }

    /// Creates an empty console keeping at most `max_lines` per channel.
    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
            max_lines: max_lines.max(1),
        }
    }

    /// Returns the lines of `channel`, oldest first.
    pub fn lines(&self, channel: &str) -> Vec<String> {
        self.channels
            .read()
            .get(channel)
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the lines of `channel` joined with newlines.
    pub fn text(&self, channel: &str) -> String {
        self.lines(channel).join("\n")
    }

    /// Empties `channel`.
    pub fn clear(&self, channel: &str) {
        if let Some(lines) = self.channels.write().get_mut(channel) {
            lines.clear();
        }
    }

    /// Empties every channel.
    pub fn clear_all(&self) {
        self.channels.write().clear();
    }

    /// Names of the channels that have been written to.
    pub fn channels(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }
}

impl Default for ChannelLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLog for ChannelLog {
    fn log(&self, channel: &str, message: &str) {
        let mut channels = self.channels.write();
        let lines = channels.entry(channel.to_string()).or_default();
        if lines.len() == self.max_lines {
            lines.pop_front();
        }
        lines.push_back(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_per_channel() {
        let console = ChannelLog::new();
        console.log("Sync", "Saving...");
        console.log("Sync", "Saved.");
        console.log("Game", "Level up");

        assert_eq!(console.lines("Sync"), vec!["Saving...", "Saved."]);
        assert_eq!(console.text("Sync"), "Saving...\nSaved.");
        assert_eq!(console.channels(), vec!["Game", "Sync"]);
        assert!(console.lines("Other").is_empty());
    }

    #[test]
    fn line_cap_drops_oldest() {
        let console = ChannelLog::with_max_lines(2);
        for i in 0..4 {
            console.log("Sync", &format!("line {i}"));
        }
        assert_eq!(console.lines("Sync"), vec!["line 2", "line 3"]);
    }

    #[test]
    fn clearing() {
        let console = ChannelLog::new();
        console.log("Sync", "a");
        console.log("Game", "b");

        console.clear("Sync");
        assert!(console.lines("Sync").is_empty());
        assert_eq!(console.lines("Game"), vec!["b"]);

        console.clear_all();
        assert!(console.channels().is_empty());
    }
}
