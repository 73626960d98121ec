//! Bounded conversation history.
//!
//! The log keeps the most recent [`HISTORY_CAPACITY`] entries (five user/assistant exchanges).
//! Appending past the cap silently evicts the oldest entry; entries are never edited.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Maximum number of entries retained between operations.
pub const HISTORY_CAPACITY: usize = 10;

/// Speaker of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The model's answers.
    Assistant,
}

impl Role {
    /// Wire name used by chat completion APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Capitalized label used when rendering the log into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub content: String,
}

/// Append-only ring of the most recent conversation turns.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryManager {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Append an entry, evicting the oldest ones beyond [`HISTORY_CAPACITY`].
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push_back(HistoryEntry {
            role,
            content: content.into(),
        });
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Entries in chronological order.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the log as `Role: content` lines, oldest first, each terminated by a newline.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}: {}\n", entry.role.label(), entry.content))
            .collect()
    }
}
