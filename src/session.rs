//! Per-session conversation history.
//!
//! Each chat session keeps a bounded, append-only sequence of turns;
//! once the bound is reached the oldest turn is evicted. Sessions are
//! independent of each other and of the knowledge base — clearing one
//! never touches the other.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single utterance in a conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, bounded sequence of [`ChatTurn`]s. Oldest evicted first.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<ChatTurn>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Append a turn, evicting the oldest one past the bound.
    pub fn push(&mut self, turn: ChatTurn) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Snapshot of all retained turns, oldest first.
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Process-wide registry of per-session histories.
///
/// Histories are scoped per session id, so concurrent queries over
/// different sessions never contend on conversation state — only the
/// map itself is briefly locked.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ConversationHistory>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    /// Snapshot of a session's retained turns (empty for unknown ids).
    pub fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(session_id)
            .map(|h| h.turns())
            .unwrap_or_default()
    }

    /// Append a turn, creating the session on first use.
    pub fn append(&self, session_id: &str, role: Role, text: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationHistory::new(self.max_turns))
            .push(ChatTurn::new(role, text));
    }

    /// Drop a session's history entirely.
    pub fn clear(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}
