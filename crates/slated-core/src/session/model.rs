//! Session domain model.

use super::message::{ConversationMessage, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable-for-process-lifetime conversational state for one user id.
///
/// A session contains the ordered message history (user turns, assistant
/// replies, tool observations), the names of tools already invoked, and a
/// last-activity timestamp used for TTL eviction. Exactly one session
/// exists per user id; the [`super::SessionStore`] is the sole owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub messages: Vec<ConversationMessage>,
    /// Tool names invoked over the session lifetime, in order.
    pub tool_calls_made: Vec<String>,
    /// Whether the last assistant reply asked the user to pin down
    /// missing details (date, time, duration) before acting.
    pub pending_clarification: bool,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            tool_calls_made: Vec::new(),
            pending_clarification: false,
            last_active: now,
        }
    }

    /// Appends one turn to the history and bumps the activity timestamp.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>, now: DateTime<Utc>) {
        self.messages
            .push(ConversationMessage::new(role, content, now));
        self.last_active = now;
    }

    /// The most recent assistant reply, if any.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            user_id: self.user_id.clone(),
            message_count: self.messages.len(),
            pending_clarification: self.pending_clarification,
            last_active: self.last_active,
        }
    }
}

/// Lightweight view of a session for listing surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: String,
    pub message_count: usize,
    pub pending_clarification: bool,
    pub last_active: DateTime<Utc>,
}
