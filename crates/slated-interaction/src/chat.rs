//! Chat types and the reasoning-model collaborator seam.

use async_trait::async_trait;
use serde::Serialize;
use slated_core::tool::ToolCall;
use slated_core::Result;

/// One message on the wire to the reasoning model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// What one reasoning step produced: either a final natural-language
/// answer or one or more structured tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Message(String),
    ToolCalls(Vec<ToolCall>),
}

/// The reasoning-model collaborator.
///
/// Implementations carry their own credential handling and timeout; the
/// workflow only sees history in, outcome out.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Runs one reasoning step over the message history.
    ///
    /// # Errors
    ///
    /// `KeysExhausted` when every credential failed for this call,
    /// `Agent` for failures not attributable to a credential. Both are
    /// recoverable at the workflow boundary.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatOutcome>;
}
