//! Reasoning-model layer for the Slated assistant.
//!
//! Talks to the OpenRouter chat-completions API with credential rotation
//! and turns raw assistant content into structured outcomes (final
//! answers or tool calls).

pub mod chat;
pub mod openrouter;
pub mod outcome;
pub mod prompt;
pub mod rotation;

pub use chat::{ChatAgent, ChatMessage, ChatOutcome};
pub use openrouter::{CallError, OpenRouterClient, RawChatClient};
pub use outcome::parse_outcome;
pub use prompt::build_system_prompt;
pub use rotation::KeyRotationClient;
