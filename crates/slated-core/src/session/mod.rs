//! Session domain module.
//!
//! - `message`: conversation message types
//! - `model`: the session entity and summaries
//! - `store`: keyed-lock store with per-user turn serialization

mod message;
mod model;
mod store;

pub use message::{ConversationMessage, MessageRole};
pub use model::{Session, SessionSummary};
pub use store::{SessionStore, TurnGuard};
