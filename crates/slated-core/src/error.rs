//! Error types for the Slated assistant.

use thiserror::Error;

/// A shared error type for the entire Slated workspace.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. The variants mirror the
/// recoverability taxonomy the workflow relies on: everything except
/// `Config` is caught at the workflow boundary and converted to a
/// user-facing reply.
#[derive(Error, Debug, Clone)]
pub enum SlatedError {
    /// A natural-language time phrase matched no recognized pattern.
    /// Recoverable: the assistant asks for clarification.
    #[error("Could not understand the time phrase '{phrase}'")]
    UnparseablePhrase { phrase: String },

    /// Tool arguments failed validation. Recoverable: fed back to the
    /// reasoning step as an observation.
    #[error("Invalid tool arguments: {0}")]
    Validation(String),

    /// The external calendar rejected a request or was unreachable.
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// Every credential in the pool failed for one logical call.
    #[error("All {attempts} API keys exhausted for this request")]
    KeysExhausted { attempts: usize },

    /// A second concurrent turn arrived for a user whose session is
    /// already being processed.
    #[error("Session for user '{user_id}' is busy")]
    SessionBusy { user_id: String },

    /// The reasoning-model collaborator failed in a way not attributable
    /// to a single credential.
    #[error("Reasoning model error: {0}")]
    Agent(String),

    /// Configuration error. The only fatal class: raised at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlatedError {
    /// Creates an UnparseablePhrase error
    pub fn unparseable(phrase: impl Into<String>) -> Self {
        Self::UnparseablePhrase {
            phrase: phrase.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Calendar error
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::Calendar(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Agent error
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is an UnparseablePhrase error
    pub fn is_unparseable(&self) -> bool {
        matches!(self, Self::UnparseablePhrase { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a Config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True for errors the workflow may surface to the user and continue;
    /// false only for `Config`, which aborts startup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for SlatedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<std::io::Error> for SlatedError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<String> for SlatedError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, SlatedError>`.
pub type Result<T> = std::result::Result<T, SlatedError>;
