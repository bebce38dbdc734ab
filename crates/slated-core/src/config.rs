//! Process-wide configuration model.
//!
//! Loaded once at startup (see `slated-infrastructure`), immutable
//! afterwards. Every knob the core consumes lives here.

use crate::error::{Result, SlatedError};
use chrono_tz::Tz;
use std::time::Duration;

/// Default canonical zone for all time resolution.
pub const DEFAULT_TIME_ZONE: &str = "Asia/Kolkata";
/// Default reasoning model served through OpenRouter.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
/// Low fixed sampling temperature for deterministic tool-call output.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Cap on Reason/Act iterations per incoming message.
pub const DEFAULT_MAX_ITERATIONS: usize = 6;
/// Bound on each external call (calendar and reasoning model).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Sessions idle beyond this are eligible for eviction.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// OAuth2 credentials for the external calendar collaborator.
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Canonical IANA zone all ranges are normalized into.
    pub time_zone: Tz,
    /// Calendar to operate on.
    pub calendar_id: String,
    /// Reasoning model identifier.
    pub model: String,
    /// Sampling temperature for the reasoning model.
    pub temperature: f32,
    /// Reason/Act loop bound per message.
    pub max_iterations: usize,
    /// Timeout applied to every external call.
    pub request_timeout: Duration,
    /// Idle TTL after which a session may be evicted.
    pub session_ttl: Duration,
    /// Credential pool for the reasoning model. Immutable after load.
    pub api_keys: Vec<String>,
    pub google: GoogleCredentials,
}

impl AssistantConfig {
    /// Validates invariants that must hold for the process to serve:
    /// a non-empty key pool, a calendar id, and a sane loop bound.
    ///
    /// # Errors
    ///
    /// Returns a fatal `Config` error; configuration failures are the
    /// only error class that aborts startup.
    pub fn validate(&self) -> Result<()> {
        if self.api_keys.is_empty() {
            return Err(SlatedError::config("no API keys configured"));
        }
        if self.api_keys.iter().any(|key| key.trim().is_empty()) {
            return Err(SlatedError::config("API key pool contains an empty entry"));
        }
        if self.calendar_id.trim().is_empty() {
            return Err(SlatedError::config("calendar id is not set"));
        }
        if self.max_iterations == 0 {
            return Err(SlatedError::config("max_iterations must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(SlatedError::config("request timeout must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AssistantConfig {
        AssistantConfig {
            time_zone: DEFAULT_TIME_ZONE.parse().unwrap(),
            calendar_id: "primary".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            api_keys: vec!["key-1".to_string()],
            google: GoogleCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "refresh".to_string(),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn empty_key_pool_is_fatal() {
        let mut config = config();
        config.api_keys.clear();
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn zero_iteration_cap_is_rejected() {
        let mut config = config();
        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }
}
