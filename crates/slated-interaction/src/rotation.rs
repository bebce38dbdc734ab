//! Credential rotation over the reasoning-model client.
//!
//! Each logical call picks a random starting key and walks the pool
//! round-robin from there, so load spreads across keys without any
//! shared selection state. A key is retried-around only for failures
//! attributable to that key (auth, rate limit); once every key has been
//! tried for one call, the call fails with `KeysExhausted` exactly once.

use crate::chat::{ChatAgent, ChatMessage, ChatOutcome};
use crate::openrouter::RawChatClient;
use crate::outcome::parse_outcome;
use async_trait::async_trait;
use rand::Rng;
use slated_core::{Result, SlatedError};
use std::sync::Arc;

/// Wraps a raw client with round-robin/random key selection and
/// retry-on-failure across the credential pool.
pub struct KeyRotationClient {
    inner: Arc<dyn RawChatClient>,
    keys: Vec<String>,
}

impl KeyRotationClient {
    /// # Errors
    ///
    /// Returns a fatal `Config` error for an empty key pool.
    pub fn new(inner: Arc<dyn RawChatClient>, keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(SlatedError::config(
                "key rotation requires at least one API key",
            ));
        }
        Ok(Self { inner, keys })
    }

    pub fn pool_size(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl ChatAgent for KeyRotationClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatOutcome> {
        let pool = self.keys.len();
        let start = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..pool)
        };

        for attempt in 0..pool {
            let index = (start + attempt) % pool;
            match self.inner.complete_raw(&self.keys[index], messages).await {
                Ok(content) => return Ok(parse_outcome(&content)),
                Err(err) if err.credential_fault => {
                    tracing::warn!(
                        "[KeyRotation] Key {}/{} failed ({}), trying next",
                        index + 1,
                        pool,
                        err.status_code
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "no status".to_string()),
                    );
                }
                Err(err) => {
                    return Err(SlatedError::agent(err.message));
                }
            }
        }

        tracing::error!("[KeyRotation] All {} keys exhausted for this call", pool);
        Err(SlatedError::KeysExhausted { attempts: pool })
    }
}
