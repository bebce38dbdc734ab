//! OpenRouter chat-completions client.
//!
//! Direct REST implementation. Credentials are passed per call so the
//! rotation layer can try different keys for one logical request.

use crate::chat::ChatMessage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use slated_core::{Result, SlatedError};
use std::time::Duration;

const BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REFERER: &str = "https://slated.app";
const APP_TITLE: &str = "Slated";

/// One failed upstream call, classified by whether trying a different
/// credential could help.
#[derive(Debug, Clone)]
pub struct CallError {
    pub status_code: Option<u16>,
    pub message: String,
    /// Auth errors and rate limits are attributable to the credential;
    /// everything else is not worth burning the rest of the pool on.
    pub credential_fault: bool,
}

impl CallError {
    fn transport(message: String) -> Self {
        Self {
            status_code: None,
            message,
            credential_fault: false,
        }
    }
}

/// Low-level seam between the rotation layer and the HTTP client, so
/// rotation can be tested without a live endpoint.
#[async_trait]
pub trait RawChatClient: Send + Sync {
    async fn complete_raw(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> std::result::Result<String, CallError>;
}

/// Client for the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: Client,
    model: String,
    temperature: f32,
}

impl OpenRouterClient {
    /// Creates a client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an `Agent` error if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(model: impl Into<String>, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SlatedError::agent(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            model: model.into(),
            temperature,
        })
    }
}

#[async_trait]
impl RawChatClient for OpenRouterClient {
    async fn complete_raw(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> std::result::Result<String, CallError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                CallError::transport(format!("OpenRouter request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|err| {
            CallError::transport(format!("failed to parse OpenRouter response: {err}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CallError::transport("OpenRouter returned no choices".to_string()))
    }
}

fn map_http_error(status: StatusCode, body: String) -> CallError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let credential_fault = matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    CallError {
        status_code: Some(status.as_u16()),
        message,
        credential_fault,
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
