//! Text-generation client for Mnemo.
//!
//! Speaks the Ollama chat API over blocking HTTP: pull the configured model
//! if the server does not have it yet, then send the composed prompt as a
//! single user message. The rest of the pipeline only sees the
//! [`TextGenerator`] capability.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

const ERROR_BODY_PREVIEW_CHARS: usize = 240;

/// Enumerates supported `MnemoAiError` values.
#[derive(Debug, Error)]
pub enum MnemoAiError {
    #[error("model name must not be empty")]
    MissingModel,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation endpoint returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Capability contract consumed by the orchestrator: prompt in, text out.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, MnemoAiError>;
}

/// Public struct `OllamaConfig` used across Mnemo components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub api_base: String,
    pub model: String,
    pub request_timeout_ms: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
            request_timeout_ms: 120_000,
        }
    }
}

/// Public struct `OllamaClient` used across Mnemo components.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, MnemoAiError> {
        if config.model.trim().is_empty() {
            return Err(MnemoAiError::MissingModel);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self { client, config })
    }

    /// Pulls the configured model so generation does not fail on a cold
    /// server. Safe to call when the model is already present.
    pub fn pull_model(&self) -> Result<(), MnemoAiError> {
        let response = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&json!({
                "model": self.config.model,
                "stream": false,
            }))
            .send()?;
        if !response.status().is_success() {
            return Err(status_error(response));
        }
        tracing::debug!(model = self.config.model.as_str(), "generation model available");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }
}

impl TextGenerator for OllamaClient {
    /// Sends `prompt` as a single user chat message and returns the trimmed
    /// reply text.
    fn generate(&self, prompt: &str) -> Result<String, MnemoAiError> {
        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&json!({
                "model": self.config.model,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
                "stream": false,
            }))
            .send()?;
        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let payload = response.json::<Value>()?;
        let content = payload
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MnemoAiError::InvalidResponse("chat response missing message content".to_string())
            })?;
        Ok(content.trim().to_string())
    }
}

fn status_error(response: reqwest::blocking::Response) -> MnemoAiError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    MnemoAiError::HttpStatus {
        status,
        body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
    }
}
