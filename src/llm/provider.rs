//! Text generation backend trait definition.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Options shared by every backend request.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Errors that can occur when interacting with a backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Missing credentials: environment variable {0} is not set")]
    MissingCredentials(&'static str),
}

impl LlmError {
    /// Worth retrying the same request.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connection(_)
            | LlmError::RateLimited
            | LlmError::Timeout
            | LlmError::InvalidResponse(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Serialization(_) | LlmError::MissingCredentials(_) => false,
        }
    }

    /// The backend refuses every request: bad or missing credentials.
    pub fn is_fatal(&self) -> bool {
        match self {
            LlmError::MissingCredentials(_) => true,
            LlmError::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Connection(e.to_string())
        }
    }

    pub(crate) async fn from_status(response: reqwest::Response) -> Self {
        let status = response.status();
        if status.as_u16() == 429 {
            return LlmError::RateLimited;
        }
        let body = response.text().await.unwrap_or_default();
        LlmError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

/// A text generation backend.
///
/// Implementations send a single user prompt and hand back the model's raw
/// text. `Ok(None)` means the backend answered with nothing usable (no
/// choices, empty content); callers treat it as transient.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider's name (e.g., "ollama", "gemini").
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError>;
}

/// `None` for blank model output.
pub(crate) fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
