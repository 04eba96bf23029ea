//! Text generation backends.
//!
//! The scoring engine only depends on [`LlmProvider`]; which concrete backend
//! it gets is decided once, from configuration, by [`create_provider`].

mod gemini;
mod ollama;
mod openrouter;
mod provider;

pub use gemini::{
    extract_json_block, GeminiProvider, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL,
    GEMINI_API_KEY_ENV,
};
pub use ollama::{strip_thinking, OllamaProvider, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
pub use openrouter::{
    OpenRouterProvider, DEFAULT_OPENROUTER_MODEL, DEFAULT_OPENROUTER_URL, OPENROUTER_API_KEY_ENV,
};
pub use provider::{GenerationOptions, LlmError, LlmProvider};

use anyhow::bail;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ollama,
    OpenRouter,
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::OpenRouter => "openrouter",
            BackendKind::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::Ollama => DEFAULT_OLLAMA_MODEL,
            BackendKind::OpenRouter => DEFAULT_OPENROUTER_MODEL,
            BackendKind::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Ollama => DEFAULT_OLLAMA_URL,
            BackendKind::OpenRouter => DEFAULT_OPENROUTER_URL,
            BackendKind::Gemini => DEFAULT_GEMINI_URL,
        }
    }

    /// Environment variable holding the API key, if the backend needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            BackendKind::Ollama => None,
            BackendKind::OpenRouter => Some(OPENROUTER_API_KEY_ENV),
            BackendKind::Gemini => Some(GEMINI_API_KEY_ENV),
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "openrouter" => Ok(BackendKind::OpenRouter),
            "gemini" => Ok(BackendKind::Gemini),
            other => bail!(
                "Unsupported scoring backend '{}' (expected ollama, openrouter or gemini)",
                other
            ),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved settings for the selected backend.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub model: String,
    pub base_url: String,
    pub options: GenerationOptions,
}

impl BackendSettings {
    pub fn with_defaults(kind: BackendKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            options: GenerationOptions::default(),
        }
    }
}

/// Build the configured backend, reading its API key from the environment.
pub fn create_provider(settings: &BackendSettings) -> Result<Arc<dyn LlmProvider>, LlmError> {
    create_provider_with_env(settings, |name| std::env::var(name).ok())
}

/// Like [`create_provider`], with a custom environment lookup.
pub fn create_provider_with_env(
    settings: &BackendSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = match settings.kind.api_key_env() {
        Some(var) => Some(
            env(var)
                .filter(|key| !key.trim().is_empty())
                .ok_or(LlmError::MissingCredentials(var))?,
        ),
        None => None,
    };

    let provider: Arc<dyn LlmProvider> = match settings.kind {
        BackendKind::Ollama => Arc::new(OllamaProvider::new(
            &settings.base_url,
            &settings.model,
            settings.options.clone(),
        )),
        BackendKind::OpenRouter => Arc::new(OpenRouterProvider::new(
            &settings.base_url,
            &settings.model,
            api_key.unwrap_or_default(),
            settings.options.clone(),
        )),
        BackendKind::Gemini => Arc::new(GeminiProvider::new(
            &settings.base_url,
            &settings.model,
            api_key.unwrap_or_default(),
            settings.options.clone(),
        )),
    };

    info!(
        "Scoring backend: {} (model {}, temperature {})",
        provider.name(),
        provider.model(),
        settings.options.temperature
    );
    Ok(provider)
}
