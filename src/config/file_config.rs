use crate::extraction::LocationFilter;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub log_file: Option<String>,
    pub resume_path: Option<String>,
    pub profile: Option<String>,

    // Stage configs
    #[serde(alias = "search_criteria")]
    pub search: Option<SearchConfig>,
    pub scoring: Option<ScoringConfig>,
    pub ollama: Option<BackendConfig>,
    pub openrouter: Option<BackendConfig>,
    pub gemini: Option<BackendConfig>,
    pub google_sheet: Option<GoogleSheetConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub job_titles: Vec<String>,
    pub locations: Vec<LocationFilter>,
    pub salary_min: Option<u32>,
    pub job_types: Vec<String>,
    pub base_url: Option<String>,
    /// DevTools endpoint of the browser to attach to.
    pub cdp_url: Option<String>,
    /// Randomized pauses between actions.
    pub pacing: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    /// "ollama", "openrouter" or "gemini"
    pub backend: Option<String>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub empty_retry_delay_ms: Option<u64>,
    pub max_workers: Option<usize>,
}

/// Shared shape of the `[ollama]`, `[openrouter]` and `[gemini]` sections.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GoogleSheetConfig {
    pub credential_path: Option<String>,
    pub sheet_name: Option<String>,
    pub max_attempts: Option<u32>,
    pub rate_limit_backoff_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
