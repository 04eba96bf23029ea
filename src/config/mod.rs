mod file_config;

pub use file_config::{
    BackendConfig, FileConfig, GoogleSheetConfig, ScoringConfig, SearchConfig,
};

use crate::extraction::SearchCriteria;
use crate::llm::{BackendKind, BackendSettings};
use crate::scoring::{RetryPolicy, ScoringSettings};
use crate::sheets::SyncSettings;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "db/job_matches.sqlite";
pub const DEFAULT_BASE_URL: &str = "https://ca.indeed.com";
pub const DEFAULT_CDP_URL: &str = "http://localhost:9222";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub backend: Option<String>,
    pub no_pacing: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub resume_path: Option<PathBuf>,
    pub profile: String,

    // Stage settings (with defaults)
    pub search: SearchSettings,
    pub scoring: ScoringSettings,
    backend_name: Option<String>,
    backend_sections: BackendSections,

    // Only needed by sync-sheet
    pub google_sheet: Option<SheetSettings>,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub criteria: SearchCriteria,
    pub base_url: String,
    pub cdp_url: String,
    pub pacing: bool,
}

/// Per-backend sections, resolved only by the command that scores.
#[derive(Debug, Clone, Default)]
struct BackendSections {
    ollama: Option<BackendConfig>,
    openrouter: Option<BackendConfig>,
    gemini: Option<BackendConfig>,
}

#[derive(Debug, Clone)]
pub struct SheetSettings {
    pub credential_path: PathBuf,
    pub sheet_name: String,
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let log_file = file
            .log_file
            .map(PathBuf::from)
            .or_else(|| cli.log_file.clone());
        let resume_path = file.resume_path.map(PathBuf::from);
        let profile = file.profile.unwrap_or_default();

        let search_file = file.search.unwrap_or_default();
        let search = SearchSettings {
            criteria: SearchCriteria {
                job_titles: search_file.job_titles,
                locations: search_file.locations,
                salary_min: search_file.salary_min,
                job_types: search_file.job_types,
            },
            base_url: search_file
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cdp_url: search_file
                .cdp_url
                .unwrap_or_else(|| DEFAULT_CDP_URL.to_string()),
            pacing: search_file.pacing.unwrap_or(!cli.no_pacing),
        };

        let scoring_file = file.scoring.unwrap_or_default();
        let backend_name = scoring_file.backend.or_else(|| cli.backend.clone());
        let defaults = ScoringSettings::default();
        let scoring = ScoringSettings {
            batch_size: scoring_file.batch_size.unwrap_or(defaults.batch_size),
            retry: RetryPolicy::new(
                scoring_file
                    .max_retries
                    .unwrap_or(defaults.retry.max_attempts),
                scoring_file
                    .empty_retry_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.empty_retry_delay),
            ),
            max_workers: scoring_file.max_workers,
        };
        if scoring.batch_size == 0 {
            bail!("scoring.batch_size must be greater than zero");
        }
        let backend_sections = BackendSections {
            ollama: file.ollama,
            openrouter: file.openrouter,
            gemini: file.gemini,
        };

        let google_sheet = match file.google_sheet {
            Some(sheet) => {
                let credential_path = sheet
                    .credential_path
                    .map(PathBuf::from)
                    .context("google_sheet.credential_path must be specified")?;
                let sheet_name = sheet
                    .sheet_name
                    .filter(|name| !name.trim().is_empty())
                    .context("google_sheet.sheet_name must be specified")?;
                let sync_defaults = SyncSettings::default();
                Some(SheetSettings {
                    credential_path,
                    sheet_name,
                    sync: SyncSettings {
                        max_attempts: sheet.max_attempts.unwrap_or(sync_defaults.max_attempts),
                        rate_limit_backoff: sheet
                            .rate_limit_backoff_secs
                            .map(Duration::from_secs)
                            .unwrap_or(sync_defaults.rate_limit_backoff),
                    },
                })
            }
            None => None,
        };

        Ok(Self {
            db_path,
            log_file,
            resume_path,
            profile,
            search,
            scoring,
            backend_name,
            backend_sections,
            google_sheet,
        })
    }

    /// Load the TOML file (when given) and resolve it against the CLI.
    pub fn load(cli: &CliConfig, config_path: Option<&Path>) -> Result<Self> {
        let file_config = config_path.map(FileConfig::load).transpose()?;
        Self::resolve(cli, file_config)
    }

    /// Make sure the database's directory exists, creating it when asked to.
    pub fn ensure_db_dir(&self, create: bool) -> Result<()> {
        let Some(dir) = self
            .db_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        else {
            return Ok(());
        };
        if dir.is_dir() {
            return Ok(());
        }
        if dir.exists() {
            bail!("Database directory is not a directory: {:?}", dir);
        }
        if !create {
            bail!(
                "Database directory does not exist: {:?} (run init-db first)",
                dir
            );
        }
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {:?}", dir))
    }

    pub fn sheet(&self) -> Result<&SheetSettings> {
        self.google_sheet
            .as_ref()
            .context("[google_sheet] section with credential_path and sheet_name is required")
    }

    /// Settings of the selected scoring backend, Ollama unless configured.
    pub fn backend(&self) -> Result<BackendSettings> {
        let kind: BackendKind = match &self.backend_name {
            Some(name) => name.parse()?,
            None => BackendKind::Ollama,
        };
        let section = match kind {
            BackendKind::Ollama => &self.backend_sections.ollama,
            BackendKind::OpenRouter => &self.backend_sections.openrouter,
            BackendKind::Gemini => &self.backend_sections.gemini,
        }
        .clone()
        .unwrap_or_default();

        let mut backend = BackendSettings::with_defaults(kind);
        if let Some(model) = section.model {
            backend.model = model;
        }
        if let Some(base_url) = section.base_url {
            backend.base_url = base_url;
        }
        if let Some(temperature) = section.temperature {
            backend.options.temperature = temperature;
        }
        backend.options.max_tokens = section.max_tokens;
        if let Some(timeout_secs) = section.timeout_secs {
            backend.options.timeout = Duration::from_secs(timeout_secs);
        }
        Ok(backend)
    }

    pub fn resume_dir(&self) -> Result<&Path> {
        self.resume_path
            .as_deref()
            .context("resume_path must be specified in the config file")
    }
}
