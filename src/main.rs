use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jobscout::browser::CdpPage;
use jobscout::cli_style::{
    get_styles, print_error, print_scoring_summary, print_search_summary, print_stats,
    print_success, print_sync_summary, print_warning,
};
use jobscout::extraction::{JobSearcher, Pacer};
use jobscout::llm::create_provider;
use jobscout::resume::load_resume_text;
use jobscout::scoring::JobScorer;
use jobscout::sheets::{GoogleWorksheet, SheetSync};
use jobscout::{AppConfig, CliConfig, JobStore, SqliteJobStore};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_FILE: &str = "jobscout.toml";
const CDP_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "jobscout", styles = get_styles())]
#[command(about = "Collect job postings, score them against your resume, and sync them to a spreadsheet")]
struct CliArgs {
    /// Path to the TOML config file. Defaults to ./jobscout.toml when present.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite job database.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Also append logs to this file.
    #[clap(long, value_parser = parse_path)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates the job database, or upgrades an existing one.
    InitDb,

    /// Runs every configured search in an attached browser and stores new postings.
    SearchJobs {
        /// Skip the randomized pauses between browser actions.
        #[clap(long)]
        no_pacing: bool,
    },

    /// Scores every unscored posting against the resume and profile.
    ScoreJobs {
        /// Scoring backend (ollama, openrouter, gemini).
        #[clap(long)]
        backend: Option<String>,
    },

    /// Mirrors the job table into the configured spreadsheet.
    SyncSheet,

    /// Shows how many postings are stored, unscored and waiting to be synced.
    Stats,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")
}

fn load_config(cli_args: &CliArgs) -> Result<AppConfig> {
    let (no_pacing, backend) = match &cli_args.command {
        Command::SearchJobs { no_pacing } => (*no_pacing, None),
        Command::ScoreJobs { backend } => (false, backend.clone()),
        _ => (false, None),
    };
    let cli = CliConfig {
        db_path: cli_args.db_path.clone(),
        log_file: cli_args.log_file.clone(),
        backend,
        no_pacing,
    };

    let config_path = cli_args.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });
    AppConfig::load(&cli, config_path.as_deref())
}

fn open_store(config: &AppConfig) -> Result<Arc<SqliteJobStore>> {
    config.ensure_db_dir(false)?;
    info!("Opening job database at {:?}...", config.db_path);
    Ok(Arc::new(SqliteJobStore::new(&config.db_path)?))
}

fn run_init_db(config: &AppConfig) -> Result<()> {
    config.ensure_db_dir(true)?;
    info!("Initializing job database at {:?}...", config.db_path);
    SqliteJobStore::new(&config.db_path)?;
    print_success(&format!("Job database ready at {}", config.db_path.display()));
    Ok(())
}

async fn run_search_jobs(config: &AppConfig) -> Result<()> {
    let criteria = config.search.criteria.clone();
    if criteria.pair_count() == 0 {
        bail!("No searches configured: [search] needs at least one job title and one location");
    }
    let store = open_store(config)?;

    info!("Attaching to browser at {}", config.search.cdp_url);
    let page = CdpPage::attach(&config.search.cdp_url, CDP_COMMAND_TIMEOUT)
        .await
        .with_context(|| {
            format!(
                "Failed to attach to a browser at {}; is it running with remote debugging enabled?",
                config.search.cdp_url
            )
        })?;

    let searcher = JobSearcher::new(
        Arc::new(page),
        store,
        criteria,
        config.search.base_url.clone(),
        Pacer::new(config.search.pacing),
    );
    let summary = searcher.run().await;
    print_search_summary(&summary);
    if summary.pairs_searched == 0 {
        bail!("Every search failed");
    }
    Ok(())
}

async fn run_score_jobs(config: &AppConfig) -> Result<()> {
    let resume_dir = config.resume_dir()?;
    let resume_text = load_resume_text(resume_dir)?;
    if resume_text.trim().is_empty() {
        bail!("Failed to extract any resume text from {:?}", resume_dir);
    }
    if config.profile.trim().is_empty() {
        warn!("No profile configured, scoring with the resume alone");
    }

    let store = open_store(config)?;
    let backend = config.backend()?;
    let provider = create_provider(&backend)
        .with_context(|| format!("Failed to set up scoring backend {}", backend.kind))?;

    let scorer = JobScorer::new(store, provider, config.scoring.clone());
    let summary = scorer.run(&config.profile, &resume_text).await?;
    print_scoring_summary(&summary);
    if summary.failed > 0 {
        print_warning(&format!(
            "{} jobs could not be scored and remain unscored",
            summary.failed
        ));
    }
    Ok(())
}

async fn run_sync_sheet(config: &AppConfig) -> Result<()> {
    let sheet = config.sheet()?;
    let store = open_store(config)?;

    let worksheet = GoogleWorksheet::open(&sheet.credential_path, &sheet.sheet_name)
        .await
        .with_context(|| format!("Failed to open spreadsheet '{}'", sheet.sheet_name))?;

    let sync = SheetSync::new(store, Arc::new(worksheet), sheet.sync.clone());
    let summary = sync.run().await?;
    print_sync_summary(&summary);
    Ok(())
}

fn run_stats(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.get_stats()?;
    print_stats(&config.db_path.display().to_string(), &stats);
    Ok(())
}

async fn run(cli_args: CliArgs) -> Result<()> {
    let config = load_config(&cli_args)?;
    init_logging(config.log_file.as_deref())?;

    match cli_args.command {
        Command::InitDb => run_init_db(&config),
        Command::SearchJobs { .. } => run_search_jobs(&config).await,
        Command::ScoreJobs { .. } => run_score_jobs(&config).await,
        Command::SyncSheet => run_sync_sheet(&config).await,
        Command::Stats => run_stats(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = CliArgs::parse();

    match run(cli_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
