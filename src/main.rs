// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use screenwise::analysis::RepairStrategy;
use screenwise::app_config::{Config, LlmProvider, LogLevel};
use screenwise::app_controller::Controller;
use screenwise::rating::AgeBucket;

/// CLI wrapper for LlmProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLlmProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliLlmProvider> for LlmProvider {
    fn from(cli_provider: CliLlmProvider) -> Self {
        match cli_provider {
            CliLlmProvider::Ollama => LlmProvider::Ollama,
            CliLlmProvider::OpenAI => LlmProvider::OpenAI,
            CliLlmProvider::Anthropic => LlmProvider::Anthropic,
            CliLlmProvider::LMStudio => LlmProvider::LMStudio,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliRepairStrategy {
    InferFromAnchor,
    ClampMonotonic,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest one or more movies by IMDb ID or URL
    Ingest {
        /// IMDb IDs (tt1234567) or IMDb title URLs
        #[arg(value_name = "ID", required = true)]
        identifiers: Vec<String>,

        /// Movies processed at the same time
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Upload a subtitle file for a movie and resume its analysis
    Upload {
        /// IMDb ID, IMDb URL or internal movie ID
        #[arg(value_name = "ID")]
        id: String,

        /// Subtitle file (SRT or plain timestamped text)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Source label recorded with the subtitles
        #[arg(long)]
        source: Option<String>,
    },

    /// Retry the step a movie failed at
    Retry {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Re-fetch metadata and run the whole pipeline again
    Restart {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Discard scenes and analyze the stored subtitles again
    Reanalyze {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Check stored ratings for consistency (all movies when no ID is given)
    Audit {
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Rebuild a movie's score vector with a heuristic
    RepairScores {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(long, value_enum)]
        strategy: CliRepairStrategy,

        /// Bucket kept as-is by infer-from-anchor (24m, 36m, 48m or 60m)
        #[arg(long, default_value = "36m")]
        anchor: String,
    },

    /// Show workflow status (all movies when no ID is given)
    Status {
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Generate shell completions for screenwise
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Screenwise - age-appropriateness ratings for movies
///
/// Resolves a movie, fetches its metadata and subtitles, asks an LLM to rate
/// it for children aged 24 to 60 months and stores the result.
#[derive(Parser, Debug)]
#[command(name = "screenwise")]
#[command(version)]
#[command(about = "Movie age-appropriateness ingestion pipeline")]
#[command(long_about = "Screenwise ingests movies by IMDb ID, finds their subtitles and rates \
them for young children with an LLM.

EXAMPLES:
    screenwise ingest tt0398286 tt2294629        # Ingest two movies
    screenwise ingest -w 8 $(cat ids.txt)        # Ingest a list with 8 workers
    screenwise upload tt0398286 tangled.srt      # Provide subtitles by hand
    screenwise retry tt0398286                   # Retry the failed step
    screenwise audit                             # Check every stored rating
    screenwise repair-scores tt0398286 --strategy clamp-monotonic
    screenwise completions bash > screenwise.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// LLM provider to use for analysis
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliLlmProvider>,

    /// Model name to use for analysis
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the LLM provider
    #[arg(long, global = true, env = "SCREENWISE_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// API key for the metadata service
    #[arg(long, global = true, env = "SCREENWISE_METADATA_API_KEY", hide_env_values = true)]
    metadata_api_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger; the effective level is log::max_level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => "",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded; the level is raised or lowered afterwards
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "screenwise", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

/// Load the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&cli.config))?;

    if let Some(provider) = &cli.provider {
        config.llm.provider = provider.clone().into();
    }
    if let Some(model) = &cli.model {
        config.llm.active_provider_config_mut().model = model.clone();
    }
    if let Some(key) = cli.llm_api_key.as_ref().filter(|k| !k.is_empty()) {
        config.llm.active_provider_config_mut().api_key = key.clone();
    }
    if let Some(key) = cli.metadata_api_key.as_ref().filter(|k| !k.is_empty()) {
        config.metadata.api_key = key.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", cli.config.display()))?;

    info!(
        "Using {} with model {}",
        config.llm.provider.display_name(),
        config.llm.get_model()
    );
    Ok(config)
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest { identifiers, workers } => {
            let summary = controller.run_ingest(&identifiers, workers).await?;
            for report in &summary.reports {
                println!("{}", report);
            }
            println!("{}", summary);
            if summary.failed > 0 {
                return Err(anyhow!("{} movie(s) failed", summary.failed));
            }
        }
        Commands::Upload { id, file, source } => {
            let report = controller.upload(&id, &file, source.as_deref()).await?;
            println!("{}", report);
        }
        Commands::Retry { id } => {
            println!("{}", controller.retry(&id).await?);
        }
        Commands::Restart { id } => {
            println!("{}", controller.restart(&id).await?);
        }
        Commands::Reanalyze { id } => {
            println!("{}", controller.reanalyze(&id).await?);
        }
        Commands::Audit { id } => {
            let reports = controller.audit(id.as_deref()).await?;
            for report in &reports {
                println!("{}", report);
            }
            let inconsistent = reports.iter().filter(|r| !r.is_consistent()).count();
            if inconsistent > 0 {
                return Err(anyhow!("{} movie(s) have inconsistent ratings", inconsistent));
            }
        }
        Commands::RepairScores { id, strategy, anchor } => {
            let anchor = AgeBucket::from_canonical(anchor.trim())
                .ok_or_else(|| anyhow!("Unknown age bucket '{}' (expected 24m, 36m, 48m or 60m)", anchor))?;
            let strategy = match strategy {
                CliRepairStrategy::InferFromAnchor => RepairStrategy::InferFromAnchor { anchor },
                CliRepairStrategy::ClampMonotonic => RepairStrategy::ClampMonotonic,
            };
            let run = controller.repair_scores(&id, strategy).await?;
            let s = run.scores;
            println!(
                "Repaired {} with {}: scores {}/{}/{}/{} (run {})",
                id, strategy, s[0], s[1], s[2], s[3], run.id
            );
        }
        Commands::Status { id } => {
            let movies = controller.status(id.as_deref()).await?;
            if movies.is_empty() {
                println!("No movies stored");
            }
            for movie in &movies {
                println!("{}", movie.status_line());
            }
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}
