/*!
 * Common test utilities for the screenwise test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use screenwise::analysis::{ConsistencyValidator, ContentAnalyzer};
use screenwise::app_config::LlmCommonConfig;
use screenwise::database::Repository;
use screenwise::metadata::{MovieMetadata, mock::StaticMetadataProvider};
use screenwise::pipeline::IngestionOrchestrator;
use screenwise::providers::mock::MockProvider;
use screenwise::rating::FlagPolicy;
use screenwise::subtitles::{ContentValidator, SubtitleAcquirer, SubtitleBackend};

pub mod mock_backends;

pub const TANGLED_ID: &str = "tt0398286";
pub const CARS_ID: &str = "tt0317219";

/// Route crate logs to the test output; honours RUST_LOG
pub fn init_test_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// SRT text with `cues` numbered cues, long enough to pass validation
pub fn sample_srt(cues: usize) -> String {
    (1..=cues)
        .map(|i| {
            format!(
                "{}\n00:{:02}:{:02},000 --> 00:{:02}:{:02},800\nLine number {} of a quiet conversation.\n",
                i,
                i / 60,
                i % 60,
                i / 60,
                i % 60,
                i
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// An HTML error page that scrapers sometimes get instead of subtitles
pub fn captcha_page() -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Just a moment</title></head><body>{}</body></html>",
        "Checking your browser before accessing the site. ".repeat(10)
    )
}

pub fn tangled() -> MovieMetadata {
    let mut metadata = MovieMetadata::new("Tangled", Some(2010));
    metadata.runtime_minutes = Some(100);
    metadata.genres = vec!["Animation".to_string(), "Family".to_string()];
    metadata
}

pub fn cars() -> MovieMetadata {
    MovieMetadata::new("Cars", Some(2006))
}

/// Metadata for Tangled and Cars
pub fn known_movies() -> StaticMetadataProvider {
    StaticMetadataProvider::new()
        .with_movie(TANGLED_ID, tangled())
        .with_movie(CARS_ID, cars())
}

pub fn fast_common_config() -> LlmCommonConfig {
    LlmCommonConfig {
        retry_count: 1,
        retry_delay_ms: 1,
        ..LlmCommonConfig::default()
    }
}

/// Orchestrator wired to in-memory fakes, with handles kept for assertions
pub struct Harness {
    pub orchestrator: IngestionOrchestrator,
    pub repo: Repository,
    pub metadata: StaticMetadataProvider,
    pub provider: MockProvider,
}

impl Harness {
    pub fn new(backends: Vec<Arc<dyn SubtitleBackend>>, provider: MockProvider) -> Result<Self> {
        Self::with_repo(Repository::new_in_memory()?, backends, provider)
    }

    /// Share an existing store, e.g. to swap the provider between runs
    pub fn with_repo(
        repo: Repository,
        backends: Vec<Arc<dyn SubtitleBackend>>,
        provider: MockProvider,
    ) -> Result<Self> {
        Self::with_metadata(repo, backends, provider, known_movies())
    }

    pub fn with_metadata(
        repo: Repository,
        backends: Vec<Arc<dyn SubtitleBackend>>,
        provider: MockProvider,
        metadata: StaticMetadataProvider,
    ) -> Result<Self> {
        init_test_logging();

        let acquirer = SubtitleAcquirer::new(
            backends,
            ContentValidator::default(),
            Duration::ZERO,
            Duration::from_secs(5),
        );
        let analyzer = ContentAnalyzer::new(
            Arc::new(provider.clone()),
            fast_common_config(),
            FlagPolicy::default(),
        );

        let orchestrator = IngestionOrchestrator::new(
            repo.clone(),
            Arc::new(metadata.clone()),
            acquirer,
            analyzer,
            ConsistencyValidator::default(),
            10,
        );

        Ok(Self {
            orchestrator,
            repo,
            metadata,
            provider,
        })
    }
}
