use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::analysis::{ConsistencyReport, RepairStrategy};
use crate::app_config::Config;
use crate::database::{AnalysisRunRecord, DatabaseConnection, MovieRecord, Repository};
use crate::errors::PipelineError;
use crate::pipeline::{IngestionOrchestrator, IngestionReport};

// @module: Application controller for batch ingestion and operator commands

/// Tallies for a batch ingestion
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub completed: usize,
    pub awaiting_subtitles: usize,
    pub duplicates: usize,
    pub failed: usize,
    // @field: Reports in input order
    pub reports: Vec<IngestionReport>,
}

impl BatchSummary {
    fn from_reports(reports: Vec<IngestionReport>) -> Self {
        let mut summary = Self::default();
        for report in &reports {
            if report.is_completed() {
                summary.completed += 1;
            } else if report.needs_manual_subtitles() {
                summary.awaiting_subtitles += 1;
            } else if report.is_duplicate() {
                summary.duplicates += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary.reports = reports;
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} awaiting subtitles, {} already ingested, {} failed",
            self.completed, self.awaiting_subtitles, self.duplicates, self.failed
        )
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Shared by every worker
    orchestrator: Arc<IngestionOrchestrator>,
}

impl Controller {
    // @method: Create a controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        let repo = Repository::new(DatabaseConnection::new(&db_path)?);
        let orchestrator = IngestionOrchestrator::from_config(&config, repo)
            .context("Failed to set up the ingestion pipeline")?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Create a controller around a prepared orchestrator
    pub fn with_orchestrator(config: Config, orchestrator: IngestionOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &IngestionOrchestrator {
        &self.orchestrator
    }

    /// Ingest many movies, each sequentially, several at a time
    pub async fn run_ingest(&self, identifiers: &[String], workers: Option<usize>) -> Result<BatchSummary> {
        if identifiers.is_empty() {
            return Err(anyhow!("No identifiers given"));
        }

        let start_time = std::time::Instant::now();
        let workers = workers.unwrap_or(self.config.workers.max_concurrent_movies).max(1);
        info!("Ingesting {} movie(s) with {} worker(s)", identifiers.len(), workers);

        let multi_progress = MultiProgress::new();
        let batch_pb = multi_progress.add(ProgressBar::new(identifiers.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} movies ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        batch_pb.set_style(template_result.progress_chars("█▓▒░"));
        batch_pb.set_message("Ingesting");

        let semaphore = Arc::new(Semaphore::new(workers));

        let mut results = stream::iter(identifiers.iter().enumerate())
            .map(|(index, raw)| {
                let orchestrator = self.orchestrator.clone();
                let semaphore = semaphore.clone();
                let batch_pb = batch_pb.clone();
                let raw = raw.clone();

                async move {
                    // Held for the whole movie: steps of one movie never overlap
                    let _permit = semaphore.acquire().await;
                    batch_pb.set_message(format!("Processing: {}", raw));

                    let report = orchestrator.ingest(&raw).await;
                    if report.is_error() {
                        batch_pb.println(format!("✗ {}", report));
                    } else {
                        batch_pb.println(format!("✓ {}", report));
                    }
                    batch_pb.inc(1);
                    (index, report)
                }
            })
            .buffer_unordered(workers)
            .collect::<Vec<_>>()
            .await;

        batch_pb.finish_with_message("Ingestion complete");

        results.sort_by_key(|(index, _)| *index);
        let summary = BatchSummary::from_reports(results.into_iter().map(|(_, report)| report).collect());

        info!(
            "Ingestion finished in {}: {}",
            Self::format_duration(start_time.elapsed()),
            summary
        );
        Ok(summary)
    }

    /// Upload subtitles from a file for a paused (or any) movie
    pub async fn upload(&self, reference: &str, file: &Path, source: Option<&str>) -> Result<IngestionReport> {
        let bytes = std::fs::read(file).with_context(|| format!("Failed to read subtitle file: {:?}", file))?;
        let text = String::from_utf8_lossy(&bytes);

        match self.orchestrator.upload_subtitles(reference, &text, source).await {
            Ok(report) => Ok(report),
            Err(e @ PipelineError::SubtitleCorrupted(_)) => {
                warn!("Subtitle file {:?} was rejected; the movie is unchanged", file);
                Err(anyhow!("{}. Please upload a different subtitle file.", e))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn retry(&self, reference: &str) -> Result<IngestionReport> {
        Ok(self.orchestrator.retry_step(reference).await?)
    }

    pub async fn restart(&self, reference: &str) -> Result<IngestionReport> {
        Ok(self.orchestrator.start_over(reference).await?)
    }

    pub async fn reanalyze(&self, reference: &str) -> Result<IngestionReport> {
        Ok(self.orchestrator.force_reanalyze(reference).await?)
    }

    /// Audit one or all movies; logs every report with violations
    pub async fn audit(&self, reference: Option<&str>) -> Result<Vec<ConsistencyReport>> {
        let reports = self.orchestrator.audit(reference).await?;
        let inconsistent = reports.iter().filter(|r| !r.is_consistent()).count();
        for report in reports.iter().filter(|r| !r.is_consistent()) {
            error!("{}", report);
        }
        info!("Audited {} movie(s), {} inconsistent", reports.len(), inconsistent);
        Ok(reports)
    }

    pub async fn repair_scores(&self, reference: &str, strategy: RepairStrategy) -> Result<AnalysisRunRecord> {
        Ok(self.orchestrator.repair_scores(reference, strategy).await?)
    }

    pub async fn status(&self, reference: Option<&str>) -> Result<Vec<MovieRecord>> {
        Ok(self.orchestrator.status(reference).await?)
    }

    /// Format a duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_secs = duration.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
