/*!
 * Resumable ingestion state machine.
 *
 * Each movie moves through
 * `Validating -> CheckingDuplicate -> FetchingMetadata -> CreatingRecord ->
 * AcquiringSubtitles -> DataValidating -> Analyzing -> ValidatingAnalysis ->
 * Completed`, pausing in `NeedsManualSubtitles` when no backend yields
 * subtitles. Every transition after record creation is written to the
 * movie row, so any run can be resumed from the store alone.
 */

use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;

use super::state::{IngestionReport, WorkflowState};
use crate::analysis::{ConsistencyReport, ConsistencyValidator, ContentAnalyzer, RepairStrategy};
use crate::app_config::Config;
use crate::database::{AnalysisRunRecord, MovieRecord, Repository};
use crate::errors::PipelineError;
use crate::identifier::ImdbId;
use crate::metadata::{HttpMetadataClient, MetadataProvider};
use crate::providers::create_provider;
use crate::subtitles::{
    AcquisitionOutcome, CleanedSubtitle, SubtitleAcquirer, SubtitleQuery, validate_for_analysis,
};

/// Source label for operator-supplied subtitles
pub const MANUAL_SOURCE: &str = "manual";

/// Sequences the pipeline steps for one movie at a time
pub struct IngestionOrchestrator {
    repo: Repository,
    metadata: Arc<dyn MetadataProvider>,
    acquirer: SubtitleAcquirer,
    analyzer: ContentAnalyzer,
    consistency: ConsistencyValidator,
    min_cue_count: usize,
}

impl IngestionOrchestrator {
    pub fn new(
        repo: Repository,
        metadata: Arc<dyn MetadataProvider>,
        acquirer: SubtitleAcquirer,
        analyzer: ContentAnalyzer,
        consistency: ConsistencyValidator,
        min_cue_count: usize,
    ) -> Self {
        Self {
            repo,
            metadata,
            acquirer,
            analyzer,
            consistency,
            min_cue_count,
        }
    }

    /// Wire up the HTTP metadata client, scraping backends and LLM provider
    pub fn from_config(config: &Config, repo: Repository) -> Result<Self> {
        let metadata = Arc::new(HttpMetadataClient::from_config(&config.metadata)?);
        let acquirer = SubtitleAcquirer::from_config(&config.subtitles)?;
        let provider = create_provider(&config.llm)?;
        let analyzer = ContentAnalyzer::new(provider, config.llm.common.clone(), config.flag_policy.clone());

        Ok(Self::new(
            repo,
            metadata,
            acquirer,
            analyzer,
            ConsistencyValidator::new(config.flag_policy.clone()),
            config.subtitles.min_cue_count,
        ))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Ingest a movie from a raw identifier (URL or bare ID)
    pub async fn ingest(&self, raw: &str) -> IngestionReport {
        let mut report = IngestionReport::new(raw);

        report.enter(WorkflowState::Validating);
        let imdb_id = match ImdbId::resolve(raw) {
            Ok(id) => id,
            Err(e) => return self.fail_unpersisted(report, WorkflowState::Validating, e),
        };
        report.imdb_id = Some(imdb_id.to_string());
        info!("[{}] identifier resolved from '{}'", imdb_id, raw.trim());

        report.enter(WorkflowState::CheckingDuplicate);
        match self.repo.find_movie_by_imdb(imdb_id.as_str()).await {
            Ok(Some(existing)) => return Self::duplicate(report, &imdb_id, existing),
            Ok(None) => {}
            Err(e) => return self.fail_unpersisted(report, WorkflowState::CheckingDuplicate, e.into()),
        }

        report.enter(WorkflowState::FetchingMetadata);
        let metadata = match self.metadata.fetch(&imdb_id).await {
            Ok(metadata) => metadata,
            Err(e) => return self.fail_unpersisted(report, WorkflowState::FetchingMetadata, e),
        };
        report.title = Some(metadata.title.clone());

        report.enter(WorkflowState::CreatingRecord);
        let movie = match self.repo.insert_movie(&metadata.to_new_movie(&imdb_id)).await {
            Ok(movie) => movie,
            Err(e) => {
                // Another worker may have created the row since the duplicate check
                if let Ok(Some(existing)) = self.repo.find_movie_by_imdb(imdb_id.as_str()).await {
                    return Self::duplicate(report, &imdb_id, existing);
                }
                return self.fail_unpersisted(report, WorkflowState::CreatingRecord, e.into());
            }
        };
        info!("[{}] created record {} for '{}'", imdb_id, movie.id, movie.title);
        report.movie_id = Some(movie.id.clone());

        self.run_from(movie, WorkflowState::AcquiringSubtitles, report).await
    }

    /// Store operator-supplied subtitles and continue at data validation.
    ///
    /// Corrupt text is returned as `SubtitleCorrupted` and leaves the movie
    /// untouched so the operator can try again.
    pub async fn upload_subtitles(
        &self,
        reference: &str,
        text: &str,
        source: Option<&str>,
    ) -> Result<IngestionReport, PipelineError> {
        let movie = self.find_movie(reference).await?;
        let subtitle = CleanedSubtitle::prepare(text, self.acquirer.validator())?;
        let source = source.unwrap_or(MANUAL_SOURCE);

        self.repo.replace_subtitle(&movie.id, &subtitle, source).await?;
        info!(
            "[{}] stored {} subtitles from {} ({} cues)",
            movie.imdb_id, subtitle.format, source, subtitle.cue_count
        );

        let mut report = self.report_for(reference, &movie);
        report.subtitle_source = Some(source.to_string());
        Ok(self.run_from(movie, WorkflowState::DataValidating, report).await)
    }

    /// Re-enter the pipeline at the step implied by the stored data
    pub async fn retry_step(&self, reference: &str) -> Result<IngestionReport, PipelineError> {
        let movie = self.find_movie(reference).await?;
        let mut report = self.report_for(reference, &movie);

        let step = if movie.is_completed() {
            info!("[{}] already completed, nothing to retry", movie.imdb_id);
            report.enter(WorkflowState::Completed);
            report.scores = movie.age_scores();
            return Ok(report);
        } else if !movie.has_subtitles {
            WorkflowState::AcquiringSubtitles
        } else if !movie.has_scenes {
            WorkflowState::DataValidating
        } else {
            WorkflowState::ValidatingAnalysis
        };

        info!("[{}] retrying from {}", movie.imdb_id, step);
        Ok(self.run_from(movie, step, report).await)
    }

    /// Drop the scene set and analyze again
    pub async fn force_reanalyze(&self, reference: &str) -> Result<IngestionReport, PipelineError> {
        let movie = self.find_movie(reference).await?;
        let deleted = self.repo.delete_scenes(&movie.id).await?;
        info!("[{}] deleted {} scenes before re-analysis", movie.imdb_id, deleted);

        let report = self.report_for(reference, &movie);
        Ok(self.run_from(movie, WorkflowState::DataValidating, report).await)
    }

    /// Refresh metadata, clear subtitles, scenes, scores and status, and run
    /// again from subtitle acquisition. The movie row is kept.
    pub async fn start_over(&self, reference: &str) -> Result<IngestionReport, PipelineError> {
        let movie = self.find_movie(reference).await?;
        let imdb_id = ImdbId::resolve(&movie.imdb_id)?;
        let mut report = self.report_for(reference, &movie);

        report.enter(WorkflowState::FetchingMetadata);
        let metadata = match self.metadata.fetch(&imdb_id).await {
            Ok(metadata) => metadata,
            Err(e) => return Ok(self.fail(report, &movie, WorkflowState::FetchingMetadata, e).await),
        };
        self.repo.update_metadata(&movie.id, &metadata.to_new_movie(&imdb_id)).await?;
        self.repo.reset_movie(&movie.id).await?;
        info!("[{}] reset for a fresh run", movie.imdb_id);

        let movie = self.find_movie(&movie.id).await?;
        report.title = Some(movie.title.clone());
        Ok(self.run_from(movie, WorkflowState::AcquiringSubtitles, report).await)
    }

    /// Audit one movie, or every movie when `reference` is `None`
    pub async fn audit(&self, reference: Option<&str>) -> Result<Vec<ConsistencyReport>, PipelineError> {
        let movies = match reference {
            Some(reference) => vec![self.find_movie(reference).await?],
            None => self.repo.list_movies().await?,
        };

        let mut reports = Vec::with_capacity(movies.len());
        for movie in movies {
            let scenes = self.repo.get_scenes(&movie.id).await?;
            reports.push(self.consistency.check(&movie, &scenes));
        }
        Ok(reports)
    }

    /// Rebuild stored scores with a heuristic and label them as such
    pub async fn repair_scores(
        &self,
        reference: &str,
        strategy: RepairStrategy,
    ) -> Result<AnalysisRunRecord, PipelineError> {
        let movie = self.find_movie(reference).await?;
        let stored = movie.scores.ok_or_else(|| {
            PipelineError::DataValidation(format!("{} has no scores to repair", movie.imdb_id))
        })?;

        let repaired = strategy.apply(stored).map_err(PipelineError::SchemaInvariantViolation)?;
        warn!(
            "[{}] applying heuristic score repair {}: {:?} -> {}",
            movie.imdb_id,
            strategy,
            stored,
            repaired.summary()
        );

        Ok(self.repo.apply_repair(&movie.id, &repaired, strategy.as_str()).await?)
    }

    /// One movie, or all movies when `reference` is `None`
    pub async fn status(&self, reference: Option<&str>) -> Result<Vec<MovieRecord>, PipelineError> {
        match reference {
            Some(reference) => Ok(vec![self.find_movie(reference).await?]),
            None => Ok(self.repo.list_movies().await?),
        }
    }

    /// Find a movie by catalog ID, IMDb URL or internal ID
    pub async fn find_movie(&self, reference: &str) -> Result<MovieRecord, PipelineError> {
        let found = match ImdbId::resolve(reference) {
            Ok(imdb_id) => self.repo.find_movie_by_imdb(imdb_id.as_str()).await?,
            Err(_) => self.repo.get_movie(reference.trim()).await?,
        };
        found.ok_or_else(|| PipelineError::MovieNotFound(reference.to_string()))
    }

    // =========================================================================
    // Persisted Steps
    // =========================================================================

    async fn run_from(&self, movie: MovieRecord, start: WorkflowState, mut report: IngestionReport) -> IngestionReport {
        let mut state = start;

        loop {
            if let Err(e) = self.transition(&movie, state, &mut report).await {
                return self.fail(report, &movie, state, e).await;
            }

            let next = match state {
                WorkflowState::AcquiringSubtitles => self.acquire_subtitles(&movie, &mut report).await,
                WorkflowState::DataValidating => self.validate_data(&movie).await,
                WorkflowState::Analyzing => self.analyze(&movie, &mut report).await,
                WorkflowState::ValidatingAnalysis => self.validate_analysis(&movie, &mut report).await,
                terminal => {
                    info!("[{}] {}", movie.imdb_id, terminal);
                    return report;
                }
            };

            match next {
                Ok(next) => state = next,
                Err(e) => return self.fail(report, &movie, state, e).await,
            }
        }
    }

    async fn transition(
        &self,
        movie: &MovieRecord,
        state: WorkflowState,
        report: &mut IngestionReport,
    ) -> Result<(), PipelineError> {
        self.repo.set_workflow_state(&movie.id, state).await?;
        info!("[{}] -> {}", movie.imdb_id, state);
        report.enter(state);
        Ok(())
    }

    async fn acquire_subtitles(
        &self,
        movie: &MovieRecord,
        report: &mut IngestionReport,
    ) -> Result<WorkflowState, PipelineError> {
        let mut query = SubtitleQuery::new(&movie.title);
        if let Some(year) = movie.release_year {
            query = query.with_year(year);
        }
        if let Ok(id) = ImdbId::resolve(&movie.imdb_id) {
            query = query.with_imdb_id(id);
        }

        let outcome = self.acquirer.acquire(&query).await;
        report.subtitle_attempts = outcome.attempts().iter().map(|a| a.to_string()).collect();

        match outcome {
            AcquisitionOutcome::Found { subtitle, source, url, .. } => {
                self.repo.replace_subtitle(&movie.id, &subtitle, &source).await?;
                info!(
                    "[{}] subtitles from {} ({} cues) at {}",
                    movie.imdb_id, source, subtitle.cue_count, url
                );
                report.subtitle_source = Some(source);
                Ok(WorkflowState::DataValidating)
            }
            AcquisitionOutcome::NotFound { attempts } => {
                let reason = PipelineError::SubtitleNotFound(format!(
                    "{} after {} attempt(s)",
                    movie.imdb_id,
                    attempts.len()
                ));
                warn!("[{}] {}; waiting for manual upload", movie.imdb_id, reason);
                report.pause(WorkflowState::AcquiringSubtitles, &reason);
                Ok(WorkflowState::NeedsManualSubtitles)
            }
        }
    }

    async fn validate_data(&self, movie: &MovieRecord) -> Result<WorkflowState, PipelineError> {
        let subtitle = self
            .repo
            .get_subtitle(&movie.id)
            .await?
            .ok_or_else(|| PipelineError::DataValidation("no subtitles stored".to_string()))?;

        let check = validate_for_analysis(&subtitle.text, self.acquirer.validator(), self.min_cue_count);
        if !check.valid {
            return Err(PipelineError::DataValidation(
                check.reason.unwrap_or_else(|| "subtitles not usable".to_string()),
            ));
        }
        Ok(WorkflowState::Analyzing)
    }

    async fn analyze(&self, movie: &MovieRecord, report: &mut IngestionReport) -> Result<WorkflowState, PipelineError> {
        let subtitle = self
            .repo
            .get_subtitle(&movie.id)
            .await?
            .ok_or_else(|| PipelineError::DataValidation("no subtitles stored".to_string()))?;

        // Nothing is written unless the whole analysis normalized cleanly
        let outcome = self
            .analyzer
            .analyze(&movie.title, movie.release_year, &subtitle.text)
            .await?;
        let analysis = outcome.analysis;

        self.repo
            .replace_analysis(&movie.id, &analysis.overall_scores, &analysis.scenes, &outcome.model)
            .await?;

        report.scores = Some(analysis.overall_scores);
        report.scene_count = analysis.scenes.len();
        Ok(WorkflowState::ValidatingAnalysis)
    }

    async fn validate_analysis(
        &self,
        movie: &MovieRecord,
        report: &mut IngestionReport,
    ) -> Result<WorkflowState, PipelineError> {
        let stored = self
            .repo
            .get_movie(&movie.id)
            .await?
            .ok_or_else(|| PipelineError::MovieNotFound(movie.id.clone()))?;
        let scenes = self.repo.get_scenes(&movie.id).await?;

        let check = self.consistency.check(&stored, &scenes);
        for warning in &check.warnings {
            warn!("[{}] {}", movie.imdb_id, warning);
        }

        report.scores = stored.age_scores();
        report.scene_count = scenes.len();
        let consistent = check.is_consistent();
        let summary = check.violation_summary();
        report.consistency = Some(check);

        if !consistent {
            return Err(PipelineError::ConsistencyViolation(summary));
        }
        Ok(WorkflowState::Completed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn report_for(&self, reference: &str, movie: &MovieRecord) -> IngestionReport {
        let mut report = IngestionReport::new(reference);
        report.imdb_id = Some(movie.imdb_id.clone());
        report.movie_id = Some(movie.id.clone());
        report.title = Some(movie.title.clone());
        report
    }

    /// Stop with the duplicate signal, pointing at the stored movie
    fn duplicate(mut report: IngestionReport, imdb_id: &ImdbId, existing: MovieRecord) -> IngestionReport {
        info!("[{}] already ingested as '{}' ({})", imdb_id, existing.title, existing.id);
        report.movie_id = Some(existing.id.clone());
        report.title = Some(existing.title.clone());
        report.fail(
            WorkflowState::CheckingDuplicate,
            &PipelineError::DuplicateMovie {
                movie_id: existing.id,
                title: existing.title,
            },
        );
        report
    }

    /// Record a failure on the movie row and in the report
    async fn fail(
        &self,
        mut report: IngestionReport,
        movie: &MovieRecord,
        step: WorkflowState,
        e: PipelineError,
    ) -> IngestionReport {
        error!("[{}] failed at {}: {}", movie.imdb_id, step, e);
        if let Err(persist) = self.repo.mark_failed(&movie.id, step, &e.to_string()).await {
            error!("[{}] could not record failure: {:#}", movie.imdb_id, persist);
        }
        report.fail(step, &e);
        report
    }

    /// Failure before a movie row exists
    fn fail_unpersisted(&self, mut report: IngestionReport, step: WorkflowState, e: PipelineError) -> IngestionReport {
        error!("[{}] failed at {}: {}", report.input.trim(), step, e);
        report.fail(step, &e);
        report
    }
}
