/*!
 * Workflow reports.
 *
 * `WorkflowState` is persisted on the movie row; an `IngestionReport`
 * describes what one pipeline run did to it.
 */

use serde::Serialize;
use std::fmt;

use crate::analysis::ConsistencyReport;
use crate::errors::PipelineError;
use crate::rating::AgeScoreVector;

pub use crate::database::WorkflowState;

/// Why and where a run stopped short
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: WorkflowState,
    /// Machine-friendly error kind
    pub kind: String,
    pub reason: String,
    /// Whether retrying the step later may succeed
    pub retryable: bool,
}

impl StepFailure {
    pub fn new(step: WorkflowState, error: &PipelineError) -> Self {
        Self {
            step,
            kind: error.kind().to_string(),
            reason: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Existing record found by the duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRef {
    pub movie_id: String,
    pub title: String,
}

/// Outcome of one pipeline run for one movie
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    /// Raw identifier or movie reference the run started from
    pub input: String,
    pub imdb_id: Option<String>,
    pub movie_id: Option<String>,
    pub title: Option<String>,
    /// States entered, in order
    pub transitions: Vec<WorkflowState>,
    pub final_state: WorkflowState,
    pub failure: Option<StepFailure>,
    pub duplicate_of: Option<DuplicateRef>,
    /// Why the run is waiting for an operator, set only on a pause
    pub paused_by: Option<StepFailure>,
    /// Subtitle backend log, one line per attempt
    pub subtitle_attempts: Vec<String>,
    pub subtitle_source: Option<String>,
    pub scores: Option<AgeScoreVector>,
    pub scene_count: usize,
    pub consistency: Option<ConsistencyReport>,
}

impl IngestionReport {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            imdb_id: None,
            movie_id: None,
            title: None,
            transitions: Vec::new(),
            final_state: WorkflowState::Validating,
            failure: None,
            duplicate_of: None,
            paused_by: None,
            subtitle_attempts: Vec::new(),
            subtitle_source: None,
            scores: None,
            scene_count: 0,
            consistency: None,
        }
    }

    pub(crate) fn enter(&mut self, state: WorkflowState) {
        self.transitions.push(state);
        self.final_state = state;
    }

    pub(crate) fn fail(&mut self, step: WorkflowState, error: &PipelineError) {
        self.failure = Some(StepFailure::new(step, error));
        self.final_state = WorkflowState::Failed;
        if let PipelineError::DuplicateMovie { movie_id, title } = error {
            self.duplicate_of = Some(DuplicateRef {
                movie_id: movie_id.clone(),
                title: title.clone(),
            });
        }
    }

    pub(crate) fn pause(&mut self, step: WorkflowState, error: &PipelineError) {
        self.paused_by = Some(StepFailure::new(step, error));
    }

    pub fn is_completed(&self) -> bool {
        self.final_state == WorkflowState::Completed
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }

    pub fn needs_manual_subtitles(&self) -> bool {
        self.final_state == WorkflowState::NeedsManualSubtitles
    }

    /// Failed for a reason other than the duplicate signal
    pub fn is_error(&self) -> bool {
        self.final_state == WorkflowState::Failed && !self.is_duplicate()
    }
}

impl fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match (&self.title, &self.imdb_id) {
            (Some(title), Some(id)) => format!("{} ({})", title, id),
            (None, Some(id)) => id.clone(),
            _ => self.input.clone(),
        };

        match (&self.final_state, &self.failure, &self.duplicate_of) {
            (_, _, Some(dup)) => write!(f, "{}: already ingested as '{}' ({})", name, dup.title, dup.movie_id),
            (WorkflowState::Completed, _, _) => {
                write!(f, "{}: completed", name)?;
                if let Some(scores) = &self.scores {
                    write!(f, ", scores {}, {} scenes", scores.summary(), self.scene_count)?;
                }
                Ok(())
            }
            (WorkflowState::NeedsManualSubtitles, _, _) => {
                match &self.paused_by {
                    Some(pause) => write!(f, "{}: {}, waiting for manual upload", name, pause.reason)?,
                    None => write!(f, "{}: no subtitles found, waiting for manual upload", name)?,
                }
                for attempt in &self.subtitle_attempts {
                    write!(f, "\n  {}", attempt)?;
                }
                Ok(())
            }
            (_, Some(failure), _) => write!(f, "{}: failed at {}: {}", name, failure.step, failure.reason),
            (state, None, _) => write!(f, "{}: stopped at {}", name, state),
        }
    }
}
