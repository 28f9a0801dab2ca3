/*!
 * Database entity models.
 *
 * These structures map directly to database tables. Scores and flags are kept
 * in their stored (raw) shape so the consistency audit can see out-of-range
 * values and missing keys exactly as persisted.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::rating::{AgeBucket, AgeFlag, AgeFlagVector, AgeScoreVector, Scene};
use crate::subtitles::SubtitleFormat;

/// Persisted workflow position of a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Validating,
    CheckingDuplicate,
    FetchingMetadata,
    CreatingRecord,
    AcquiringSubtitles,
    /// Paused until an operator uploads subtitles
    NeedsManualSubtitles,
    DataValidating,
    Analyzing,
    ValidatingAnalysis,
    Completed,
    /// Terminal; the failing step lives in `failure_step`
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Validating => "validating",
            WorkflowState::CheckingDuplicate => "checking_duplicate",
            WorkflowState::FetchingMetadata => "fetching_metadata",
            WorkflowState::CreatingRecord => "creating_record",
            WorkflowState::AcquiringSubtitles => "acquiring_subtitles",
            WorkflowState::NeedsManualSubtitles => "needs_manual_subtitles",
            WorkflowState::DataValidating => "data_validating",
            WorkflowState::Analyzing => "analyzing",
            WorkflowState::ValidatingAnalysis => "validating_analysis",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
        }
    }

    /// Whether the pipeline stops here without operator action
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Completed | WorkflowState::Failed | WorkflowState::NeedsManualSubtitles
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "validating" => Ok(WorkflowState::Validating),
            "checking_duplicate" => Ok(WorkflowState::CheckingDuplicate),
            "fetching_metadata" => Ok(WorkflowState::FetchingMetadata),
            "creating_record" => Ok(WorkflowState::CreatingRecord),
            "acquiring_subtitles" => Ok(WorkflowState::AcquiringSubtitles),
            "needs_manual_subtitles" => Ok(WorkflowState::NeedsManualSubtitles),
            "data_validating" => Ok(WorkflowState::DataValidating),
            "analyzing" => Ok(WorkflowState::Analyzing),
            "validating_analysis" => Ok(WorkflowState::ValidatingAnalysis),
            "completed" => Ok(WorkflowState::Completed),
            "failed" => Ok(WorkflowState::Failed),
            _ => Err(anyhow::anyhow!("Invalid workflow state: {}", s)),
        }
    }
}

/// Where a movie's current scores came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoresSource {
    /// Written by a completed analysis run
    Analysis,
    /// Written by the explicit repair tool
    HeuristicRepair,
}

impl fmt::Display for ScoresSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoresSource::Analysis => write!(f, "analysis"),
            ScoresSource::HeuristicRepair => write!(f, "heuristic_repair"),
        }
    }
}

impl std::str::FromStr for ScoresSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analysis" => Ok(ScoresSource::Analysis),
            "heuristic_repair" => Ok(ScoresSource::HeuristicRepair),
            _ => Err(anyhow::anyhow!("Invalid scores source: {}", s)),
        }
    }
}

/// Fields needed to create a movie row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub imdb_id: String,
    pub title: String,
    pub release_year: Option<i32>,
    pub runtime_minutes: Option<i32>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
}

/// Movie record from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Unique movie ID (UUID)
    pub id: String,
    /// Canonical catalog ID (`tt...`)
    pub imdb_id: String,
    pub title: String,
    pub release_year: Option<i32>,
    pub runtime_minutes: Option<i32>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    /// Stored scores in age order; `None` until the first analysis
    pub scores: Option<[i64; 4]>,
    pub scores_source: Option<ScoresSource>,
    pub has_subtitles: bool,
    pub has_scenes: bool,
    pub last_analyzed_at: Option<String>,
    pub workflow_state: WorkflowState,
    /// Step that failed when `workflow_state` is `Failed`
    pub failure_step: Option<WorkflowState>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MovieRecord {
    /// Stored scores as a typed vector, if present and in range
    pub fn age_scores(&self) -> Option<AgeScoreVector> {
        let raw = self.scores?;
        let mut scores = [0u8; 4];
        for (slot, value) in scores.iter_mut().zip(raw.iter()) {
            *slot = u8::try_from(*value).ok()?;
        }
        AgeScoreVector::try_new(scores).ok()
    }

    pub fn is_completed(&self) -> bool {
        self.workflow_state == WorkflowState::Completed
    }

    /// Human-readable one-line status
    pub fn status_line(&self) -> String {
        let scores = match self.scores {
            Some(s) => format!("{}/{}/{}/{}", s[0], s[1], s[2], s[3]),
            None => "-".to_string(),
        };
        let mut line = format!(
            "{} {} [{}] scores={} subtitles={} scenes={}",
            self.imdb_id, self.title, self.workflow_state, scores, self.has_subtitles, self.has_scenes
        );
        if let Some(step) = self.failure_step {
            line.push_str(&format!(" failed_at={}", step));
        }
        if let Some(reason) = &self.failure_reason {
            line.push_str(&format!(" reason=\"{}\"", reason));
        }
        line
    }
}

/// Subtitle record from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub id: i64,
    pub movie_id: String,
    /// Cleaned subtitle text
    pub text: String,
    /// Backend name or `manual`
    pub source: String,
    pub format: SubtitleFormat,
    pub content_hash: String,
    pub cue_count: i64,
    pub created_at: String,
}

/// Scene record from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: i64,
    pub movie_id: String,
    /// Order within the analysis
    pub position: i64,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub tags: Vec<String>,
    pub intensity: i64,
    /// Flags keyed by bucket name, as stored
    pub age_flags: BTreeMap<String, String>,
    pub created_at: String,
}

impl SceneRecord {
    /// Typed flag vector when all four canonical keys hold valid flags
    pub fn flag_vector(&self) -> Option<AgeFlagVector> {
        let mut flags = [AgeFlag::Caution; 4];
        for bucket in AgeBucket::ALL {
            flags[bucket.index()] = self.age_flags.get(bucket.as_str())?.parse().ok()?;
        }
        Some(AgeFlagVector::new(flags))
    }
}

/// Flag map in stored shape for a typed scene
pub fn stored_flags(scene: &Scene) -> BTreeMap<String, String> {
    scene
        .age_flags
        .iter()
        .map(|(bucket, flag)| (bucket.as_str().to_string(), flag.as_str().to_string()))
        .collect()
}

/// Append-only analysis history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRunRecord {
    /// Unique run ID (UUID)
    pub id: String,
    pub movie_id: String,
    pub created_at: String,
    pub scene_count: i64,
    pub scores: [i64; 4],
    /// Model identifier, or `heuristic-repair:<strategy>` for repairs
    pub model: String,
}

/// Summary counts for the status command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub movie_count: i64,
    pub completed_count: i64,
    pub paused_count: i64,
    pub failed_count: i64,
    pub scene_count: i64,
    pub run_count: i64,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Movies: {} (completed {}, awaiting subtitles {}, failed {}), Scenes: {}, Analysis runs: {}",
            self.movie_count,
            self.completed_count,
            self.paused_count,
            self.failed_count,
            self.scene_count,
            self.run_count
        )
    }
}
