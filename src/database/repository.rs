/*!
 * Repository layer for database operations.
 *
 * High-level, typed access to movies, subtitles, scenes and analysis runs.
 * Multi-row writes (subtitle replacement, analysis persistence, resets,
 * repairs) each run in one transaction.
 */

use anyhow::{Context, Result, anyhow};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;

use super::connection::DatabaseConnection;
use super::models::{
    AnalysisRunRecord, DatabaseStats, MovieRecord, NewMovie, SceneRecord, ScoresSource,
    SubtitleRecord, WorkflowState, stored_flags,
};
use crate::rating::{AgeScoreVector, Scene};
use crate::subtitles::{CleanedSubtitle, SubtitleFormat};

const MOVIE_COLUMNS: &str = "id, imdb_id, title, release_year, runtime_minutes, genres, overview, \
     score_24m, score_36m, score_48m, score_60m, scores_source, has_subtitles, has_scenes, \
     last_analyzed_at, workflow_state, failure_step, failure_reason, created_at, updated_at";

const SCENE_COLUMNS: &str =
    "id, movie_id, position, start_time, end_time, description, tags, intensity, age_flags, created_at";

const RUN_COLUMNS: &str =
    "id, movie_id, created_at, scene_count, score_24m, score_36m, score_48m, score_60m, model";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Movie Operations
    // =========================================================================

    /// Insert a new movie in the `creating_record` state
    pub async fn insert_movie(&self, movie: &NewMovie) -> Result<MovieRecord> {
        let movie = movie.clone();
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO movies (
                        id, imdb_id, title, release_year, runtime_minutes, genres, overview,
                        workflow_state, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                    "#,
                    params![
                        id,
                        movie.imdb_id,
                        movie.title,
                        movie.release_year,
                        movie.runtime_minutes,
                        serde_json::to_string(&movie.genres)?,
                        movie.overview,
                        WorkflowState::CreatingRecord.to_string(),
                        now,
                    ],
                )
                .with_context(|| format!("Failed to insert movie {}", movie.imdb_id))?;

                Self::get_movie_sync(conn, &id)?
                    .ok_or_else(|| anyhow!("Movie {} vanished after insert", id))
            })
            .await
    }

    /// Get a movie by its internal ID
    pub async fn get_movie(&self, movie_id: &str) -> Result<Option<MovieRecord>> {
        let movie_id = movie_id.to_string();
        self.db
            .execute_async(move |conn| Self::get_movie_sync(conn, &movie_id))
            .await
    }

    /// Find a movie by canonical catalog ID
    pub async fn find_movie_by_imdb(&self, imdb_id: &str) -> Result<Option<MovieRecord>> {
        let imdb_id = imdb_id.to_string();
        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM movies WHERE imdb_id = ?1", MOVIE_COLUMNS);
                Ok(conn.query_row(&sql, [imdb_id], movie_from_row).optional()?)
            })
            .await
    }

    /// Get a movie by ID (synchronous version for use within transactions)
    fn get_movie_sync(conn: &Connection, movie_id: &str) -> Result<Option<MovieRecord>> {
        let sql = format!("SELECT {} FROM movies WHERE id = ?1", MOVIE_COLUMNS);
        Ok(conn.query_row(&sql, [movie_id], movie_from_row).optional()?)
    }

    /// List all movies, most recently updated first
    pub async fn list_movies(&self) -> Result<Vec<MovieRecord>> {
        self.db
            .execute_async(|conn| {
                let sql = format!("SELECT {} FROM movies ORDER BY updated_at DESC, title", MOVIE_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let movies = stmt
                    .query_map([], movie_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(movies)
            })
            .await
    }

    /// Overwrite catalog metadata (used by start over)
    pub async fn update_metadata(&self, movie_id: &str, movie: &NewMovie) -> Result<()> {
        let movie_id = movie_id.to_string();
        let movie = movie.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE movies
                    SET title = ?1, release_year = ?2, runtime_minutes = ?3, genres = ?4,
                        overview = ?5, updated_at = ?6
                    WHERE id = ?7
                    "#,
                    params![
                        movie.title,
                        movie.release_year,
                        movie.runtime_minutes,
                        serde_json::to_string(&movie.genres)?,
                        movie.overview,
                        now,
                        movie_id,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Record a workflow transition, clearing any previous failure
    pub async fn set_workflow_state(&self, movie_id: &str, state: WorkflowState) -> Result<()> {
        let movie_id = movie_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE movies
                    SET workflow_state = ?1, failure_step = NULL, failure_reason = NULL, updated_at = ?2
                    WHERE id = ?3
                    "#,
                    params![state.to_string(), now, movie_id],
                )?;
                if updated == 0 {
                    return Err(anyhow!("No movie with id {}", movie_id));
                }
                Ok(())
            })
            .await
    }

    /// Mark a movie failed at `step` with a reason
    pub async fn mark_failed(&self, movie_id: &str, step: WorkflowState, reason: &str) -> Result<()> {
        let movie_id = movie_id.to_string();
        let reason = reason.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE movies
                    SET workflow_state = ?1, failure_step = ?2, failure_reason = ?3, updated_at = ?4
                    WHERE id = ?5
                    "#,
                    params![
                        WorkflowState::Failed.to_string(),
                        step.to_string(),
                        reason,
                        now,
                        movie_id
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Remove subtitles and scenes and clear scores and status.
    /// The movie row and its analysis history stay.
    pub async fn reset_movie(&self, movie_id: &str) -> Result<()> {
        let movie_id = movie_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                tx.execute("DELETE FROM subtitles WHERE movie_id = ?1", [&movie_id])?;
                tx.execute("DELETE FROM scenes WHERE movie_id = ?1", [&movie_id])?;
                tx.execute(
                    r#"
                    UPDATE movies
                    SET score_24m = NULL, score_36m = NULL, score_48m = NULL, score_60m = NULL,
                        scores_source = NULL, has_subtitles = 0, has_scenes = 0,
                        last_analyzed_at = NULL, workflow_state = ?1, failure_step = NULL,
                        failure_reason = NULL, updated_at = ?2
                    WHERE id = ?3
                    "#,
                    params![WorkflowState::AcquiringSubtitles.to_string(), now, movie_id],
                )?;
                debug!("Reset movie {}", movie_id);
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Subtitle Operations
    // =========================================================================

    /// Replace the movie's subtitle wholesale
    pub async fn replace_subtitle(
        &self,
        movie_id: &str,
        subtitle: &CleanedSubtitle,
        source: &str,
    ) -> Result<SubtitleRecord> {
        let movie_id = movie_id.to_string();
        let subtitle = subtitle.clone();
        let source = source.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                tx.execute("DELETE FROM subtitles WHERE movie_id = ?1", [&movie_id])?;
                tx.execute(
                    r#"
                    INSERT INTO subtitles (movie_id, text, source, format, content_hash, cue_count, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        movie_id,
                        subtitle.text,
                        source,
                        subtitle.format.to_string(),
                        subtitle.content_hash,
                        subtitle.cue_count as i64,
                        now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.execute(
                    "UPDATE movies SET has_subtitles = 1, updated_at = ?1 WHERE id = ?2",
                    params![now, movie_id],
                )?;

                Ok(SubtitleRecord {
                    id,
                    movie_id,
                    text: subtitle.text,
                    source,
                    format: subtitle.format,
                    content_hash: subtitle.content_hash,
                    cue_count: subtitle.cue_count as i64,
                    created_at: now,
                })
            })
            .await
    }

    /// Get the movie's subtitle, if any
    pub async fn get_subtitle(&self, movie_id: &str) -> Result<Option<SubtitleRecord>> {
        let movie_id = movie_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, movie_id, text, source, format, content_hash, cue_count, created_at
                        FROM subtitles WHERE movie_id = ?1
                        "#,
                        [movie_id],
                        |row| {
                            Ok(SubtitleRecord {
                                id: row.get(0)?,
                                movie_id: row.get(1)?,
                                text: row.get(2)?,
                                source: row.get(3)?,
                                format: row
                                    .get::<_, String>(4)?
                                    .parse()
                                    .unwrap_or(SubtitleFormat::Text),
                                content_hash: row.get(5)?,
                                cue_count: row.get(6)?,
                                created_at: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    // =========================================================================
    // Scene Operations
    // =========================================================================

    /// Scenes for a movie in analysis order
    pub async fn get_scenes(&self, movie_id: &str) -> Result<Vec<SceneRecord>> {
        let movie_id = movie_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM scenes WHERE movie_id = ?1 ORDER BY position",
                    SCENE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let scenes = stmt
                    .query_map([movie_id], scene_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(scenes)
            })
            .await
    }

    /// Drop every scene of a movie and clear its scene flag
    pub async fn delete_scenes(&self, movie_id: &str) -> Result<usize> {
        let movie_id = movie_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let deleted = tx.execute("DELETE FROM scenes WHERE movie_id = ?1", [&movie_id])?;
                tx.execute(
                    "UPDATE movies SET has_scenes = 0, updated_at = ?1 WHERE id = ?2",
                    params![now, movie_id],
                )?;
                Ok(deleted)
            })
            .await
    }

    /// Persist a completed analysis: replace scenes, update scores and status,
    /// append a run. All or nothing.
    pub async fn replace_analysis(
        &self,
        movie_id: &str,
        scores: &AgeScoreVector,
        scenes: &[Scene],
        model: &str,
    ) -> Result<AnalysisRunRecord> {
        let movie_id = movie_id.to_string();
        let scores = *scores;
        let scenes = scenes.to_vec();
        let model = model.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                tx.execute("DELETE FROM scenes WHERE movie_id = ?1", [&movie_id])?;

                {
                    let mut stmt = tx.prepare(
                        r#"
                        INSERT INTO scenes (
                            movie_id, position, start_time, end_time, description, tags,
                            intensity, age_flags, created_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        "#,
                    )?;
                    for (position, scene) in scenes.iter().enumerate() {
                        stmt.execute(params![
                            movie_id,
                            position as i64,
                            scene.start_time.to_string(),
                            scene.end_time.to_string(),
                            scene.description,
                            serde_json::to_string(&scene.tags)?,
                            scene.intensity as i64,
                            serde_json::to_string(&stored_flags(scene))?,
                            now,
                        ])?;
                    }
                }

                Self::write_scores(tx, &movie_id, &scores, ScoresSource::Analysis, &now)?;
                tx.execute(
                    r#"
                    UPDATE movies
                    SET has_scenes = ?1, last_analyzed_at = ?2
                    WHERE id = ?3
                    "#,
                    params![!scenes.is_empty(), now, movie_id],
                )?;

                Self::append_run_sync(tx, &movie_id, &scores, scenes.len() as i64, &model, &now)
            })
            .await
    }

    // =========================================================================
    // Score Repair
    // =========================================================================

    /// Write repaired scores labeled as heuristic and append a run for them
    pub async fn apply_repair(
        &self,
        movie_id: &str,
        scores: &AgeScoreVector,
        strategy: &str,
    ) -> Result<AnalysisRunRecord> {
        let movie_id = movie_id.to_string();
        let scores = *scores;
        let model = format!("heuristic-repair:{}", strategy);
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                Self::write_scores(tx, &movie_id, &scores, ScoresSource::HeuristicRepair, &now)?;
                let scene_count: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM scenes WHERE movie_id = ?1",
                    [&movie_id],
                    |row| row.get(0),
                )?;
                Self::append_run_sync(tx, &movie_id, &scores, scene_count, &model, &now)
            })
            .await
    }

    fn write_scores(
        conn: &Connection,
        movie_id: &str,
        scores: &AgeScoreVector,
        source: ScoresSource,
        now: &str,
    ) -> Result<()> {
        let [s24, s36, s48, s60] = scores.as_array();
        let updated = conn.execute(
            r#"
            UPDATE movies
            SET score_24m = ?1, score_36m = ?2, score_48m = ?3, score_60m = ?4,
                scores_source = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
            params![s24, s36, s48, s60, source.to_string(), now, movie_id],
        )?;
        if updated == 0 {
            return Err(anyhow!("No movie with id {}", movie_id));
        }
        Ok(())
    }

    // =========================================================================
    // Analysis History
    // =========================================================================

    fn append_run_sync(
        conn: &Connection,
        movie_id: &str,
        scores: &AgeScoreVector,
        scene_count: i64,
        model: &str,
        now: &str,
    ) -> Result<AnalysisRunRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let [s24, s36, s48, s60] = scores.as_array();
        conn.execute(
            &format!(
                "INSERT INTO analysis_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                RUN_COLUMNS
            ),
            params![id, movie_id, now, scene_count, s24, s36, s48, s60, model],
        )?;

        Ok(AnalysisRunRecord {
            id,
            movie_id: movie_id.to_string(),
            created_at: now.to_string(),
            scene_count,
            scores: [s24 as i64, s36 as i64, s48 as i64, s60 as i64],
            model: model.to_string(),
        })
    }

    /// Analysis runs for a movie, oldest first
    pub async fn list_runs(&self, movie_id: &str) -> Result<Vec<AnalysisRunRecord>> {
        let movie_id = movie_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM analysis_runs WHERE movie_id = ?1 ORDER BY created_at, rowid",
                    RUN_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let runs = stmt
                    .query_map([movie_id], |row| {
                        Ok(AnalysisRunRecord {
                            id: row.get(0)?,
                            movie_id: row.get(1)?,
                            created_at: row.get(2)?,
                            scene_count: row.get(3)?,
                            scores: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
                            model: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(runs)
            })
            .await
    }

    /// Summary counts
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.stats())
            .await
            .context("Database task panicked")?
    }
}

fn movie_from_row(row: &Row) -> rusqlite::Result<MovieRecord> {
    let scores: [Option<i64>; 4] = [row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?];
    let scores = match scores {
        [Some(a), Some(b), Some(c), Some(d)] => Some([a, b, c, d]),
        _ => None,
    };

    Ok(MovieRecord {
        id: row.get(0)?,
        imdb_id: row.get(1)?,
        title: row.get(2)?,
        release_year: row.get(3)?,
        runtime_minutes: row.get(4)?,
        genres: serde_json::from_str(&row.get::<_, String>(5)?).unwrap_or_default(),
        overview: row.get(6)?,
        scores,
        scores_source: row
            .get::<_, Option<String>>(11)?
            .and_then(|s| s.parse().ok()),
        has_subtitles: row.get(12)?,
        has_scenes: row.get(13)?,
        last_analyzed_at: row.get(14)?,
        workflow_state: row
            .get::<_, String>(15)?
            .parse()
            .unwrap_or(WorkflowState::Failed),
        failure_step: row
            .get::<_, Option<String>>(16)?
            .and_then(|s| s.parse().ok()),
        failure_reason: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn scene_from_row(row: &Row) -> rusqlite::Result<SceneRecord> {
    // A corrupt flag column reads as empty so the audit reports missing keys
    let age_flags: BTreeMap<String, String> =
        serde_json::from_str(&row.get::<_, String>(8)?).unwrap_or_default();

    Ok(SceneRecord {
        id: row.get(0)?,
        movie_id: row.get(1)?,
        position: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        description: row.get(5)?,
        tags: serde_json::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
        intensity: row.get(7)?,
        age_flags,
        created_at: row.get(9)?,
    })
}
