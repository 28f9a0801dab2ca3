/*!
 * Movie store schema and version check.
 *
 * Movies own their subtitle, scenes and analysis runs. Scores live in four
 * nullable columns so a movie without analysis has no scores at all.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create the tables on a fresh store and check the version of an existing one
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Foreign keys are a per-connection setting
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    match get_schema_version(conn)? {
        0 => {
            info!("Creating movie store schema v{}", SCHEMA_VERSION);
            create_all_tables(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        SCHEMA_VERSION => {
            debug!("Movie store schema is v{}", SCHEMA_VERSION);
            Ok(())
        }
        other => Err(anyhow!(
            "Movie store has schema v{} but this build understands v{}",
            other,
            SCHEMA_VERSION
        )),
    }
}

/// Stored schema version, 0 for a fresh store
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let has_table: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Cannot read the movie store catalog")?;
    if !has_table {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()?;
    Ok(version.unwrap_or(0))
}

pub fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL is ignored for in-memory databases
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            id TEXT PRIMARY KEY,
            imdb_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            release_year INTEGER,
            runtime_minutes INTEGER,
            genres TEXT NOT NULL DEFAULT '[]',
            overview TEXT,
            score_24m INTEGER,
            score_36m INTEGER,
            score_48m INTEGER,
            score_60m INTEGER,
            scores_source TEXT,
            has_subtitles INTEGER NOT NULL DEFAULT 0,
            has_scenes INTEGER NOT NULL DEFAULT 0,
            last_analyzed_at TEXT,
            workflow_state TEXT NOT NULL DEFAULT 'creating_record',
            failure_step TEXT,
            failure_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_movies_state ON movies(workflow_state);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subtitles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            movie_id TEXT NOT NULL UNIQUE REFERENCES movies(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            source TEXT NOT NULL,
            format TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            cue_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scenes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            movie_id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            description TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            intensity INTEGER NOT NULL,
            age_flags TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(movie_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_scenes_movie ON scenes(movie_id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_runs (
            id TEXT PRIMARY KEY,
            movie_id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            scene_count INTEGER NOT NULL,
            score_24m INTEGER NOT NULL,
            score_36m INTEGER NOT NULL,
            score_48m INTEGER NOT NULL,
            score_60m INTEGER NOT NULL,
            model TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_runs_movie ON analysis_runs(movie_id, created_at);
        "#,
    )?;

    Ok(())
}
