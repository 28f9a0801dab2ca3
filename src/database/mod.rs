/*!
 * Database module for persistent storage of movies and their analyses.
 *
 * This module provides SQLite-based persistence for:
 * - Movies with explicit per-movie workflow status
 * - The subtitle chosen for each movie
 * - Scenes and the append-only analysis run history
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{
    AnalysisRunRecord, DatabaseStats, MovieRecord, NewMovie, SceneRecord, ScoresSource,
    SubtitleRecord, WorkflowState,
};
pub use repository::Repository;
