/*!
 * # Screenwise - age-appropriateness ratings for movies
 *
 * A Rust library that ingests movies by IMDb identifier and rates how
 * suitable they are for children aged 24, 36, 48 and 60 months.
 *
 * ## Features
 *
 * - Resolve IMDb IDs and title URLs to a canonical identifier
 * - Fetch movie metadata from an HTTP metadata service
 * - Acquire subtitles from an ordered list of scraping backends, with manual
 *   upload as a fallback
 * - Analyze subtitles with an LLM provider:
 *   - Ollama (local LLM)
 *   - OpenAI API (and LM Studio)
 *   - Anthropic API
 * - Normalize and audit the resulting per-age scores and scene flags
 * - Persist every step in SQLite so movies can be retried or restarted
 *
 * ## Architecture
 *
 * - `identifier`: IMDb identifier resolution
 * - `rating`: age buckets, score and flag vectors, scenes and the flag policy
 * - `metadata`: metadata provider trait and HTTP client
 * - `subtitles`: content validation and backend-driven acquisition
 * - `providers`: LLM provider clients
 * - `analysis`: prompt building, response normalization, consistency audit
 *   and score repair
 * - `database`: SQLite schema, records and repository
 * - `pipeline`: the per-movie ingestion state machine
 * - `app_config`: configuration management
 * - `app_controller`: batch ingestion and operator commands
 * - `errors`: error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod analysis;
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod identifier;
pub mod metadata;
pub mod pipeline;
pub mod providers;
pub mod rating;
pub mod subtitles;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchSummary, Controller};
pub use errors::{PipelineError, ProviderError};
pub use identifier::ImdbId;
pub use pipeline::{IngestionOrchestrator, IngestionReport, WorkflowState};
pub use rating::{AgeBucket, AgeFlag, AgeScoreVector};
