/*!
 * Subtitle acquisition and content validation.
 *
 * - `validator`: corruption detection, timestamp cleaning, data validation
 * - `query`: normalized search queries
 * - `backend`: the scraping backend trait and shared HTTP client
 * - `backends`: built-in scraping backends
 * - `acquirer`: ordered multi-backend acquisition
 */

pub mod acquirer;
pub mod backend;
pub mod backends;
pub mod query;
pub mod validator;

pub use acquirer::{AcquisitionOutcome, AttemptRecord, AttemptResult, SubtitleAcquirer};
pub use backend::{ScrapeClient, SubtitleBackend};
pub use query::{SubtitleQuery, normalize_title};
pub use validator::{
    CleanedSubtitle, ContentValidator, DataValidationReport, SubtitleFormat, clean_subtitle_text, clean_timestamp,
    count_cues, detect_format, validate_for_analysis,
};
