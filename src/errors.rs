/*!
 * Error types for the screenwise pipeline.
 *
 * `ProviderError` covers the HTTP level of LLM and scraping calls, while
 * `PipelineError` is the taxonomy surfaced by the ingestion workflow. Both use
 * the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an external HTTP service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not finish within its timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Build an error from a non-success HTTP status and its body
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => Self::RateLimitExceeded(message),
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Map a reqwest transport error onto the provider taxonomy
    pub fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Whether a retry after a fixed delay may succeed (429, 5xx, network, timeout)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) | Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::RequestFailed(_) | Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors and signals raised by the ingestion pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The raw identifier did not match any known catalog ID pattern
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The movie already exists; carries the existing record's reference
    #[error("Movie already exists: {title} ({movie_id})")]
    DuplicateMovie {
        /// Existing movie ID
        movie_id: String,
        /// Existing movie title
        title: String,
    },

    /// Metadata provider returned non-2xx or a malformed body
    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// No backend produced acceptable subtitles
    #[error("Subtitles not found for {0}")]
    SubtitleNotFound(String),

    /// Candidate subtitle text was rejected by the content validator
    #[error("Subtitle content rejected: {0}")]
    SubtitleCorrupted(String),

    /// Stored data is not usable for analysis
    #[error("Data validation failed: {0}")]
    DataValidation(String),

    /// The LLM could not be reached after bounded retries
    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// The LLM reply contained no parseable JSON object
    #[error("Malformed analysis response: {0}")]
    MalformedAnalysisResponse(String),

    /// The normalized analysis broke a structural invariant
    #[error("Schema invariant violation: {0}")]
    SchemaInvariantViolation(String),

    /// The persisted analysis failed the consistency check
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// No movie record matches the reference
    #[error("Movie not found: {0}")]
    MovieNotFound(String),

    /// Error from the persistence layer, propagated verbatim
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// Whether re-invoking the same step later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AnalysisUnavailable(_) | Self::MetadataUnavailable(_) | Self::Persistence(_)
        )
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::DuplicateMovie { .. } => "duplicate_movie",
            Self::MetadataUnavailable(_) => "metadata_unavailable",
            Self::SubtitleNotFound(_) => "subtitle_not_found",
            Self::SubtitleCorrupted(_) => "subtitle_corrupted",
            Self::DataValidation(_) => "data_validation",
            Self::AnalysisUnavailable(_) => "analysis_unavailable",
            Self::MalformedAnalysisResponse(_) => "malformed_analysis_response",
            Self::SchemaInvariantViolation(_) => "schema_invariant_violation",
            Self::ConsistencyViolation(_) => "consistency_violation",
            Self::MovieNotFound(_) => "movie_not_found",
            Self::Persistence(_) => "persistence",
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Persistence(format!("{:#}", error))
    }
}
