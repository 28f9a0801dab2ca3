/*!
 * Tests for error classification
 */

use screenwise::errors::{PipelineError, ProviderError};

#[test]
fn test_providerError_fromStatus_shouldClassifyByCode() {
    assert!(matches!(ProviderError::from_status(429, "slow down"), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(ProviderError::from_status(401, "bad key"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(500, "boom"), ProviderError::ApiError { status_code: 500, .. }));
}

#[test]
fn test_providerError_isTransient_shouldOnlyCoverRetryableFailures() {
    assert!(ProviderError::from_status(503, "").is_transient());
    assert!(ProviderError::from_status(429, "").is_transient());
    assert!(ProviderError::Timeout(30).is_transient());
    assert!(ProviderError::ConnectionError("reset".to_string()).is_transient());

    assert!(!ProviderError::from_status(400, "").is_transient());
    assert!(!ProviderError::from_status(403, "").is_transient());
    assert!(!ProviderError::ParseError("bad json".to_string()).is_transient());
}

#[test]
fn test_pipelineError_kind_shouldBeStableSnakeCase() {
    let cases = [
        (PipelineError::InvalidIdentifier("x".into()), "invalid_identifier"),
        (PipelineError::SubtitleCorrupted("x".into()), "subtitle_corrupted"),
        (PipelineError::SchemaInvariantViolation("x".into()), "schema_invariant_violation"),
        (PipelineError::ConsistencyViolation("x".into()), "consistency_violation"),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind);
    }
}

#[test]
fn test_pipelineError_duplicate_shouldNameExistingRecord() {
    let error = PipelineError::DuplicateMovie {
        movie_id: "abc".to_string(),
        title: "Tangled".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("Tangled"));
    assert!(message.contains("abc"));
    assert!(!error.is_retryable());
}

#[test]
fn test_pipelineError_isRetryable_shouldCoverUpstreamFailures() {
    assert!(PipelineError::MetadataUnavailable("down".into()).is_retryable());
    assert!(PipelineError::AnalysisUnavailable("down".into()).is_retryable());
    assert!(!PipelineError::MalformedAnalysisResponse("prose".into()).is_retryable());
    assert!(!PipelineError::InvalidIdentifier("nope".into()).is_retryable());
}
