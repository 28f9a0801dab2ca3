/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a well-formed analysis
 * - `MockProvider::intermittent(n)` - Every nth request fails with a 503
 * - `MockProvider::failing()` - Always fails with a 500
 * - `MockProvider::rate_limited()` / `unauthorized()` - fixed 429 / 401
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails the first N requests with a 503, then succeeds
    FailFirst { failures: usize },
    /// Always fails with a 500
    Failing,
    /// Always answers 429
    RateLimited,
    /// Always answers 401
    Unauthorized,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing analysis behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Text returned on success
    response_text: String,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            response_text: Self::sample_analysis(6),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Return this text on success
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.response_text = text.into();
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Requests seen so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// A well-formed, internally consistent analysis reply with `scenes` scenes,
    /// wrapped in a fenced block the way chat models usually answer
    pub fn sample_analysis(scenes: usize) -> String {
        let scene_list = (0..scenes)
            .map(|i| {
                format!(
                    r#"{{"start_time": "00:{m:02}:00", "end_time": "00:{m:02}:45", "description": "Scene {n}: the villain chases the hero", "tags": ["peril"], "intensity": 3, "age_flags": {{"24m": "not_recommended", "36m": "caution", "48m": "caution", "60m": "appropriate"}}}}"#,
                    m = 10 + i * 5,
                    n = i + 1
                )
            })
            .collect::<Vec<_>>()
            .join(",\n    ");

        format!(
            "Here is the analysis:\n```json\n{{\n  \"overall_scores\": {{\"24m\": 4, \"36m\": 3, \"48m\": 2, \"60m\": 1}},\n  \"scenes\": [\n    {}\n  ]\n}}\n```",
            scene_list
        )
    }

    fn success(&self, request: &CompletionRequest) -> CompletionResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => self.response_text.clone(),
        };
        CompletionResponse {
            output_tokens: Some((text.len() / 4) as u64),
            input_tokens: Some((request.prompt.len() / 4) as u64),
            model: "mock-model".to_string(),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            response_text: self.response_text.clone(),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.success(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated outage (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited => Err(ProviderError::RateLimitExceeded("Simulated rate limit".to_string())),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Simulated bad key".to_string())),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                model: "mock-model".to_string(),
                input_tokens: Some(0),
                output_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.success(&request))
            }
        }
    }
}
