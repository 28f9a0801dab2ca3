/*!
 * Content analyzer: one LLM call per movie, with bounded retries.
 *
 * Transient provider failures (429, 5xx, connection errors, timeouts) are
 * retried after a fixed delay up to `retry_count` times. Any other provider
 * error ends the attempt immediately. A reply that cannot be parsed or
 * normalized is never retried.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::normalizer::{NormalizedAnalysis, normalize};
use super::prompt::{build_request, truncate_subtitles};
use super::response::extract_json_object;
use crate::app_config::LlmCommonConfig;
use crate::errors::{PipelineError, ProviderError};
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::rating::FlagPolicy;

/// Successful analysis with call details
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: NormalizedAnalysis,
    /// Model reported by the provider
    pub model: String,
    /// Whether the subtitle text was cut to fit
    pub truncated: bool,
    /// Provider calls made, including the successful one
    pub attempts: u32,
}

/// Sends subtitles to the LLM and turns the reply into a canonical analysis
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    provider: Arc<dyn Provider>,
    common: LlmCommonConfig,
    policy: FlagPolicy,
}

impl ContentAnalyzer {
    pub fn new(provider: Arc<dyn Provider>, common: LlmCommonConfig, policy: FlagPolicy) -> Self {
        Self {
            provider,
            common,
            policy,
        }
    }

    /// Identifier recorded on analysis runs; the configured model stands in
    /// when the reply does not name one
    fn model_label(&self, reported: &str) -> String {
        let model = match reported.trim() {
            "" => self.provider.model(),
            reported => reported,
        };
        format!("{}:{}", self.provider.name(), model)
    }

    /// Analyze one movie's subtitles
    pub async fn analyze(
        &self,
        title: &str,
        year: Option<i32>,
        subtitles: &str,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let (_, truncated) = truncate_subtitles(subtitles, self.common.max_subtitle_chars);
        if truncated {
            warn!(
                "Subtitles for '{}' truncated to {} characters",
                title, self.common.max_subtitle_chars
            );
        }

        let request = build_request(&self.common, &self.policy, title, year, subtitles);
        let (response, attempts) = self.complete_with_retry(title, request).await?;

        debug!(
            "Analysis reply for '{}': {} chars, tokens in/out {:?}/{:?}",
            title,
            response.text.len(),
            response.input_tokens,
            response.output_tokens
        );

        let value = extract_json_object(&response.text)?;
        let analysis = normalize(&value)?;

        info!(
            "Analyzed '{}': scores {}, {} scenes, {} normalization warning(s)",
            title,
            analysis.overall_scores.summary(),
            analysis.scenes.len(),
            analysis.warnings.len()
        );

        Ok(AnalysisOutcome {
            analysis,
            model: self.model_label(&response.model),
            truncated,
            attempts,
        })
    }

    async fn complete_with_retry(
        &self,
        title: &str,
        request: CompletionRequest,
    ) -> Result<(CompletionResponse, u32), PipelineError> {
        let max_attempts = self.common.retry_count + 1;
        let delay = Duration::from_millis(self.common.retry_delay_ms);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=max_attempts {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok((response, attempt)),
                Err(e) if e.is_transient() => {
                    warn!(
                        "Transient provider error for '{}': {} - attempt {}/{}",
                        title, e, attempt, max_attempts
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    error!("Provider rejected analysis request for '{}': {}", title, e);
                    return Err(PipelineError::AnalysisUnavailable(e.to_string()));
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        error!("Analysis for '{}' failed after {} attempts: {}", title, max_attempts, reason);
        Err(PipelineError::AnalysisUnavailable(format!(
            "gave up after {} attempts: {}",
            max_attempts, reason
        )))
    }
}
