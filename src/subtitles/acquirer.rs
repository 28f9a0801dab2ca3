/*!
 * Ordered multi-backend subtitle acquisition.
 *
 * Backends are tried in configured order with a fixed courtesy delay
 * between attempts. Each attempt (search plus download) runs under its own
 * timeout. A backend that errors, times out, finds nothing or returns
 * rejected content is skipped and never retried; the first candidate the
 * content validator accepts wins.
 */

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::backend::{ScrapeClient, SubtitleBackend};
use super::backends::build_backends;
use super::query::SubtitleQuery;
use super::validator::{CleanedSubtitle, ContentValidator};
use crate::app_config::SubtitleConfig;
use crate::errors::ProviderError;

/// What happened when one backend was tried
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum AttemptResult {
    /// Search found no candidate, or the download was empty
    NoMatch,
    /// Transport failure
    Error(String),
    /// The attempt exceeded its timeout
    TimedOut,
    /// Candidate failed the content validator
    Rejected(String),
    Accepted,
}

/// Per-backend attempt log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub backend: String,
    #[serde(flatten)]
    pub result: AttemptResult,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            AttemptResult::NoMatch => write!(f, "{}: no match", self.backend),
            AttemptResult::Error(e) => write!(f, "{}: error ({})", self.backend, e),
            AttemptResult::TimedOut => write!(f, "{}: timed out", self.backend),
            AttemptResult::Rejected(r) => write!(f, "{}: rejected ({})", self.backend, r),
            AttemptResult::Accepted => write!(f, "{}: accepted", self.backend),
        }
    }
}

/// Result of an acquisition run; `NotFound` is an outcome, not an error
#[derive(Debug, Clone)]
pub enum AcquisitionOutcome {
    Found {
        subtitle: CleanedSubtitle,
        source: String,
        url: String,
        attempts: Vec<AttemptRecord>,
    },
    NotFound {
        attempts: Vec<AttemptRecord>,
    },
}

impl AcquisitionOutcome {
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            AcquisitionOutcome::Found { attempts, .. } => attempts,
            AcquisitionOutcome::NotFound { attempts } => attempts,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, AcquisitionOutcome::Found { .. })
    }
}

enum Candidate {
    Text { url: String, text: String },
    Missing,
}

pub struct SubtitleAcquirer {
    backends: Vec<Arc<dyn SubtitleBackend>>,
    validator: ContentValidator,
    courtesy_delay: Duration,
    attempt_timeout: Duration,
}

impl SubtitleAcquirer {
    pub fn new(
        backends: Vec<Arc<dyn SubtitleBackend>>,
        validator: ContentValidator,
        courtesy_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            backends,
            validator,
            courtesy_delay,
            attempt_timeout,
        }
    }

    /// Build the acquirer with the built-in backends
    pub fn from_config(config: &SubtitleConfig) -> Result<Self> {
        let client = ScrapeClient::new(&config.user_agent, config.request_timeout_secs)?;
        Ok(Self::new(
            build_backends(&config.backends, &client),
            ContentValidator::new(config.min_content_length),
            Duration::from_millis(config.courtesy_delay_ms),
            Duration::from_secs(config.attempt_timeout_secs),
        ))
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    /// Try every backend in order until one yields valid content
    pub async fn acquire(&self, query: &SubtitleQuery) -> AcquisitionOutcome {
        let mut attempts = Vec::with_capacity(self.backends.len());

        for (index, backend) in self.backends.iter().enumerate() {
            if index > 0 && !self.courtesy_delay.is_zero() {
                tokio::time::sleep(self.courtesy_delay).await;
            }

            let name = backend.name().to_string();
            debug!("Trying subtitle backend '{}' for '{}'", name, query.title);

            let result = match tokio::time::timeout(self.attempt_timeout, attempt(backend.as_ref(), query)).await {
                Err(_) => AttemptResult::TimedOut,
                Ok(Err(e)) => AttemptResult::Error(e.to_string()),
                Ok(Ok(Candidate::Missing)) => AttemptResult::NoMatch,
                Ok(Ok(Candidate::Text { url, text })) => match CleanedSubtitle::prepare(&text, &self.validator) {
                    Ok(subtitle) => {
                        info!(
                            "Subtitles for '{}' found via {} ({} cues)",
                            query.title, name, subtitle.cue_count
                        );
                        attempts.push(AttemptRecord {
                            backend: name.clone(),
                            result: AttemptResult::Accepted,
                        });
                        return AcquisitionOutcome::Found {
                            subtitle,
                            source: name,
                            url,
                            attempts,
                        };
                    }
                    Err(e) => AttemptResult::Rejected(e.to_string()),
                },
            };

            let record = AttemptRecord { backend: name, result };
            warn!("Skipping subtitle backend {}", record);
            attempts.push(record);
        }

        info!("No backend produced subtitles for '{}'", query.title);
        AcquisitionOutcome::NotFound { attempts }
    }
}

async fn attempt(backend: &dyn SubtitleBackend, query: &SubtitleQuery) -> Result<Candidate, ProviderError> {
    let Some(url) = backend.search(query).await? else {
        return Ok(Candidate::Missing);
    };
    match backend.fetch(&url).await? {
        Some(text) if !text.trim().is_empty() => Ok(Candidate::Text { url, text }),
        _ => Ok(Candidate::Missing),
    }
}
