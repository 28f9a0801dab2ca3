/*!
 * Provider implementations for the analysis LLM.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and compatible servers (LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scripted behavior for tests
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{LlmConfig, LlmProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt
    pub system: Option<String>,
    /// User message
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Provider-neutral completion response
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Concatenated text output
    pub text: String,
    /// Model that produced the output
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider label, e.g. `anthropic`
    fn name(&self) -> &str;

    /// Configured model identifier, recorded on each analysis run
    fn model(&self) -> &str;

    /// Complete a request using this provider
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.complete(CompletionRequest::new("Hello").max_tokens(10))
            .await
            .map(|_| ())
    }
}

/// Build the configured provider
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn Provider>> {
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let timeout_secs = config.get_timeout_secs();

    let provider: Arc<dyn Provider> = match config.provider {
        LlmProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            config.get_api_key(),
            endpoint,
            model,
            timeout_secs,
        )?),
        LlmProvider::OpenAI | LlmProvider::LMStudio => Arc::new(openai::OpenAI::new(
            config.provider.to_lowercase_string(),
            config.get_api_key(),
            endpoint,
            model,
            timeout_secs,
        )?),
        LlmProvider::Ollama => Arc::new(ollama::Ollama::new(endpoint, model, timeout_secs)?),
    };
    Ok(provider)
}

/// Build a reqwest client with the given timeout
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into a `ProviderError`
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    ProviderError::from_status(status, body)
}
