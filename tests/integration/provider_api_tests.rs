/*!
 * Integration tests for LLM provider HTTP clients
 */

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use screenwise::analysis::ContentAnalyzer;
use screenwise::app_config::{LlmConfig, LlmProvider};
use screenwise::errors::{PipelineError, ProviderError};
use screenwise::providers::anthropic::Anthropic;
use screenwise::providers::mock::MockProvider;
use screenwise::providers::ollama::Ollama;
use screenwise::providers::openai::OpenAI;
use screenwise::providers::{CompletionRequest, Provider, create_provider};
use screenwise::rating::FlagPolicy;

use crate::common;

fn request() -> CompletionRequest {
    CompletionRequest::new("Rate this movie")
        .system("Answer with JSON")
        .temperature(0.1)
        .max_tokens(512)
}

#[tokio::test]
async fn test_anthropic_complete_shouldSendHeadersAndJoinTextBlocks() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"model": "claude-test", "system": "Answer with JSON", "max_tokens": 512})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "{\"overall_scores\":"},
                {"type": "text", "text": " {}}"}
            ],
            "model": "claude-test-2024",
            "usage": {"input_tokens": 120, "output_tokens": 8}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Anthropic::new("sk-ant-test", server.uri(), "claude-test", 5)?;
    let response = provider.complete(request()).await?;

    assert_eq!(response.text, "{\"overall_scores\": {}}");
    assert_eq!(response.model, "claude-test-2024");
    assert_eq!(response.input_tokens, Some(120));
    Ok(())
}

#[tokio::test]
async fn test_anthropic_unauthorized_shouldBeAuthenticationError() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "invalid x-api-key"}})))
        .mount(&server)
        .await;

    let provider = Anthropic::new("wrong", server.uri(), "claude-test", 5)?;
    let err = provider.complete(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthenticationError(_)), "{:?}", err);
    assert!(!err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_openai_complete_shouldUseBearerAndFirstChoice() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("sk-openai"))
        .and(body_partial_json(json!({"model": "gpt-test", "max_tokens": 512})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 5}
        })))
        .mount(&server)
        .await;

    let provider = OpenAI::new("openai", "sk-openai", format!("{}/v1", server.uri()), "gpt-test", 5)?;
    let response = provider.complete(request()).await?;

    assert_eq!(response.text, "{\"ok\": true}");
    assert_eq!(response.model, "gpt-test");
    assert_eq!(response.output_tokens, Some(5));
    Ok(())
}

#[tokio::test]
async fn test_openai_rateLimited_shouldBeTransient() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let provider = OpenAI::new("lmstudio", "", server.uri(), "local-model", 5)?;
    let err = provider.complete(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimitExceeded(_)));
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_ollama_complete_shouldRequestJsonFormat() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama-test", "format": "json", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama-test",
            "message": {"role": "assistant", "content": "{\"scenes\": []}"},
            "done": true,
            "prompt_eval_count": 33,
            "eval_count": 7
        })))
        .mount(&server)
        .await;

    let provider = Ollama::new(server.uri(), "llama-test", 5)?;
    let response = provider.complete(request()).await?;
    assert_eq!(response.text, "{\"scenes\": []}");
    assert_eq!(response.output_tokens, Some(7));
    Ok(())
}

#[test]
fn test_createProvider_shouldFollowActiveProvider() -> Result<()> {
    let mut config = LlmConfig::default();

    config.provider = LlmProvider::Ollama;
    assert_eq!(create_provider(&config)?.name(), "ollama");

    config.provider = LlmProvider::LMStudio;
    let provider = create_provider(&config)?;
    assert_eq!(provider.name(), "lmstudio");
    assert_eq!(provider.model(), "local-model");

    config.provider = LlmProvider::Anthropic;
    config.active_provider_config_mut().model = "claude-custom".to_string();
    assert_eq!(create_provider(&config)?.model(), "claude-custom");
    Ok(())
}

/// Two 503s are retried; the third answer is analyzed
#[tokio::test]
async fn test_analyzer_overHttp_shouldRetryServerErrors() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama-test",
            "message": {"role": "assistant", "content": MockProvider::sample_analysis(5)},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut common_config = common::fast_common_config();
    common_config.retry_count = 2;
    let analyzer = ContentAnalyzer::new(
        Arc::new(Ollama::new(server.uri(), "llama-test", 5)?),
        common_config,
        FlagPolicy::default(),
    );

    let outcome = analyzer.analyze("Cars", Some(2006), &common::sample_srt(12)).await?;
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.model, "ollama:llama-test");
    assert_eq!(outcome.analysis.scenes.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_analyzer_overHttp_badRequest_shouldNotRetry() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(400).set_body_string("model not found"))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = ContentAnalyzer::new(
        Arc::new(Ollama::new(server.uri(), "missing", 5)?),
        common::fast_common_config(),
        FlagPolicy::default(),
    );
    let result = analyzer.analyze("Cars", None, "00:00:01 - 00:00:02").await;
    assert!(matches!(result, Err(PipelineError::AnalysisUnavailable(_))));
    Ok(())
}
