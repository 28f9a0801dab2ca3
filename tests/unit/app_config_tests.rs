/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use screenwise::app_config::{Config, LlmProvider, LogLevel};
use screenwise::rating::AgeBucket;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.llm.provider, LlmProvider::Anthropic);
    assert_eq!(config.llm.available_providers.len(), 4);
    assert_eq!(config.llm.get_endpoint(), "https://api.anthropic.com");
    assert_eq!(config.metadata.timeout_secs, 15);
    assert!(config.database.path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(Config::default_repair_anchor(), AgeBucket::M36);

    let enabled: Vec<&str> = config
        .subtitles
        .backends
        .iter()
        .filter(|b| b.enabled)
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(enabled, vec!["subtitlecat", "yifysubtitles"]);
}

/// Missing config files are created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(config.workers.max_concurrent_movies, 4);

    // Reloading reads what was written
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.llm.provider, config.llm.provider);
    assert_eq!(reloaded.flag_policy, config.flag_policy);
    Ok(())
}

/// Partial files keep their values and fill the rest with defaults
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "llm": {"provider": "lmstudio", "common": {"retry_count": 0}},
            "workers": {"max_concurrent_movies": 2},
            "database": {"path": "/tmp/ratings.db"},
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.llm.provider, LlmProvider::LMStudio);
    assert_eq!(config.llm.get_endpoint(), "http://localhost:1234/v1");
    assert_eq!(config.llm.common.retry_count, 0);
    assert_eq!(config.llm.common.max_subtitle_chars, 60_000);
    assert_eq!(config.workers.max_concurrent_movies, 2);
    assert_eq!(config.database_path()?, std::path::PathBuf::from("/tmp/ratings.db"));
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
    Ok(())
}

/// Broken JSON is reported with the file name
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json")?;

    let err = Config::load_or_create(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
    Ok(())
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.llm.provider = LlmProvider::OpenAI;
    assert!(config.validate().is_err(), "OpenAI without a key must be rejected");

    config.llm.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.workers.max_concurrent_movies = 0;
    assert!(config.validate().is_err());
    config.workers.max_concurrent_movies = 1;

    config.subtitles.backends[0].base_url = "not a url".to_string();
    assert!(config.validate().is_err());
    config.subtitles.backends[0].base_url = "https://www.subtitlecat.com".to_string();

    config.flag_policy.levels.remove(&3);
    assert!(config.validate().is_err());
}

/// Model overrides land on the active provider only
#[test]
fn test_active_provider_config_mut_withModelOverride_shouldOnlyTouchActiveProvider() {
    let mut config = Config::default();
    config.llm.provider = LlmProvider::Ollama;
    config.llm.active_provider_config_mut().model = "qwen2.5:14b".to_string();

    assert_eq!(config.llm.get_model(), "qwen2.5:14b");
    config.llm.provider = LlmProvider::OpenAI;
    assert_eq!(config.llm.get_model(), "gpt-4o-mini");
}
