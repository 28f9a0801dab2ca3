use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::rating::{AgeBucket, FlagPolicy};

/// Application configuration module
/// This module handles loading, validating and saving the pipeline settings:
/// LLM provider, scraping backends, metadata service, store location,
/// worker pool size and the flag policy table.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// LLM analysis config
    #[serde(default)]
    pub llm: LlmConfig,

    /// Subtitle acquisition config
    #[serde(default)]
    pub subtitles: SubtitleConfig,

    /// Metadata service config
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Store location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Batch worker pool
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Intensity to per-age flag thresholds
    #[serde(default)]
    pub flag_policy: FlagPolicy,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// LLM provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    // @provider: Ollama
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    #[default]
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl LlmProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider refuses requests without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: LlmProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// LLM service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider to use for analysis
    #[serde(default)]
    pub provider: LlmProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: LlmCommonConfig,
}

/// Common analysis settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmCommonConfig {
    /// System prompt sent with every analysis request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens the model may generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries after a transient failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed delay between retries in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Subtitle text beyond this many characters is truncated
    #[serde(default = "default_max_subtitle_chars")]
    pub max_subtitle_chars: usize,
}

impl Default for LlmCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_subtitle_chars: default_max_subtitle_chars(),
        }
    }
}

/// One scraping backend entry; order in the list is attempt order
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Backend implementation name
    pub name: String,

    /// Site root
    pub base_url: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Configuration for subtitle acquisition
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleConfig {
    /// Ordered scraping backends
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Pause between backend attempts in milliseconds
    #[serde(default = "default_courtesy_delay_ms")]
    pub courtesy_delay_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound for one backend attempt, search and download included
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Minimum accepted payload length in characters
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Minimum cue count for data validation
    #[serde(default = "default_min_cue_count")]
    pub min_cue_count: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            courtesy_delay_ms: default_courtesy_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            min_content_length: default_min_content_length(),
            min_cue_count: default_min_cue_count(),
            user_agent: default_user_agent(),
        }
    }
}

/// Metadata service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_endpoint")]
    pub endpoint: String,

    /// Bearer token (optional)
    #[serde(default = "String::new")]
    pub api_key: String,

    #[serde(default = "default_metadata_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_metadata_endpoint(),
            api_key: String::new(),
            timeout_secs: default_metadata_timeout_secs(),
        }
    }
}

/// Store location
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Batch worker pool
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_max_concurrent_movies")]
    pub max_concurrent_movies: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_movies: default_max_concurrent_movies(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_subtitle_chars() -> usize {
    60_000
}

fn default_true() -> bool {
    true
}

fn default_courtesy_delay_ms() -> u64 {
    1500
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_min_content_length() -> usize {
    crate::subtitles::validator::DEFAULT_MIN_LENGTH
}

fn default_min_cue_count() -> usize {
    10
}

fn default_user_agent() -> String {
    crate::subtitles::backend::DEFAULT_USER_AGENT.to_string()
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            name: "subtitlecat".to_string(),
            base_url: "https://www.subtitlecat.com".to_string(),
            enabled: true,
        },
        BackendConfig {
            name: "yifysubtitles".to_string(),
            base_url: "https://yifysubtitles.ch".to_string(),
            enabled: true,
        },
        BackendConfig {
            name: "plainindex".to_string(),
            base_url: "http://localhost:8088".to_string(),
            enabled: false,
        },
    ]
}

fn default_metadata_endpoint() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_metadata_timeout_secs() -> u64 {
    15
}

fn default_max_concurrent_movies() -> usize {
    4
}

fn default_endpoint(provider: LlmProvider) -> String {
    match provider {
        LlmProvider::Ollama => "http://localhost:11434".to_string(),
        LlmProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        LlmProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        LlmProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: LlmProvider) -> String {
    match provider {
        LlmProvider::Ollama => "llama3.1:8b".to_string(),
        LlmProvider::OpenAI => "gpt-4o-mini".to_string(),
        LlmProvider::Anthropic => "claude-3-5-sonnet-latest".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        LlmProvider::LMStudio => "local-model".to_string(),
    }
}

fn default_system_prompt() -> String {
    "You are a careful media reviewer who assesses films for very young children. \
     You read subtitle transcripts and answer with strict JSON only, never prose."
        .to_string()
}

impl Config {
    /// Load the config file, or write defaults to it when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider.requires_api_key() && self.llm.get_api_key().is_empty() {
            return Err(anyhow!(
                "LLM API key is required for {} provider",
                self.llm.provider.display_name()
            ));
        }

        if self.llm.common.max_subtitle_chars == 0 {
            return Err(anyhow!("llm.common.max_subtitle_chars must be greater than 0"));
        }

        let known = crate::subtitles::backends::KNOWN_BACKENDS;
        for backend in &self.subtitles.backends {
            if !known.contains(&backend.name.as_str()) {
                return Err(anyhow!(
                    "Unknown subtitle backend '{}' (known: {})",
                    backend.name,
                    known.join(", ")
                ));
            }
            url::Url::parse(&backend.base_url)
                .with_context(|| format!("Invalid base_url for backend '{}'", backend.name))?;
        }

        if self.workers.max_concurrent_movies == 0 {
            return Err(anyhow!("workers.max_concurrent_movies must be at least 1"));
        }

        self.flag_policy.validate()?;
        Ok(())
    }

    /// Resolved database path
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => crate::database::DatabaseConnection::default_database_path(),
        }
    }

    /// Anchor bucket used when repairing scores without an explicit one
    pub fn default_repair_anchor() -> AgeBucket {
        AgeBucket::M36
    }
}

impl LlmConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &LlmProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, inserting a default entry if absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.model.is_empty() => config.model.clone(),
            _ => default_model(self.provider),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|c| c.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.endpoint.is_empty() => config.endpoint.clone(),
            _ => default_endpoint(self.provider),
        }
    }

    /// Get the timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|c| c.timeout_secs)
            .unwrap_or_else(default_llm_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            available_providers: vec![
                ProviderConfig::new(LlmProvider::Ollama),
                ProviderConfig::new(LlmProvider::OpenAI),
                ProviderConfig::new(LlmProvider::Anthropic),
                ProviderConfig::new(LlmProvider::LMStudio),
            ],
            common: LlmCommonConfig::default(),
        }
    }
}
