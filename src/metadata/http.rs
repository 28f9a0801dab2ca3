use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use std::time::Duration;

use super::{MetadataProvider, MovieMetadata};
use crate::app_config::MetadataConfig;
use crate::errors::PipelineError;
use crate::identifier::ImdbId;

/// Client for `GET {endpoint}/movies/{imdb_id}`
#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpMetadataClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    pub fn from_config(config: &MetadataConfig) -> anyhow::Result<Self> {
        Self::new(&config.endpoint, Some(config.api_key.clone()), config.timeout_secs)
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataClient {
    async fn fetch(&self, imdb_id: &ImdbId) -> Result<MovieMetadata, PipelineError> {
        let url = format!("{}/movies/{}", self.endpoint, imdb_id);
        debug!("Fetching metadata from {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Metadata request for {} failed: {}", imdb_id, e);
            PipelineError::MetadataUnavailable(format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::MetadataUnavailable(format!(
                "metadata service answered {} for {}: {}",
                status.as_u16(),
                imdb_id,
                body.chars().take(200).collect::<String>()
            )));
        }

        let metadata = response
            .json::<MovieMetadata>()
            .await
            .map_err(|e| PipelineError::MetadataUnavailable(format!("malformed metadata body: {}", e)))?;

        if metadata.title.trim().is_empty() {
            return Err(PipelineError::MetadataUnavailable(format!(
                "metadata for {} has an empty title",
                imdb_id
            )));
        }

        Ok(metadata)
    }
}
