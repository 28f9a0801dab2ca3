/*!
 * Movie metadata lookup.
 *
 * The catalog service is external; this module defines the trait the
 * pipeline depends on and a thin HTTP client for its JSON contract.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::database::NewMovie;
use crate::errors::PipelineError;
use crate::identifier::ImdbId;

pub mod http;
pub mod mock;

pub use http::HttpMetadataClient;
pub use mock::StaticMetadataProvider;

/// Catalog metadata for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieMetadata {
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub runtime_minutes: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl MovieMetadata {
    pub fn new(title: impl Into<String>, release_year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            release_year,
            runtime_minutes: None,
            genres: Vec::new(),
            overview: None,
        }
    }

    /// Movie row contents for this metadata
    pub fn to_new_movie(&self, imdb_id: &ImdbId) -> NewMovie {
        NewMovie {
            imdb_id: imdb_id.to_string(),
            title: self.title.clone(),
            release_year: self.release_year,
            runtime_minutes: self.runtime_minutes,
            genres: self.genres.clone(),
            overview: self.overview.clone(),
        }
    }
}

/// Source of catalog metadata
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up a movie; any failure is `MetadataUnavailable`
    async fn fetch(&self, imdb_id: &ImdbId) -> Result<MovieMetadata, PipelineError>;
}
