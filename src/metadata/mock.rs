/*!
 * In-memory metadata provider for tests and offline runs.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Barrier;

use super::{MetadataProvider, MovieMetadata};
use crate::errors::PipelineError;
use crate::identifier::ImdbId;

/// Answers from a fixed map; unknown IDs are unavailable
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    movies: HashMap<String, MovieMetadata>,
    request_count: Arc<AtomicUsize>,
    rendezvous: Option<Arc<Barrier>>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, imdb_id: &str, metadata: MovieMetadata) -> Self {
        self.movies.insert(imdb_id.to_string(), metadata);
        self
    }

    /// Hold each lookup until `lookups` of them are in flight, so concurrent
    /// ingestions of one movie all get past the duplicate check together
    pub fn with_rendezvous(mut self, lookups: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(lookups)));
        self
    }

    /// Lookups seen so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn fetch(&self, imdb_id: &ImdbId) -> Result<MovieMetadata, PipelineError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        self.movies
            .get(imdb_id.as_str())
            .cloned()
            .ok_or_else(|| PipelineError::MetadataUnavailable(format!("no metadata for {}", imdb_id)))
    }
}
