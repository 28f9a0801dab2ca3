/*!
 * Scripted subtitle backends for acquisition tests
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use screenwise::errors::ProviderError;
use screenwise::subtitles::{SubtitleBackend, SubtitleQuery};

/// What a scripted backend does when searched
#[derive(Debug, Clone)]
pub enum Script {
    /// Finds a candidate and serves this payload
    Serve(String),
    /// Finds nothing
    Miss,
    /// Search fails with an upstream 503
    Unavailable,
}

/// Backend that follows a fixed script and counts calls
#[derive(Debug)]
pub struct ScriptedBackend {
    name: String,
    script: Script,
    searches: AtomicUsize,
    fetches: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            searches: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn serving(name: &str, payload: impl Into<String>) -> Arc<Self> {
        Self::new(name, Script::Serve(payload.into()))
    }

    pub fn missing(name: &str) -> Arc<Self> {
        Self::new(name, Script::Miss)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubtitleBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &SubtitleQuery) -> Result<Option<String>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Serve(_) => Ok(Some(format!(
                "http://{}.test/{}.srt",
                self.name,
                query.slug("-")
            ))),
            Script::Miss => Ok(None),
            Script::Unavailable => Err(ProviderError::from_status(503, "maintenance")),
        }
    }

    async fn fetch(&self, _url: &str) -> Result<Option<String>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Serve(payload) => Ok(Some(payload.clone())),
            _ => Ok(None),
        }
    }
}

/// Erase the concrete type for `SubtitleAcquirer::new`
pub fn boxed(backends: &[Arc<ScriptedBackend>]) -> Vec<Arc<dyn SubtitleBackend>> {
    backends
        .iter()
        .map(|b| b.clone() as Arc<dyn SubtitleBackend>)
        .collect()
}
