/*!
 * Scraping backend trait and the shared HTTP client used by all backends.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, header, redirect};
use std::time::Duration;
use url::Url;

use super::query::SubtitleQuery;
use crate::errors::ProviderError;

/// Default browser-like User-Agent
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// A subtitle source reachable by scraping
///
/// `search` locates a candidate download URL, following at most one
/// secondary page internally; `fetch` downloads the payload. `Ok(None)`
/// means "nothing here", errors are transport failures.
#[async_trait]
pub trait SubtitleBackend: Send + Sync {
    /// Backend label stored as the subtitle source
    fn name(&self) -> &str;

    /// Find a candidate download URL for the query
    async fn search(&self, query: &SubtitleQuery) -> Result<Option<String>, ProviderError>;

    /// Download the payload at a candidate URL
    async fn fetch(&self, url: &str) -> Result<Option<String>, ProviderError>;
}

/// HTTP client with browser headers, bounded timeout and a one-hop redirect policy
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    client: Client,
    timeout_secs: u64,
}

impl ScrapeClient {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(redirect::Policy::limited(1))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout_secs })
    }

    /// GET a page as text; 404 is `None`, other non-2xx statuses are errors
    pub async fn get_text(&self, url: &str) -> Result<Option<String>, ProviderError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), truncate(&body, 200)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;
        Ok(Some(text))
    }
}

/// Resolve a possibly relative link against the page it was found on
pub fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Join a configured base URL and a path
pub fn join_base(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
