/*!
 * plainindex: a search listing with direct `.srt`/`.vtt` links, no hop.
 */

use async_trait::async_trait;

use super::{extract_hrefs, pick_link};
use crate::errors::ProviderError;
use crate::subtitles::backend::{ScrapeClient, SubtitleBackend, join_base, resolve_link};
use crate::subtitles::query::SubtitleQuery;

pub struct PlainIndexBackend {
    base_url: String,
    client: ScrapeClient,
}

impl PlainIndexBackend {
    pub fn new(base_url: &str, client: ScrapeClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

fn is_direct_subtitle(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href).to_lowercase();
    path.ends_with(".srt") || path.ends_with(".vtt")
}

#[async_trait]
impl SubtitleBackend for PlainIndexBackend {
    fn name(&self) -> &str {
        "plainindex"
    }

    async fn search(&self, query: &SubtitleQuery) -> Result<Option<String>, ProviderError> {
        let search_url = join_base(&self.base_url, &format!("search?q={}", query.slug("+")));
        let Some(listing) = self.client.get_text(&search_url).await? else {
            return Ok(None);
        };

        let links = extract_hrefs(&listing);
        Ok(pick_link(&links, query.release_year, is_direct_subtitle)
            .and_then(|href| resolve_link(&search_url, &href)))
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, ProviderError> {
        self.client.get_text(url).await
    }
}
