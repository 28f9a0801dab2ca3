/*!
 * subtitlecat: title search, detail page hop, English `.srt` link.
 */

use async_trait::async_trait;
use log::debug;

use super::{extract_hrefs, pick_link};
use crate::errors::ProviderError;
use crate::subtitles::backend::{ScrapeClient, SubtitleBackend, join_base, resolve_link};
use crate::subtitles::query::SubtitleQuery;

pub struct SubtitleCatBackend {
    base_url: String,
    client: ScrapeClient,
}

impl SubtitleCatBackend {
    pub fn new(base_url: &str, client: ScrapeClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn search_url(&self, query: &SubtitleQuery) -> String {
        join_base(&self.base_url, &format!("index.php?search={}", query.slug("+")))
    }
}

fn is_detail_link(href: &str) -> bool {
    href.contains("/subs/") && href.ends_with(".html")
}

fn is_english_srt(href: &str) -> bool {
    let lowered = href.to_lowercase();
    lowered.ends_with("-en.srt") || lowered.ends_with(".en.srt")
}

#[async_trait]
impl SubtitleBackend for SubtitleCatBackend {
    fn name(&self) -> &str {
        "subtitlecat"
    }

    async fn search(&self, query: &SubtitleQuery) -> Result<Option<String>, ProviderError> {
        let search_url = self.search_url(query);
        let Some(listing) = self.client.get_text(&search_url).await? else {
            return Ok(None);
        };

        let links = extract_hrefs(&listing);
        let Some(detail) = pick_link(&links, query.release_year, is_detail_link) else {
            debug!("subtitlecat: no detail page for '{}'", query.normalized_title());
            return Ok(None);
        };
        let Some(detail_url) = resolve_link(&search_url, &detail) else {
            return Ok(None);
        };

        let Some(detail_page) = self.client.get_text(&detail_url).await? else {
            return Ok(None);
        };
        let srt = extract_hrefs(&detail_page)
            .into_iter()
            .find(|href| is_english_srt(href));

        Ok(srt.and_then(|href| resolve_link(&detail_url, &href)))
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, ProviderError> {
        self.client.get_text(url).await
    }
}
