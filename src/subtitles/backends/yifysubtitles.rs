/*!
 * yifysubtitles: catalog-ID page, English subtitle page hop, download link.
 */

use async_trait::async_trait;
use log::debug;

use super::extract_hrefs;
use crate::errors::ProviderError;
use crate::subtitles::backend::{ScrapeClient, SubtitleBackend, join_base, resolve_link};
use crate::subtitles::query::SubtitleQuery;

pub struct YifySubtitlesBackend {
    base_url: String,
    client: ScrapeClient,
}

impl YifySubtitlesBackend {
    pub fn new(base_url: &str, client: ScrapeClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

fn is_english_subtitle_page(href: &str) -> bool {
    let lowered = href.to_lowercase();
    lowered.contains("/subtitles/") && lowered.contains("english")
}

fn is_download_link(href: &str) -> bool {
    let lowered = href.to_lowercase();
    lowered.ends_with(".srt") || lowered.contains("/download/")
}

#[async_trait]
impl SubtitleBackend for YifySubtitlesBackend {
    fn name(&self) -> &str {
        "yifysubtitles"
    }

    async fn search(&self, query: &SubtitleQuery) -> Result<Option<String>, ProviderError> {
        let Some(imdb_id) = &query.imdb_id else {
            debug!("yifysubtitles: skipped, no catalog id");
            return Ok(None);
        };

        let movie_url = join_base(&self.base_url, &format!("movie-imdb/{}", imdb_id));
        let Some(movie_page) = self.client.get_text(&movie_url).await? else {
            return Ok(None);
        };

        let Some(subtitle_page) = extract_hrefs(&movie_page)
            .into_iter()
            .find(|href| is_english_subtitle_page(href))
            .and_then(|href| resolve_link(&movie_url, &href))
        else {
            return Ok(None);
        };

        let Some(page) = self.client.get_text(&subtitle_page).await? else {
            return Ok(None);
        };

        Ok(extract_hrefs(&page)
            .into_iter()
            .find(|href| is_download_link(href))
            .and_then(|href| resolve_link(&subtitle_page, &href)))
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, ProviderError> {
        self.client.get_text(url).await
    }
}
