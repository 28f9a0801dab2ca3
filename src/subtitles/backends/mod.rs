/*!
 * Built-in scraping backends.
 *
 * Each backend keeps its page-parsing heuristics to itself; the acquirer
 * only sees the `SubtitleBackend` trait.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use super::backend::{ScrapeClient, SubtitleBackend};
use crate::app_config::BackendConfig;

pub mod plainindex;
pub mod subtitlecat;
pub mod yifysubtitles;

pub use plainindex::PlainIndexBackend;
pub use subtitlecat::SubtitleCatBackend;
pub use yifysubtitles::YifySubtitlesBackend;

/// Names accepted in `subtitles.backends[].name`
pub const KNOWN_BACKENDS: [&str; 3] = ["subtitlecat", "yifysubtitles", "plainindex"];

static HREF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap());

/// All `href` targets on a page, in document order
pub(crate) fn extract_hrefs(html: &str) -> Vec<String> {
    HREF_REGEX
        .captures_iter(html)
        .map(|caps| caps[1].replace("&amp;", "&"))
        .collect()
}

/// Pick the first link satisfying `predicate`, preferring one that mentions the year
pub(crate) fn pick_link<F>(links: &[String], year: Option<i32>, predicate: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let candidates: Vec<&String> = links.iter().filter(|l| predicate(l)).collect();
    if let Some(year) = year {
        let year = year.to_string();
        if let Some(with_year) = candidates.iter().find(|l| l.contains(&year)) {
            return Some((*with_year).clone());
        }
    }
    candidates.first().map(|l| (*l).clone())
}

/// Build the enabled backends in configured order
pub fn build_backends(configs: &[BackendConfig], client: &ScrapeClient) -> Vec<Arc<dyn SubtitleBackend>> {
    let mut backends: Vec<Arc<dyn SubtitleBackend>> = Vec::new();
    for config in configs.iter().filter(|c| c.enabled) {
        match config.name.as_str() {
            "subtitlecat" => backends.push(Arc::new(SubtitleCatBackend::new(&config.base_url, client.clone()))),
            "yifysubtitles" => {
                backends.push(Arc::new(YifySubtitlesBackend::new(&config.base_url, client.clone())))
            }
            "plainindex" => backends.push(Arc::new(PlainIndexBackend::new(&config.base_url, client.clone()))),
            other => warn!("Ignoring unknown subtitle backend '{}'", other),
        }
    }
    backends
}
