/*!
 * Search query construction for scraping backends.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifier::ImdbId;

static PARENTHESIZED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());
static PUNCTUATION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// What a backend searches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleQuery {
    pub title: String,
    pub release_year: Option<i32>,
    pub imdb_id: Option<ImdbId>,
}

impl SubtitleQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            release_year: None,
            imdb_id: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub fn with_imdb_id(mut self, id: ImdbId) -> Self {
        self.imdb_id = Some(id);
        self
    }

    /// Normalized title, see [`normalize_title`]
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    /// Normalized title joined with `sep` for use in URL paths
    pub fn slug(&self, sep: &str) -> String {
        self.normalized_title().split(' ').collect::<Vec<_>>().join(sep)
    }
}

/// Strip parenthesized segments and punctuation, case-fold, collapse whitespace.
///
/// `"Cars (2006)"` becomes `"cars"`, `"WALL·E"` becomes `"wall e"`.
pub fn normalize_title(title: &str) -> String {
    let without_parens = PARENTHESIZED_REGEX.replace_all(title, " ");
    let without_apostrophes = without_parens.replace(['\'', '’'], "");
    let without_punct = PUNCTUATION_REGEX.replace_all(&without_apostrophes, " ");
    WHITESPACE_REGEX
        .replace_all(without_punct.trim(), " ")
        .to_lowercase()
}
