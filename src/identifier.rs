/*!
 * Catalog identifier resolution.
 *
 * Users paste either a catalog URL or a bare ID; both are reduced to the
 * canonical `tt` + 7-8 digit form before anything touches the store.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::errors::PipelineError;

static TITLE_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/title/(tt\d{7,8})(?:/|$)").unwrap());

static BARE_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)(tt)?(\d{7,8})$").unwrap());

/// Canonical catalog identifier, e.g. `tt0398286`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImdbId(String);

impl ImdbId {
    /// Resolve a raw user-supplied string (URL or bare ID)
    pub fn resolve(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidIdentifier("empty identifier".to_string()));
        }

        if let Some(caps) = BARE_ID_REGEX.captures(trimmed) {
            return Ok(Self(format!("tt{}", &caps[2])));
        }

        if let Some(path) = url_path(trimmed) {
            if let Some(caps) = TITLE_PATH_REGEX.captures(&path) {
                return Ok(Self(caps[1].to_string()));
            }
        }

        Err(PipelineError::InvalidIdentifier(trimmed.to_string()))
    }

    /// The canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ImdbId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

// Accepts URLs with or without a scheme; only catalog hosts qualify.
fn url_path(raw: &str) -> Option<String> {
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.to_lowercase();
    if host == "imdb.com" || host.ends_with(".imdb.com") {
        Some(url.path().to_string())
    } else {
        None
    }
}
