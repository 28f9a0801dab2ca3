/*!
 * Subtitle content validation and cleaning.
 *
 * Scraped payloads are frequently HTML error pages, captcha walls or
 * truncated downloads. The `ContentValidator` decides whether a blob is
 * genuine subtitle text; the cleaning functions reduce accepted text to the
 * persisted convention of `HH:MM:SS - HH:MM:SS` cue timing lines.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::PipelineError;
use crate::rating::Timestamp;

/// Markers of an HTML document; their presence means the payload is corrupted
const HTML_MARKERS: [&str; 5] = ["<!doctype html", "<html", "<head", "<body", "<script"];

/// Default minimum payload length in characters
pub const DEFAULT_MIN_LENGTH: usize = 300;

static ANY_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}:\d{2}:\d{2}").unwrap());

// A cue timing line in SRT, VTT or already-cleaned form.
static CUE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d{1,2}:\d{2}:\d{2}|\d{2}:\d{2})(?:[.,]\d{1,3})?\s*(?:-->|-)\s*(\d{1,2}:\d{2}:\d{2}|\d{2}:\d{2})(?:[.,]\d{1,3})?(?:\s.*)?$",
    )
    .unwrap()
});

static INLINE_TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2}):(\d{2})(?:[.,]\d{1,3})?\b").unwrap());

static SRT_ARROW_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}:\d{2}:\d{2},\d{3}\s*-->").unwrap());

/// Original encoding of an acquired subtitle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Text,
}

impl SubtitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Text => "text",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" => Ok(SubtitleFormat::Vtt),
            "text" => Ok(SubtitleFormat::Text),
            _ => Err(anyhow::anyhow!("Invalid subtitle format: {}", s)),
        }
    }
}

/// Accept/reject decision for candidate subtitle text
#[derive(Debug, Clone)]
pub struct ContentValidator {
    min_length: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH)
    }
}

impl ContentValidator {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Validate a candidate. All three checks must pass; markup is
    /// rejected regardless of length.
    pub fn validate(&self, text: &str) -> Result<(), PipelineError> {
        if let Some(marker) = find_html_marker(text) {
            return Err(PipelineError::SubtitleCorrupted(format!(
                "payload contains markup marker '{}'",
                marker
            )));
        }

        let length = text.chars().count();
        if length < self.min_length {
            return Err(PipelineError::SubtitleCorrupted(format!(
                "payload too short ({} chars, minimum {})",
                length, self.min_length
            )));
        }

        if !has_timing(text) {
            return Err(PipelineError::SubtitleCorrupted(
                "payload has no timestamps or cue separators".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_valid(&self, text: &str) -> bool {
        self.validate(text).is_ok()
    }
}

/// First HTML document marker found in the text, case-insensitively
pub fn find_html_marker(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    HTML_MARKERS.into_iter().find(|marker| lowered.contains(marker))
}

fn has_timing(text: &str) -> bool {
    text.contains("-->") || ANY_TIMESTAMP_REGEX.is_match(text)
}

/// Detect the encoding of raw text before cleaning
pub fn detect_format(text: &str) -> SubtitleFormat {
    let head = text.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("WEBVTT") {
        SubtitleFormat::Vtt
    } else if SRT_ARROW_REGEX.is_match(text) {
        SubtitleFormat::Srt
    } else {
        SubtitleFormat::Text
    }
}

/// Normalize a single timestamp to `HH:MM:SS`. Returns `None` if the
/// input does not start with a timestamp.
pub fn clean_timestamp(raw: &str) -> Option<String> {
    Timestamp::parse(raw).map(|ts| ts.to_string())
}

/// Reduce subtitle text to the persisted convention. Idempotent.
pub fn clean_subtitle_text(text: &str) -> String {
    let normalized = text.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");

    let mut out: Vec<String> = Vec::new();
    for (index, line) in normalized.lines().enumerate() {
        if index == 0 && line.trim_start().starts_with("WEBVTT") {
            continue;
        }

        if let Some(caps) = CUE_LINE_REGEX.captures(line) {
            if let (Some(start), Some(end)) = (clean_timestamp(&caps[1]), clean_timestamp(&caps[2])) {
                out.push(format!("{} - {}", start, end));
                continue;
            }
        }

        let cleaned = INLINE_TIMESTAMP_REGEX.replace_all(line, |caps: &Captures| {
            clean_timestamp(&caps[0]).unwrap_or_else(|| caps[0].to_string())
        });
        out.push(cleaned.trim_end().to_string());
    }

    out.join("\n").trim().to_string()
}

/// Number of cue timing lines in raw or cleaned text
pub fn count_cues(text: &str) -> usize {
    text.lines().filter(|line| CUE_LINE_REGEX.is_match(line)).count()
}

/// Hex SHA-256 of the text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validated, cleaned subtitle ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSubtitle {
    pub text: String,
    pub format: SubtitleFormat,
    pub content_hash: String,
    pub cue_count: usize,
}

impl CleanedSubtitle {
    /// Validate raw text, then clean it
    pub fn prepare(raw: &str, validator: &ContentValidator) -> Result<Self, PipelineError> {
        validator.validate(raw)?;
        let format = detect_format(raw);
        let text = clean_subtitle_text(raw);
        Ok(Self {
            content_hash: content_hash(&text),
            cue_count: count_cues(&text),
            format,
            text,
        })
    }
}

/// Outcome of the data-validation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataValidationReport {
    pub valid: bool,
    pub reason: Option<String>,
    pub cue_count: usize,
}

/// Check stored subtitle text is usable for analysis
pub fn validate_for_analysis(
    text: &str,
    validator: &ContentValidator,
    min_cue_count: usize,
) -> DataValidationReport {
    let cue_count = count_cues(text);

    if let Err(e) = validator.validate(text) {
        return DataValidationReport {
            valid: false,
            reason: Some(e.to_string()),
            cue_count,
        };
    }

    if cue_count < min_cue_count {
        return DataValidationReport {
            valid: false,
            reason: Some(format!(
                "only {} timestamp cues found, at least {} required",
                cue_count, min_cue_count
            )),
            cue_count,
        };
    }

    DataValidationReport {
        valid: true,
        reason: None,
        cue_count,
    }
}
