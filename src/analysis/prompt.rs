/*!
 * Prompt template for scene analysis.
 *
 * The template asks for strict JSON with canonical keys. Legacy key shapes
 * are still accepted downstream by the normalizer, but the prompt never
 * invites them.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::app_config::LlmCommonConfig;
use crate::providers::CompletionRequest;
use crate::rating::FlagPolicy;

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Appended after subtitle text that was cut short
pub const TRUNCATION_MARKER: &str = "\n[... subtitles truncated ...]";

/// User prompt template for scene analysis.
#[derive(Debug, Clone)]
pub struct AnalysisPromptTemplate {
    template: String,
}

impl AnalysisPromptTemplate {
    /// The default analysis template.
    pub const SCENE_ANALYSIS: &'static str = r#"Assess the movie "{title}" ({year}) for viewers aged 24, 36, 48 and 60 months.

## Output Requirements
Return ONLY one JSON object, no commentary, with exactly this shape:
{
  "overall_scores": {"24m": <1-5>, "36m": <1-5>, "48m": <1-5>, "60m": <1-5>},
  "scenes": [
    {
      "start_time": "HH:MM:SS",
      "end_time": "HH:MM:SS",
      "description": "<what happens and why it matters for young children>",
      "tags": ["<e.g. peril, violence, loud-noise, sadness, scary-imagery>"],
      "intensity": <1-5>,
      "age_flags": {"24m": "<flag>", "36m": "<flag>", "48m": "<flag>", "60m": "<flag>"}
    }
  ]
}
<flag> is one of "appropriate", "caution", "not_recommended".

## Rules
- Scores measure overall intensity: 1 is calm, 5 is very intense.
- Scores never increase with age: 24m >= 36m >= 48m >= 60m.
- List at least 5 scenes, ordered by start time, using subtitle timestamps.
- Flag each scene per age using this table as the baseline for its intensity:

{flag_policy}
## Subtitles
{subtitles}"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render with title, year, flag table and (already truncated) subtitles.
    ///
    /// Placeholders are filled in one pass over the template, so braces inside
    /// a substituted value are never expanded. Unknown names stay as written.
    pub fn render(&self, title: &str, year: Option<i32>, flag_policy: &str, subtitles: &str) -> String {
        let year = year.map(|y| y.to_string()).unwrap_or_else(|| "year unknown".to_string());
        PLACEHOLDER_REGEX
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "title" => title.to_string(),
                "year" => year.clone(),
                "flag_policy" => flag_policy.to_string(),
                "subtitles" => subtitles.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Default for AnalysisPromptTemplate {
    fn default() -> Self {
        Self::new(Self::SCENE_ANALYSIS)
    }
}

/// Cut text to at most `max_chars` characters, on a char boundary, appending
/// the truncation marker when anything was dropped
pub fn truncate_subtitles(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            (truncated, true)
        }
    }
}

/// Assemble the full completion request for one movie
pub fn build_request(
    common: &LlmCommonConfig,
    policy: &FlagPolicy,
    title: &str,
    year: Option<i32>,
    subtitles: &str,
) -> CompletionRequest {
    let (subtitles, _) = truncate_subtitles(subtitles, common.max_subtitle_chars);
    let prompt = AnalysisPromptTemplate::default().render(title, year, &policy.render_table(), &subtitles);

    CompletionRequest::new(prompt)
        .system(common.system_prompt.clone())
        .temperature(common.temperature)
        .max_tokens(common.max_tokens)
}
