/*!
 * Tests for subtitle content validation and cleaning
 */

use screenwise::errors::PipelineError;
use screenwise::subtitles::{
    CleanedSubtitle, ContentValidator, SubtitleFormat, clean_subtitle_text, count_cues, validate_for_analysis,
};

use crate::common;

#[test]
fn test_prepare_withSrt_shouldCleanAndCountCues() {
    let raw = common::sample_srt(20);
    let cleaned = CleanedSubtitle::prepare(&raw, &ContentValidator::default()).unwrap();

    assert_eq!(cleaned.format, SubtitleFormat::Srt);
    assert_eq!(cleaned.cue_count, 20);
    assert!(cleaned.text.contains("00:00:01 - 00:00:01"));
    assert!(!cleaned.text.contains("-->"));
    assert!(!cleaned.text.contains(",000"));
    assert_eq!(cleaned.content_hash.len(), 64);
}

#[test]
fn test_prepare_withVtt_shouldDropHeader() {
    let body = (1..=15)
        .map(|i| format!("00:00:{:02}.000 --> 00:00:{:02}.900\nA calm line of dialogue here.\n", i, i))
        .collect::<Vec<_>>()
        .join("\n");
    let raw = format!("WEBVTT\n\n{}", body);

    let cleaned = CleanedSubtitle::prepare(&raw, &ContentValidator::default()).unwrap();
    assert_eq!(cleaned.format, SubtitleFormat::Vtt);
    assert!(!cleaned.text.starts_with("WEBVTT"));
    assert_eq!(cleaned.cue_count, 15);
}

#[test]
fn test_prepare_withHtml_shouldBeCorrupted() {
    let result = CleanedSubtitle::prepare(&common::captcha_page(), &ContentValidator::default());
    assert!(matches!(result, Err(PipelineError::SubtitleCorrupted(_))));
}

#[test]
fn test_validator_withMarkupInsideValidSrt_shouldStillReject() {
    let raw = format!("{}\n<script>track()</script>", common::sample_srt(30));
    assert!(!ContentValidator::default().is_valid(&raw));
}

#[test]
fn test_cleaning_shouldBeIdempotentOnStoredText() {
    let once = clean_subtitle_text(&common::sample_srt(12));
    assert_eq!(clean_subtitle_text(&once), once);
    assert_eq!(count_cues(&once), 12);
}

#[test]
fn test_validateForAnalysis_withFewCues_shouldExplain() {
    let validator = ContentValidator::new(50);
    let text = clean_subtitle_text(&common::sample_srt(4));

    let report = validate_for_analysis(&text, &validator, 10);
    assert!(!report.valid);
    assert_eq!(report.cue_count, 4);
    assert!(report.reason.unwrap().contains("at least 10"));

    let report = validate_for_analysis(&text, &validator, 3);
    assert!(report.valid);
}
