/*!
 * Tests for reply extraction and schema normalization
 */

use screenwise::analysis::{MIN_SCENES, extract_json_object, normalize};
use screenwise::errors::PipelineError;
use screenwise::providers::mock::MockProvider;
use screenwise::rating::{AgeBucket, AgeFlag};
use serde_json::json;

fn scene(start: &str, flags: serde_json::Value) -> serde_json::Value {
    json!({
        "startTime": start,
        "endTime": "00:30:00",
        "description": "Storm at sea",
        "tags": ["Peril", "loud noise"],
        "intensity": 4.0,
        "ageFlags": flags
    })
}

#[test]
fn test_mockReply_shouldExtractAndNormalize() {
    let value = extract_json_object(&MockProvider::sample_analysis(6)).unwrap();
    let analysis = normalize(&value).unwrap();

    assert_eq!(analysis.overall_scores.as_array(), [4, 3, 2, 1]);
    assert_eq!(analysis.scenes.len(), 6);
    assert!(analysis.warnings.is_empty());
    assert_eq!(analysis.scenes[0].age_flags.get(AgeBucket::M24), AgeFlag::NotRecommended);
}

#[test]
fn test_normalize_withYearKeysAndCamelCase_shouldBeCanonical() {
    let flags = json!({"2 years": "unsuitable", "3 years": "not recommended", "4 years": "warning", "5 years": "ok"});
    let value = json!({
        "overallScores": {"2": "5", "3": 4, "4": 3.4, "5": 2},
        "scenes": (0..MIN_SCENES).map(|_| scene("00:25:00", flags.clone())).collect::<Vec<_>>()
    });

    let analysis = normalize(&value).unwrap();
    assert_eq!(analysis.overall_scores.as_array(), [5, 4, 3, 2]);

    let first = &analysis.scenes[0];
    assert_eq!(first.start_time.to_string(), "00:25:00");
    assert_eq!(first.intensity, 4);
    assert_eq!(first.tags, vec!["peril".to_string(), "loud noise".to_string()]);
    assert_eq!(first.age_flags.get(AgeBucket::M48), AgeFlag::Caution);
    assert_eq!(first.age_flags.get(AgeBucket::M60), AgeFlag::Appropriate);
}

#[test]
fn test_normalize_withNullFlag_shouldDefaultToCautionWithWarning() {
    let flags = json!({"24m": null, "36m": "caution", "48m": "appropriate", "60m": "appropriate"});
    let value = json!({
        "overall_scores": {"24m": 3, "36m": 2, "48m": 1, "60m": 1},
        "scenes": (0..MIN_SCENES).map(|_| scene("00:10:00", flags.clone())).collect::<Vec<_>>()
    });

    let analysis = normalize(&value).unwrap();
    assert_eq!(analysis.scenes[0].age_flags.get(AgeBucket::M24), AgeFlag::Caution);
    assert_eq!(analysis.warnings.len(), MIN_SCENES);
}

#[test]
fn test_normalize_withFourScenes_shouldViolateSchema() {
    let flags = json!({"24m": "caution", "36m": "caution", "48m": "appropriate", "60m": "appropriate"});
    let value = json!({
        "overall_scores": {"24m": 3, "36m": 2, "48m": 1, "60m": 1},
        "scenes": (0..MIN_SCENES - 1).map(|_| scene("00:10:00", flags.clone())).collect::<Vec<_>>()
    });
    assert!(matches!(normalize(&value), Err(PipelineError::SchemaInvariantViolation(_))));
}

#[test]
fn test_normalize_withMissingBucketScore_shouldViolateSchema() {
    let value = json!({"overall_scores": {"24m": 3, "36m": 2, "48m": 1}, "scenes": []});
    let err = normalize(&value).unwrap_err();
    assert!(err.to_string().contains("60m"));
}

#[test]
fn test_extract_withProseOnly_shouldBeMalformed() {
    assert!(matches!(
        extract_json_object("I cannot help with that."),
        Err(PipelineError::MalformedAnalysisResponse(_))
    ));
}
