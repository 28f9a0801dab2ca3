/*!
 * Tests for age buckets, score/flag vectors and the flag policy
 */

use screenwise::rating::{AgeBucket, AgeFlag, AgeFlagVector, AgeScoreVector, FlagPolicy, Timestamp};
use std::collections::BTreeMap;

#[test]
fn test_ageBucket_canonicalKeys_shouldBeInAgeOrder() {
    let keys: Vec<&str> = AgeBucket::ALL.iter().map(|b| b.as_str()).collect();
    assert_eq!(keys, vec!["24m", "36m", "48m", "60m"]);
    assert_eq!(AgeBucket::from_canonical("48m"), Some(AgeBucket::M48));
    assert_eq!(AgeBucket::from_canonical("4"), None);
}

#[test]
fn test_scoreVector_jsonShape_shouldBeCanonicalObject() {
    let scores = AgeScoreVector::try_new([5, 4, 2, 1]).unwrap();
    let json = serde_json::to_value(scores).unwrap();
    assert_eq!(json, serde_json::json!({"24m": 5, "36m": 4, "48m": 2, "60m": 1}));

    let back: AgeScoreVector = serde_json::from_value(json).unwrap();
    assert_eq!(back, scores);
}

#[test]
fn test_scoreVector_calmness_shouldRequireUniformLowScores() {
    assert!(AgeScoreVector::try_new([2, 2, 2, 2]).unwrap().is_uniformly_calm(2));
    assert!(!AgeScoreVector::try_new([3, 3, 3, 3]).unwrap().is_uniformly_calm(2));
    assert!(!AgeScoreVector::try_new([2, 1, 1, 1]).unwrap().is_uniformly_calm(2));
}

#[test]
fn test_scoreVector_increase_shouldBeReported() {
    let scores = AgeScoreVector::try_new([2, 3, 2, 1]).unwrap();
    assert_eq!(scores.first_increase(), Some((AgeBucket::M24, AgeBucket::M36)));
    assert!(!scores.is_non_increasing());
}

#[test]
fn test_flag_parse_shouldOnlyAcceptCanonicalSpelling() {
    assert_eq!("not_recommended".parse::<AgeFlag>().unwrap(), AgeFlag::NotRecommended);
    assert!("Not Recommended".parse::<AgeFlag>().is_err());
    assert!(AgeFlag::NotRecommended.severity() > AgeFlag::Caution.severity());
}

#[test]
fn test_flagVector_fromMap_shouldRequireEveryBucket() {
    let mut map = BTreeMap::new();
    map.insert("24m".to_string(), AgeFlag::Caution);
    map.insert("36m".to_string(), AgeFlag::Caution);
    map.insert("48m".to_string(), AgeFlag::Appropriate);
    assert!(AgeFlagVector::try_from(map.clone()).is_err());

    map.insert("60m".to_string(), AgeFlag::Appropriate);
    let flags = AgeFlagVector::try_from(map).unwrap();
    assert_eq!(flags.get(AgeBucket::M60), AgeFlag::Appropriate);
    assert!(!flags.is_uniform());
}

#[test]
fn test_defaultPolicy_shouldLoosenWithAge() {
    let policy = FlagPolicy::default();
    assert!(policy.validate().is_ok());
    for intensity in 1..=5u8 {
        let expected = policy.expected(intensity);
        assert!(
            expected.first_severity_increase().is_none(),
            "intensity {} gets stricter with age",
            intensity
        );
    }
    assert_eq!(
        policy.expected(1),
        AgeFlagVector::new([AgeFlag::Caution, AgeFlag::Appropriate, AgeFlag::Appropriate, AgeFlag::Appropriate])
    );
    assert_eq!(policy.expected(9), AgeFlagVector::uniform(AgeFlag::Caution));
}

#[test]
fn test_policyTable_shouldMentionEveryBucket() {
    let table = FlagPolicy::default().render_table();
    for bucket in AgeBucket::ALL {
        assert!(table.contains(bucket.as_str()));
    }
}

#[test]
fn test_timestamp_cleaning_shouldBeIdempotent() {
    let once = Timestamp::parse("1:02:03,456").unwrap().to_string();
    assert_eq!(once, "01:02:03");
    assert_eq!(Timestamp::parse(&once).unwrap().to_string(), once);
    assert_eq!(Timestamp::parse("4:05").unwrap().to_string(), "00:04:05");
}
