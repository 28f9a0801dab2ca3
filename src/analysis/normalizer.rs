/*!
 * Schema normalization of model replies.
 *
 * Models answer in many shapes: camelCase keys, year-based age keys,
 * numbers as strings, flags spelled several ways. Everything is mapped
 * through fixed lookup tables onto `NormalizedAnalysis`, the only shape
 * later components see. Unknown keys are ignored with a warning and never
 * guessed. Out-of-range values, missing overall buckets, unparseable
 * timestamps, scenes missing a flag key and fewer than five scenes are
 * schema violations.
 */

use log::warn;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::PipelineError;
use crate::rating::{AgeBucket, AgeFlag, AgeFlagVector, AgeScoreVector, MAX_SCORE, MIN_SCORE, Scene, Timestamp};

/// Minimum number of scenes a complete analysis must contain
pub const MIN_SCENES: usize = 5;

const SCORE_KEYS: [&str; 4] = ["overall_scores", "overallScores", "age_scores", "scores"];
const SCENE_LIST_KEYS: [&str; 2] = ["scenes", "flagged_scenes"];
const START_KEYS: [&str; 3] = ["start_time", "start", "startTime"];
const END_KEYS: [&str; 3] = ["end_time", "end", "endTime"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "summary"];
const TAG_KEYS: [&str; 2] = ["tags", "categories"];
const INTENSITY_KEYS: [&str; 2] = ["intensity", "severity"];
const FLAG_KEYS: [&str; 3] = ["age_flags", "ageFlags", "flags"];

static AGE_KEY_TABLE: Lazy<HashMap<String, AgeBucket>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for (years, bucket) in [(2, AgeBucket::M24), (3, AgeBucket::M36), (4, AgeBucket::M48), (5, AgeBucket::M60)] {
        let months = years * 12;
        for alias in [
            format!("{}m", months),
            format!("{}mo", months),
            format!("{}months", months),
            format!("{} months", months),
            format!("{}_months", months),
            format!("{}", years),
            format!("{}y", years),
            format!("{}yr", years),
            format!("{}yrs", years),
            format!("{}yo", years),
            format!("{} years", years),
            format!("{}_years", years),
            format!("{}years", years),
            format!("age_{}", years),
            format!("age{}", years),
            format!("age {}", years),
        ] {
            table.insert(alias, bucket);
        }
    }
    table
});

static FLAG_TABLE: Lazy<HashMap<&'static str, AgeFlag>> = Lazy::new(|| {
    HashMap::from([
        ("appropriate", AgeFlag::Appropriate),
        ("ok", AgeFlag::Appropriate),
        ("safe", AgeFlag::Appropriate),
        ("caution", AgeFlag::Caution),
        ("warning", AgeFlag::Caution),
        ("not_recommended", AgeFlag::NotRecommended),
        ("not recommended", AgeFlag::NotRecommended),
        ("not-recommended", AgeFlag::NotRecommended),
        ("unsuitable", AgeFlag::NotRecommended),
    ])
});

/// Canonical analysis produced from a model reply
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnalysis {
    pub overall_scores: AgeScoreVector,
    pub scenes: Vec<Scene>,
    /// Keys ignored and defaults applied during normalization
    pub warnings: Vec<String>,
}

/// Map an age key in any accepted spelling onto its bucket
pub fn canonical_age_key(raw: &str) -> Option<AgeBucket> {
    AGE_KEY_TABLE.get(raw.trim().to_lowercase().as_str()).copied()
}

/// Map a flag value in any accepted spelling
pub fn canonical_flag(raw: &str) -> Option<AgeFlag> {
    FLAG_TABLE.get(raw.trim().to_lowercase().as_str()).copied()
}

/// Read an integer score from an int, a float (rounded) or a numeric string
pub fn parse_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    }
}

/// Normalize a parsed reply into the canonical schema
pub fn normalize(value: &Value) -> Result<NormalizedAnalysis, PipelineError> {
    let mut normalizer = Normalizer::default();
    let analysis = normalizer.run(value)?;
    for warning in &analysis.warnings {
        warn!("Analysis normalization: {}", warning);
    }
    Ok(analysis)
}

#[derive(Default)]
struct Normalizer {
    warnings: Vec<String>,
}

fn violation(message: impl Into<String>) -> PipelineError {
    PipelineError::SchemaInvariantViolation(message.into())
}

fn first_field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| object.get(*key)).filter(|v| !v.is_null())
}

fn in_scale(value: i64) -> Option<u8> {
    if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

impl Normalizer {
    fn run(&mut self, value: &Value) -> Result<NormalizedAnalysis, PipelineError> {
        let root = value
            .as_object()
            .ok_or_else(|| violation("analysis root is not an object"))?;

        let scores_value = first_field(root, &SCORE_KEYS).ok_or_else(|| violation("missing overall scores"))?;
        let overall_scores = self.scores(scores_value)?;

        let scenes = match first_field(root, &SCENE_LIST_KEYS) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.scene(index + 1, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(violation("scene list is not an array")),
            None => Vec::new(),
        };

        if scenes.len() < MIN_SCENES {
            return Err(violation(format!(
                "analysis has {} scenes, at least {} required",
                scenes.len(),
                MIN_SCENES
            )));
        }

        Ok(NormalizedAnalysis {
            overall_scores,
            scenes,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    fn scores(&mut self, value: &Value) -> Result<AgeScoreVector, PipelineError> {
        let object = value
            .as_object()
            .ok_or_else(|| violation("overall scores is not an object"))?;

        let mut scores: [Option<u8>; 4] = [None; 4];
        for (key, raw) in object {
            let Some(bucket) = canonical_age_key(key) else {
                self.warnings.push(format!("ignored unknown score key '{}'", key));
                continue;
            };
            if scores[bucket.index()].is_some() {
                self.warnings.push(format!("ignored duplicate score key '{}' for {}", key, bucket));
                continue;
            }
            let score = parse_score(raw)
                .ok_or_else(|| violation(format!("score for {} is not a number: {}", bucket, raw)))?;
            let score = in_scale(score).ok_or_else(|| {
                violation(format!(
                    "score for {} is {} (allowed {}-{})",
                    bucket, score, MIN_SCORE, MAX_SCORE
                ))
            })?;
            scores[bucket.index()] = Some(score);
        }

        let mut resolved = [0u8; 4];
        for bucket in AgeBucket::ALL {
            resolved[bucket.index()] =
                scores[bucket.index()].ok_or_else(|| violation(format!("missing overall score for {}", bucket)))?;
        }
        AgeScoreVector::try_new(resolved).map_err(violation)
    }

    fn scene(&mut self, number: usize, value: &Value) -> Result<Scene, PipelineError> {
        let object = value
            .as_object()
            .ok_or_else(|| violation(format!("scene {} is not an object", number)))?;

        let start_time = self.timestamp(number, "start_time", first_field(object, &START_KEYS))?;
        let end_time = self.timestamp(number, "end_time", first_field(object, &END_KEYS))?;
        if end_time < start_time {
            self.warnings.push(format!(
                "scene {} ends ({}) before it starts ({})",
                number, end_time, start_time
            ));
        }

        let description = match first_field(object, &DESCRIPTION_KEYS) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
            None => {
                self.warnings.push(format!("scene {} has no description", number));
                String::new()
            }
        };

        let tags = self.tags(first_field(object, &TAG_KEYS));

        let intensity_value = first_field(object, &INTENSITY_KEYS)
            .ok_or_else(|| violation(format!("scene {} has no intensity", number)))?;
        let intensity = parse_score(intensity_value)
            .and_then(in_scale)
            .ok_or_else(|| violation(format!("scene {} intensity {} is outside 1-5", number, intensity_value)))?;

        let age_flags = self.flags(number, first_field(object, &FLAG_KEYS))?;

        Ok(Scene {
            start_time,
            end_time,
            description,
            tags,
            intensity,
            age_flags,
        })
    }

    fn timestamp(&mut self, number: usize, field: &str, value: Option<&Value>) -> Result<Timestamp, PipelineError> {
        let raw = match value {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(violation(format!("scene {} {} is not a string: {}", number, field, other)));
            }
            None => return Err(violation(format!("scene {} has no {}", number, field))),
        };
        Timestamp::parse(raw).ok_or_else(|| violation(format!("scene {} {} '{}' is not a timestamp", number, field, raw)))
    }

    fn tags(&mut self, value: Option<&Value>) -> Vec<String> {
        let raw: Vec<String> = match value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };

        let mut tags: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    fn flags(&mut self, number: usize, value: Option<&Value>) -> Result<AgeFlagVector, PipelineError> {
        let object = match value {
            Some(Value::Object(object)) => object,
            Some(_) => return Err(violation(format!("scene {} age flags are not an object", number))),
            None => return Err(violation(format!("scene {} has no age flags", number))),
        };

        let mut seen: [Option<AgeFlag>; 4] = [None; 4];
        let mut present = [false; 4];
        for (key, raw) in object {
            let Some(bucket) = canonical_age_key(key) else {
                self.warnings.push(format!("scene {}: ignored unknown flag key '{}'", number, key));
                continue;
            };
            if present[bucket.index()] {
                continue;
            }
            present[bucket.index()] = true;
            let flag = raw.as_str().and_then(canonical_flag);
            if flag.is_none() {
                self.warnings.push(format!(
                    "scene {}: flag {} for {} defaulted to caution",
                    number, raw, bucket
                ));
            }
            seen[bucket.index()] = Some(flag.unwrap_or(AgeFlag::Caution));
        }

        let missing: Vec<&str> = AgeBucket::ALL
            .iter()
            .filter(|b| !present[b.index()])
            .map(|b| b.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(violation(format!(
                "scene {} is missing age flags for {}",
                number,
                missing.join(", ")
            )));
        }

        let mut flags = [AgeFlag::Caution; 4];
        for bucket in AgeBucket::ALL {
            flags[bucket.index()] = seen[bucket.index()].unwrap_or(AgeFlag::Caution);
        }
        Ok(AgeFlagVector::new(flags))
    }
}
