/*!
 * Age buckets, age-keyed score vectors and per-scene age flags.
 *
 * Both vectors are fixed-size arrays indexed by `AgeBucket`, so a value of
 * these types always carries exactly the four canonical buckets. The serde
 * form is a map keyed `24m|36m|48m|60m`.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest allowed intensity or score
pub const MIN_SCORE: u8 = 1;

/// Highest allowed intensity or score
pub const MAX_SCORE: u8 = 5;

/// Developmental age bucket, youngest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "24m")]
    M24,
    #[serde(rename = "36m")]
    M36,
    #[serde(rename = "48m")]
    M48,
    #[serde(rename = "60m")]
    M60,
}

impl AgeBucket {
    /// All buckets in age order
    pub const ALL: [AgeBucket; 4] = [AgeBucket::M24, AgeBucket::M36, AgeBucket::M48, AgeBucket::M60];

    /// Canonical key
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBucket::M24 => "24m",
            AgeBucket::M36 => "36m",
            AgeBucket::M48 => "48m",
            AgeBucket::M60 => "60m",
        }
    }

    /// Position in age order
    pub fn index(&self) -> usize {
        match self {
            AgeBucket::M24 => 0,
            AgeBucket::M36 => 1,
            AgeBucket::M48 => 2,
            AgeBucket::M60 => 3,
        }
    }

    /// Parse a canonical key only; legacy keys go through the normalizer
    pub fn from_canonical(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == key)
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgeBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_canonical(&s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Invalid age bucket: {} (expected 24m, 36m, 48m or 60m)", s))
    }
}

/// Overall intensity score per age bucket, each in `[1,5]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, u8>", try_from = "BTreeMap<String, u8>")]
pub struct AgeScoreVector {
    scores: [u8; 4],
}

impl AgeScoreVector {
    /// Build a vector, checking every score is in range
    pub fn try_new(scores: [u8; 4]) -> Result<Self, String> {
        for (bucket, score) in AgeBucket::ALL.iter().zip(scores.iter()) {
            if !(MIN_SCORE..=MAX_SCORE).contains(score) {
                return Err(format!(
                    "score for {} is {} (allowed {}-{})",
                    bucket, score, MIN_SCORE, MAX_SCORE
                ));
            }
        }
        Ok(Self { scores })
    }

    /// Score for one bucket
    pub fn get(&self, bucket: AgeBucket) -> u8 {
        self.scores[bucket.index()]
    }

    /// Raw scores in age order
    pub fn as_array(&self) -> [u8; 4] {
        self.scores
    }

    /// Iterate `(bucket, score)` pairs in age order
    pub fn iter(&self) -> impl Iterator<Item = (AgeBucket, u8)> + '_ {
        AgeBucket::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// First adjacent pair where an older bucket scores higher than a younger one
    pub fn first_increase(&self) -> Option<(AgeBucket, AgeBucket)> {
        AgeBucket::ALL
            .windows(2)
            .find(|pair| self.get(pair[1]) > self.get(pair[0]))
            .map(|pair| (pair[0], pair[1]))
    }

    /// Whether scores never increase with age
    pub fn is_non_increasing(&self) -> bool {
        self.first_increase().is_none()
    }

    /// Whether every bucket has the same score at or below `calm_max`
    pub fn is_uniformly_calm(&self, calm_max: u8) -> bool {
        let first = self.scores[0];
        first <= calm_max && self.scores.iter().all(|s| *s == first)
    }

    /// Render as a compact `24m=3 36m=2 ...` string for logs
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(b, s)| format!("{}={}", b, s))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<AgeScoreVector> for BTreeMap<String, u8> {
    fn from(value: AgeScoreVector) -> Self {
        value.iter().map(|(b, s)| (b.as_str().to_string(), s)).collect()
    }
}

impl TryFrom<BTreeMap<String, u8>> for AgeScoreVector {
    type Error = String;

    fn try_from(map: BTreeMap<String, u8>) -> Result<Self, Self::Error> {
        let mut scores = [0u8; 4];
        for bucket in AgeBucket::ALL {
            scores[bucket.index()] = *map
                .get(bucket.as_str())
                .ok_or_else(|| format!("missing score for {}", bucket))?;
        }
        Self::try_new(scores)
    }
}

/// Per-bucket recommendation for a single scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeFlag {
    Appropriate,
    Caution,
    NotRecommended,
}

impl AgeFlag {
    /// 0 for appropriate up to 2 for not recommended
    pub fn severity(&self) -> u8 {
        match self {
            AgeFlag::Appropriate => 0,
            AgeFlag::Caution => 1,
            AgeFlag::NotRecommended => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeFlag::Appropriate => "appropriate",
            AgeFlag::Caution => "caution",
            AgeFlag::NotRecommended => "not_recommended",
        }
    }
}

impl fmt::Display for AgeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgeFlag {
    type Err = String;

    /// Canonical names only; model replies go through the normalizer's alias table
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appropriate" => Ok(AgeFlag::Appropriate),
            "caution" => Ok(AgeFlag::Caution),
            "not_recommended" => Ok(AgeFlag::NotRecommended),
            _ => Err(format!("unknown age flag '{}'", s)),
        }
    }
}

/// One flag for each of the four buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, AgeFlag>", try_from = "BTreeMap<String, AgeFlag>")]
pub struct AgeFlagVector {
    flags: [AgeFlag; 4],
}

impl AgeFlagVector {
    pub fn new(flags: [AgeFlag; 4]) -> Self {
        Self { flags }
    }

    /// Same flag for all buckets
    pub fn uniform(flag: AgeFlag) -> Self {
        Self { flags: [flag; 4] }
    }

    pub fn get(&self, bucket: AgeBucket) -> AgeFlag {
        self.flags[bucket.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgeBucket, AgeFlag)> + '_ {
        AgeBucket::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// Whether every bucket carries the same flag
    pub fn is_uniform(&self) -> bool {
        self.flags.iter().all(|f| *f == self.flags[0])
    }

    /// First adjacent pair where the older bucket is flagged more severely
    pub fn first_severity_increase(&self) -> Option<(AgeBucket, AgeBucket)> {
        AgeBucket::ALL
            .windows(2)
            .find(|pair| self.get(pair[1]).severity() > self.get(pair[0]).severity())
            .map(|pair| (pair[0], pair[1]))
    }

    /// Largest per-bucket severity distance to another vector
    pub fn max_distance(&self, other: &AgeFlagVector) -> u8 {
        self.iter()
            .map(|(b, f)| f.severity().abs_diff(other.get(b).severity()))
            .max()
            .unwrap_or(0)
    }
}

impl From<AgeFlagVector> for BTreeMap<String, AgeFlag> {
    fn from(value: AgeFlagVector) -> Self {
        value.iter().map(|(b, f)| (b.as_str().to_string(), f)).collect()
    }
}

impl TryFrom<BTreeMap<String, AgeFlag>> for AgeFlagVector {
    type Error = String;

    fn try_from(map: BTreeMap<String, AgeFlag>) -> Result<Self, Self::Error> {
        let mut flags = [AgeFlag::Caution; 4];
        for bucket in AgeBucket::ALL {
            flags[bucket.index()] = *map
                .get(bucket.as_str())
                .ok_or_else(|| format!("missing flag for {}", bucket))?;
        }
        Ok(Self { flags })
    }
}
