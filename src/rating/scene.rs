/*!
 * Flagged scenes and their canonical `HH:MM:SS` timestamps.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::age::{AgeFlagVector, MAX_SCORE, MIN_SCORE};

// Leading `H:MM:SS` or `MM:SS`; anything after (millis, arrows, notes) is ignored.
static LEADING_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})(?::(\d{2}))?").unwrap());

/// A point in the movie, second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: u32,
}

impl Timestamp {
    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    pub fn total_seconds(&self) -> u32 {
        self.seconds
    }

    /// Parse the leading timestamp of a string.
    ///
    /// Accepts `HH:MM:SS` with any trailing content (`00:01:02,500 --> ...`)
    /// and the short `MM:SS` form, which is read as `00:MM:SS`. Minute and
    /// second fields of the full form must be below 60.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = LEADING_TIME_REGEX.captures(raw)?;
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;

        match caps.get(3) {
            Some(third) => {
                let third: u32 = third.as_str().parse().ok()?;
                if second >= 60 || third >= 60 {
                    return None;
                }
                Some(Self::from_hms(first, second, third))
            }
            None => {
                if second >= 60 {
                    return None;
                }
                Some(Self::from_hms(0, first, second))
            }
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| anyhow::anyhow!("Invalid timestamp: {}", s))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// A flagged scene in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub description: String,
    pub tags: Vec<String>,
    /// Intensity in `[1,5]`
    pub intensity: u8,
    pub age_flags: AgeFlagVector,
}

impl Scene {
    /// Whether the intensity is within the allowed scale
    pub fn has_valid_intensity(&self) -> bool {
        (MIN_SCORE..=MAX_SCORE).contains(&self.intensity)
    }

    /// Short label used in log lines and audit output
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }
}
