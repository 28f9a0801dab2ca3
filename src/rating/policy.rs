/*!
 * Intensity to per-age flag thresholds.
 *
 * The policy maps each scene intensity (1-5) to the flag vector expected for
 * the four age buckets. It is rendered into the analysis prompt so the model
 * applies the same thresholds, and the consistency audit uses it to warn
 * about scenes whose flags drift far from the table.
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::age::{AgeBucket, AgeFlag, AgeFlagVector, MAX_SCORE, MIN_SCORE};

/// Configurable flag thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagPolicy {
    /// Highest overall score that still counts as "calm"
    #[serde(default = "default_calm_max_score")]
    pub calm_max_score: u8,

    /// Expected flags per intensity level
    #[serde(default = "default_levels")]
    pub levels: BTreeMap<u8, AgeFlagVector>,
}

fn default_calm_max_score() -> u8 {
    2
}

fn default_levels() -> BTreeMap<u8, AgeFlagVector> {
    use AgeFlag::*;
    BTreeMap::from([
        (1, AgeFlagVector::new([Caution, Appropriate, Appropriate, Appropriate])),
        (2, AgeFlagVector::new([Caution, Caution, Appropriate, Appropriate])),
        (3, AgeFlagVector::new([NotRecommended, Caution, Caution, Appropriate])),
        (4, AgeFlagVector::new([NotRecommended, NotRecommended, Caution, Caution])),
        (5, AgeFlagVector::new([NotRecommended, NotRecommended, NotRecommended, Caution])),
    ])
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            calm_max_score: default_calm_max_score(),
            levels: default_levels(),
        }
    }
}

impl FlagPolicy {
    /// Check that every intensity has an entry, no entry flags all buckets
    /// alike and the calm bound is on the scale.
    ///
    /// Uniform flags are only allowed on uniformly calm movies, so a uniform
    /// row would steer the model into an inconsistent analysis.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.calm_max_score) {
            return Err(anyhow!(
                "flag_policy.calm_max_score must be between {} and {}, got {}",
                MIN_SCORE,
                MAX_SCORE,
                self.calm_max_score
            ));
        }
        for intensity in MIN_SCORE..=MAX_SCORE {
            if !self.levels.contains_key(&intensity) {
                return Err(anyhow!("flag_policy.levels is missing intensity {}", intensity));
            }
        }
        if let Some(extra) = self.levels.keys().find(|k| !(MIN_SCORE..=MAX_SCORE).contains(*k)) {
            return Err(anyhow!("flag_policy.levels has out-of-range intensity {}", extra));
        }
        if let Some((intensity, flags)) = self.levels.iter().find(|(_, flags)| flags.is_uniform()) {
            return Err(anyhow!(
                "flag_policy.levels intensity {} flags every bucket {}; rows must differ across ages",
                intensity,
                flags.get(AgeBucket::M24)
            ));
        }
        Ok(())
    }

    /// Expected flags for an intensity; out-of-scale values fall back to caution
    pub fn expected(&self, intensity: u8) -> AgeFlagVector {
        self.levels
            .get(&intensity)
            .copied()
            .unwrap_or_else(|| AgeFlagVector::uniform(AgeFlag::Caution))
    }

    /// Render the table as plain text for the analysis prompt
    pub fn render_table(&self) -> String {
        let header = AgeBucket::ALL
            .iter()
            .map(|b| format!("{:<16}", b.as_str()))
            .collect::<String>();
        let mut out = format!("{:<11}{}\n", "intensity", header.trim_end());
        for (intensity, flags) in &self.levels {
            let row = flags
                .iter()
                .map(|(_, flag)| format!("{:<16}", flag.as_str()))
                .collect::<String>();
            out.push_str(&format!("{:<11}{}\n", intensity, row.trim_end()));
        }
        out
    }
}
