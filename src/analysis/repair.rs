/*!
 * Heuristic score repair.
 *
 * Only ever run on operator request. Results are written with the
 * `heuristic_repair` scores source so they are never mistaken for analysis
 * output.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rating::{AgeBucket, AgeScoreVector, MAX_SCORE, MIN_SCORE};

/// Score decrease applied per bucket step after the anchor
const STEP_OFFSET: u8 = 1;

/// How to rebuild a score vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairStrategy {
    /// Keep the anchor score, derive older buckets by fixed offsets and keep
    /// younger buckets at least the anchor
    InferFromAnchor { anchor: AgeBucket },
    /// Lower each older bucket to the previous bucket's value
    ClampMonotonic,
}

impl RepairStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStrategy::InferFromAnchor { .. } => "infer-from-anchor",
            RepairStrategy::ClampMonotonic => "clamp-monotonic",
        }
    }

    /// Parse a strategy name, using `anchor` for `infer-from-anchor`
    pub fn parse(name: &str, anchor: AgeBucket) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "infer-from-anchor" | "infer_from_anchor" => Ok(RepairStrategy::InferFromAnchor { anchor }),
            "clamp-monotonic" | "clamp_monotonic" => Ok(RepairStrategy::ClampMonotonic),
            other => Err(format!(
                "unknown repair strategy '{}' (expected infer-from-anchor or clamp-monotonic)",
                other
            )),
        }
    }

    /// Compute repaired scores from stored values, which may be out of range
    pub fn apply(&self, stored: [i64; 4]) -> Result<AgeScoreVector, String> {
        let mut scores = stored.map(clamp_score);

        match *self {
            RepairStrategy::InferFromAnchor { anchor } => {
                let a = anchor.index();
                let anchor_score = scores[a];
                for (steps, slot) in scores[a + 1..].iter_mut().enumerate() {
                    let offset = STEP_OFFSET.saturating_mul(steps as u8 + 1);
                    *slot = anchor_score.saturating_sub(offset).max(MIN_SCORE);
                }
                for i in (0..a).rev() {
                    scores[i] = scores[i].max(scores[i + 1]);
                }
            }
            RepairStrategy::ClampMonotonic => {
                for i in 1..scores.len() {
                    scores[i] = scores[i].min(scores[i - 1]);
                }
            }
        }

        AgeScoreVector::try_new(scores)
    }
}

impl fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStrategy::InferFromAnchor { anchor } => write!(f, "{} (anchor {})", self.as_str(), anchor),
            RepairStrategy::ClampMonotonic => f.write_str(self.as_str()),
        }
    }
}

fn clamp_score(value: i64) -> u8 {
    value.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}
