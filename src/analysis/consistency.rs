/*!
 * Read-only consistency audit of a persisted movie.
 *
 * Works on stored records rather than typed vectors so out-of-range scores
 * and missing flag keys are visible. Violations fail the analysis step;
 * warnings are reported only. Nothing here writes.
 */

use serde::Serialize;
use std::fmt;

use crate::analysis::normalizer::MIN_SCENES;
use crate::database::{MovieRecord, SceneRecord};
use crate::rating::{AgeBucket, AgeFlag, FlagPolicy, MAX_SCORE, MIN_SCORE};

/// Flag deviation from the policy table that triggers a warning
const POLICY_DEVIATION_WARNING: u8 = 2;

/// Result of auditing one movie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub imdb_id: String,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations joined into one reason string
    pub fn violation_summary(&self) -> String {
        self.violations.join("; ")
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            write!(f, "{}: consistent", self.imdb_id)?;
        } else {
            write!(f, "{}: {} violation(s)", self.imdb_id, self.violations.len())?;
        }
        if !self.warnings.is_empty() {
            write!(f, ", {} warning(s)", self.warnings.len())?;
        }
        for v in &self.violations {
            write!(f, "\n  violation: {}", v)?;
        }
        for w in &self.warnings {
            write!(f, "\n  warning: {}", w)?;
        }
        Ok(())
    }
}

/// Audits persisted movies against the rating invariants
#[derive(Debug, Clone, Default)]
pub struct ConsistencyValidator {
    policy: FlagPolicy,
}

impl ConsistencyValidator {
    pub fn new(policy: FlagPolicy) -> Self {
        Self { policy }
    }

    /// Check a movie and its scenes
    pub fn check(&self, movie: &MovieRecord, scenes: &[SceneRecord]) -> ConsistencyReport {
        let mut report = ConsistencyReport {
            imdb_id: movie.imdb_id.clone(),
            ..Default::default()
        };

        let scores_valid = self.check_scores(movie, scenes, &mut report);

        if (1..MIN_SCENES).contains(&scenes.len()) {
            report.violations.push(format!(
                "{} scene(s) stored, a movie needs zero or at least {}",
                scenes.len(),
                MIN_SCENES
            ));
        }

        // Uniform flags are allowed only on uniformly calm movies
        let uniformly_calm = scores_valid
            && movie
                .age_scores()
                .is_some_and(|s| s.is_uniformly_calm(self.policy.calm_max_score));

        for scene in scenes {
            self.check_scene(scene, uniformly_calm, &mut report);
        }

        report
    }

    /// Returns whether the stored scores are present, in range and ordered
    fn check_scores(&self, movie: &MovieRecord, scenes: &[SceneRecord], report: &mut ConsistencyReport) -> bool {
        let Some(scores) = movie.scores else {
            if !scenes.is_empty() {
                report
                    .violations
                    .push("scenes are stored but the movie has no scores".to_string());
            }
            return false;
        };

        let mut valid = true;
        for (bucket, score) in AgeBucket::ALL.iter().zip(scores.iter()) {
            if !(MIN_SCORE as i64..=MAX_SCORE as i64).contains(score) {
                report.violations.push(format!(
                    "score for {} is {} (allowed {}-{})",
                    bucket, score, MIN_SCORE, MAX_SCORE
                ));
                valid = false;
            }
        }

        for (i, pair) in scores.windows(2).enumerate() {
            if pair[1] > pair[0] {
                report.violations.push(format!(
                    "scores increase with age: {}={} < {}={}",
                    AgeBucket::ALL[i],
                    pair[0],
                    AgeBucket::ALL[i + 1],
                    pair[1]
                ));
                valid = false;
            }
        }

        valid
    }

    fn check_scene(&self, scene: &SceneRecord, uniformly_calm: bool, report: &mut ConsistencyReport) {
        let label = format!("scene {} ({}-{})", scene.position + 1, scene.start_time, scene.end_time);

        let intensity_valid = (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&scene.intensity);
        if !intensity_valid {
            report.violations.push(format!(
                "{}: intensity {} outside {}-{}",
                label, scene.intensity, MIN_SCORE, MAX_SCORE
            ));
        }

        let mut complete = true;
        for bucket in AgeBucket::ALL {
            match scene.age_flags.get(bucket.as_str()) {
                None => {
                    report
                        .violations
                        .push(format!("{}: flag for {} is missing", label, bucket));
                    complete = false;
                }
                Some(value) if value.parse::<AgeFlag>().is_err() => {
                    report
                        .violations
                        .push(format!("{}: flag for {} is invalid ('{}')", label, bucket, value));
                    complete = false;
                }
                Some(_) => {}
            }
        }

        let Some(flags) = scene.flag_vector().filter(|_| complete) else {
            return;
        };

        if flags.is_uniform() && !uniformly_calm {
            report.violations.push(format!(
                "{}: every bucket is flagged {} but the movie is not uniformly calm",
                label,
                flags.get(AgeBucket::M24)
            ));
        }

        if let Some((younger, older)) = flags.first_severity_increase() {
            report.warnings.push(format!(
                "{}: flag severity increases from {} ({}) to {} ({})",
                label,
                younger,
                flags.get(younger),
                older,
                flags.get(older)
            ));
        }

        if intensity_valid {
            let expected = self.policy.expected(scene.intensity as u8);
            let distance = flags.max_distance(&expected);
            if distance >= POLICY_DEVIATION_WARNING {
                report.warnings.push(format!(
                    "{}: flags deviate from the intensity {} policy by {} levels",
                    label, scene.intensity, distance
                ));
            }
        }
    }
}
