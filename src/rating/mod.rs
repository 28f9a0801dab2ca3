/*!
 * Canonical rating model shared by the analyzer, the store and the audit.
 */

pub mod age;
pub mod policy;
pub mod scene;

pub use age::{AgeBucket, AgeFlag, AgeFlagVector, AgeScoreVector, MAX_SCORE, MIN_SCORE};
pub use policy::FlagPolicy;
pub use scene::{Scene, Timestamp};
