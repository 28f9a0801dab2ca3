/*!
 * Scene analysis of subtitle text.
 *
 * - `prompt`: request construction and subtitle truncation
 * - `analyzer`: the LLM call with bounded retries
 * - `response`: JSON extraction from free-form replies
 * - `normalizer`: mapping replies onto the canonical schema
 * - `consistency`: read-only audit of persisted analyses
 * - `repair`: explicit heuristic score repair
 */

pub mod analyzer;
pub mod consistency;
pub mod normalizer;
pub mod prompt;
pub mod repair;
pub mod response;

pub use analyzer::{AnalysisOutcome, ContentAnalyzer};
pub use consistency::{ConsistencyReport, ConsistencyValidator};
pub use normalizer::{MIN_SCENES, NormalizedAnalysis, normalize};
pub use prompt::AnalysisPromptTemplate;
pub use repair::RepairStrategy;
pub use response::extract_json_object;
