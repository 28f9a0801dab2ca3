/*!
 * The ingestion pipeline.
 *
 * - `state`: workflow states and per-run reports
 * - `orchestrator`: the resumable state machine and operator actions
 */

pub mod orchestrator;
pub mod state;

pub use orchestrator::{IngestionOrchestrator, MANUAL_SOURCE};
pub use state::{DuplicateRef, IngestionReport, StepFailure, WorkflowState};
