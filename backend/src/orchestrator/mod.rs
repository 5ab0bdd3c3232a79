//! Orchestrator - the participant's step flow
//!
//! - **engine**: the step sequencer, its config and error type
//! - **view**: read-only display values per step
//! - **checkpoint**: snapshot / restore of a session

pub mod checkpoint;
pub mod engine;
pub mod view;

#[cfg(test)]
mod tests;

pub use engine::{Completion, ExperimentConfig, ExperimentError, Step, StepSequencer};
pub use view::{build_view, RevealView, StepView};

pub use checkpoint::{compute_config_hash, validate_snapshot, SessionSnapshot};
