//! Portfolio Experiment Core - Rust Engine
//!
//! Two-round portfolio-choice experiment: a participant splits an endowment
//! between a safe bond and a risky stock, sees a randomly drawn outcome,
//! and then decides again starting from that outcome.
//!
//! # Architecture
//!
//! - **core**: Fixed-point money and basis-point rates
//! - **models**: Participant record, typed inputs, event log, export row
//! - **outcome**: Regime draw, round realization, derived metrics
//! - **orchestrator**: Step sequencer, views and checkpoints
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. All randomness is deterministic (seeded RNG) and drawn once per round
//! 3. Every recorded field is written once, in step order
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod outcome;
pub mod rng;

// Re-exports for convenience
pub use core::{Bps, Money};
pub use models::{
    event::{Event, EventLog},
    inputs::{Allocation, Beliefs, BeliefsForm, Demographics, DemographicsForm},
    record::ExportRow,
    state::{ParticipantRoundState, Round},
};
pub use orchestrator::{
    Completion, ExperimentConfig, ExperimentError, SessionSnapshot, Step, StepSequencer, StepView,
};
pub use outcome::{realize, DrawResult, Regime, ReturnRegimes, RoundOutcome};
pub use rng::{RandomSource, RngManager};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn portfolio_experiment_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::session::PySession>()?;
    Ok(())
}
