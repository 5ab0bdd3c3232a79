//! PyO3 wrapper for StepSequencer
//!
//! This module provides the Python interface to one participant's session.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{parse_beliefs_form, parse_demographics_form, to_json, to_py_err};
use crate::orchestrator::{Completion, ExperimentConfig, SessionSnapshot, StepSequencer};

/// Python wrapper for one participant's session
///
/// # Example (from Python)
///
/// ```python
/// from portfolio_experiment_core_rs import Session
///
/// session = Session('{"rng_seed": 42}', "P001")
/// session.advance()                  # -> "Decision1"
/// session.record_allocation(40)
/// session.advance()                  # -> "Reveal1", round 1 realized
/// print(session.view_json())
///
/// session.advance()
/// session.record_beliefs({"wta_sell": 11000, "belief_stock_prob": 55, "luck_vs_skill": 3})
/// ```
#[pyclass(name = "Session")]
pub struct PySession {
    inner: StepSequencer,
}

#[pymethods]
impl PySession {
    /// Start a session
    ///
    /// # Errors
    ///
    /// Raises RuntimeError if the config JSON is malformed or invalid, or the
    /// participant id is empty.
    #[new]
    fn new(config_json: &str, participant_id: &str) -> PyResult<Self> {
        let config = ExperimentConfig::from_json(config_json).map_err(to_py_err)?;
        let inner = StepSequencer::new(config, participant_id).map_err(to_py_err)?;
        Ok(PySession { inner })
    }

    /// Resume a session from `snapshot_json` under `config_json`
    #[staticmethod]
    fn restore(config_json: &str, snapshot_json: &str) -> PyResult<Self> {
        let config = ExperimentConfig::from_json(config_json).map_err(to_py_err)?;
        let snapshot = SessionSnapshot::from_json(snapshot_json).map_err(to_py_err)?;
        let inner = StepSequencer::restore(config, snapshot).map_err(to_py_err)?;
        Ok(PySession { inner })
    }

    fn participant_id(&self) -> String {
        self.inner.participant_id().to_string()
    }

    /// Name of the current step, e.g. "Decision1"
    fn current_step(&self) -> &'static str {
        self.inner.current_step().name()
    }

    fn is_complete(&self) -> bool {
        self.inner.completion() == Completion::Complete
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Record the allocation (integer percent) at a decision step
    ///
    /// Raises ValueError for a value outside [0, 100].
    fn record_allocation(&mut self, percent: i64) -> PyResult<u8> {
        self.inner
            .record_allocation(percent)
            .map(|allocation| allocation.percent())
            .map_err(to_py_err)
    }

    fn record_beliefs(&mut self, form: &Bound<'_, PyDict>) -> PyResult<()> {
        let form = parse_beliefs_form(form)?;
        self.inner.record_beliefs(form).map_err(to_py_err)
    }

    fn record_demographics(&mut self, form: &Bound<'_, PyDict>) -> PyResult<()> {
        let form = parse_demographics_form(form)?;
        self.inner.record_demographics(form).map_err(to_py_err)
    }

    /// Move to the next step and return its name
    fn advance(&mut self) -> PyResult<&'static str> {
        self.inner
            .advance()
            .map(|step| step.name())
            .map_err(to_py_err)
    }

    // ========================================================================
    // State Query Methods
    // ========================================================================

    /// Display values of the current step as JSON
    fn view_json(&self) -> PyResult<String> {
        let view = self.inner.view().map_err(to_py_err)?;
        to_json(&view)
    }

    /// Full participant record as JSON
    fn state_json(&self) -> PyResult<String> {
        to_json(self.inner.state())
    }

    /// Flat export row as JSON (money in cents, rates in basis points)
    fn export_row_json(&self) -> PyResult<String> {
        to_json(&self.inner.export_row())
    }

    fn events_json(&self) -> PyResult<String> {
        to_json(self.inner.events())
    }

    fn snapshot_json(&self) -> PyResult<String> {
        let snapshot = self.inner.snapshot().map_err(to_py_err)?;
        snapshot.to_json().map_err(to_py_err)
    }
}
