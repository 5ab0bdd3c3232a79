//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, str).

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde::Serialize;

use crate::core::Money;
use crate::models::inputs::{BeliefsForm, DemographicsForm};
use crate::orchestrator::ExperimentError;

// ========================================================================
// Error Conversion
// ========================================================================

/// Map an experiment error onto a Python exception
///
/// Recoverable input errors raise `ValueError` so the harness can re-prompt;
/// contract violations and corrupt state raise `RuntimeError`.
pub fn to_py_err(err: ExperimentError) -> PyErr {
    if err.is_recoverable() {
        PyErr::new::<PyValueError, _>(err.to_string())
    } else {
        PyErr::new::<PyRuntimeError, _>(err.to_string())
    }
}

pub fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| {
        to_py_err(ExperimentError::Serialization(format!(
            "JSON serialization failed: {}",
            e
        )))
    })
}

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

/// Extract a required field from a Python dict with clear error messages.
///
/// # Errors
/// Returns PyValueError if the field is missing or has the wrong type
fn extract_required<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<T>
where
    for<'py> T: FromPyObject<'py>,
{
    dict.get_item(key)?
        .ok_or_else(|| PyErr::new::<PyValueError, _>(format!("Missing required field '{}'", key)))?
        .extract()
}

/// Extract an optional field; `None` and a missing key are the same
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    for<'py> T: FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) if !value.is_none() => Ok(Some(value.extract()?)),
        _ => Ok(None),
    }
}

// ========================================================================
// Form Parsers
// ========================================================================

/// Convert the belief form dict
///
/// `wta_sell` arrives in cents, like every money value crossing the boundary.
pub fn parse_beliefs_form(form: &Bound<'_, PyDict>) -> PyResult<BeliefsForm> {
    Ok(BeliefsForm {
        wta_sell: Money::from_cents(extract_required(form, "wta_sell")?),
        belief_stock_prob: extract_required(form, "belief_stock_prob")?,
        luck_vs_skill: extract_required(form, "luck_vs_skill")?,
    })
}

pub fn parse_demographics_form(form: &Bound<'_, PyDict>) -> PyResult<DemographicsForm> {
    Ok(DemographicsForm {
        age: extract_required(form, "age")?,
        gender: extract_required(form, "gender")?,
        education: extract_required(form, "education")?,
        field_of_study: extract_optional(form, "field_of_study")?,
        risk_attitude: extract_required(form, "risk_attitude")?,
        investment_experience: extract_required(form, "investment_experience")?,
        decision_reasoning: extract_optional(form, "decision_reasoning")?,
    })
}
