//! Checkpoint - Save/Load Session State
//!
//! Enables serialization and deserialization of a participant's session so an
//! interrupted session resumes exactly where it stopped, including the
//! position of its random stream.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored session draws exactly what the original would have
//! - **Record Integrity**: realized rounds recompute to their stored values
//! - **Step Consistency**: the recorded fields are exactly those the step implies
//! - **Config Matching**: state can only be loaded with matching config

use crate::models::event::EventLog;
use crate::models::state::{ParticipantRoundState, Round};
use crate::orchestrator::engine::{ExperimentConfig, ExperimentError, Step, StepSequencer};
use crate::outcome::draw::ReturnRegimes;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

// ============================================================================
// Snapshot Structure
// ============================================================================

/// Complete session snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub participant_id: String,

    /// Step the participant is currently on
    pub step: Step,

    /// Record as written so far
    pub state: ParticipantRoundState,

    /// RNG state at time of snapshot (CRITICAL for determinism)
    pub rng_state: u64,

    /// Audit trail up to the snapshot
    pub events: EventLog,

    /// SHA256 hash of the session config (for validation)
    pub config_hash: String,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, ExperimentError> {
        serde_json::to_string(self)
            .map_err(|e| ExperimentError::Serialization(format!("Snapshot serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, ExperimentError> {
        serde_json::from_str(json).map_err(|e| {
            ExperimentError::Deserialization(format!("Snapshot deserialization failed: {}", e))
        })
    }
}

impl StepSequencer<RngManager> {
    /// Capture the session for later resumption
    pub fn snapshot(&self) -> Result<SessionSnapshot, ExperimentError> {
        Ok(SessionSnapshot {
            participant_id: self.participant_id().to_string(),
            step: self.current_step(),
            state: self.state().clone(),
            rng_state: self.rng().get_state(),
            events: self.events().clone(),
            config_hash: compute_config_hash(self.config())?,
        })
    }

    /// Resume a session from a snapshot taken under the same config
    ///
    /// # Errors
    /// - `ConfigMismatch` if `config` hashes differently from the snapshot's
    /// - `StateValidation` if the snapshot is internally inconsistent
    pub fn restore(
        config: ExperimentConfig,
        snapshot: SessionSnapshot,
    ) -> Result<Self, ExperimentError> {
        let regimes = config.regimes()?;

        let actual = compute_config_hash(&config)?;
        if actual != snapshot.config_hash {
            return Err(ExperimentError::ConfigMismatch {
                expected: snapshot.config_hash,
                actual,
            });
        }

        validate_snapshot(&snapshot, &regimes)?;

        info!(
            participant = %snapshot.participant_id,
            step = %snapshot.step,
            "session restored"
        );

        Ok(StepSequencer::from_parts(
            config,
            regimes,
            snapshot.step,
            snapshot.state,
            RngManager::new(snapshot.rng_state),
            snapshot.events,
        ))
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, ExperimentError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        ExperimentError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        ExperimentError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

fn require(condition: bool, message: impl FnOnce() -> String) -> Result<(), ExperimentError> {
    if condition {
        Ok(())
    } else {
        Err(ExperimentError::StateValidation(message()))
    }
}

/// Validate snapshot integrity
///
/// Checks:
/// - The record itself (recomputation under `regimes`)
/// - Step consistency: every field the step requires is recorded, and no
///   field of a later step is
/// - Exactly one regime draw logged per realized round
pub fn validate_snapshot(
    snapshot: &SessionSnapshot,
    regimes: &ReturnRegimes,
) -> Result<(), ExperimentError> {
    let state = &snapshot.state;
    let step = snapshot.step;

    // 1. Identity
    require(state.participant_id() == snapshot.participant_id, || {
        format!(
            "Snapshot participant {} does not own record {}",
            snapshot.participant_id,
            state.participant_id()
        )
    })?;
    require(snapshot.rng_state != 0, || "RNG state must be non-zero".to_string())?;

    // 2. Record invariants
    state.validate(regimes)?;

    // 3. Step consistency
    for round in Round::ALL {
        let (decision, reveal) = match round {
            Round::One => (Step::Decision1, Step::Reveal1),
            Round::Two => (Step::Decision2, Step::Reveal2),
        };
        let record = state.round(round);

        require(record.allocation().is_none() || step >= decision, || {
            format!("{} allocation recorded before step {}", round, decision)
        })?;
        require(record.is_realized() == (step >= reveal), || {
            format!("{} realization does not match step {}", round, step)
        })?;
    }

    require(state.beliefs().is_none() || step >= Step::Beliefs, || {
        format!("beliefs recorded before step {}", Step::Beliefs)
    })?;
    require(state.beliefs().is_some() || step <= Step::Beliefs, || {
        format!("step {} reached without beliefs", step)
    })?;
    require(state.demographics().is_none() || step >= Step::Demographics, || {
        format!("demographics recorded before step {}", Step::Demographics)
    })?;
    require(state.demographics().is_some() || step <= Step::Demographics, || {
        format!("step {} reached without demographics", step)
    })?;
    require(state.is_complete() == step.is_terminal(), || {
        format!("completion flag does not match step {}", step)
    })?;

    // 4. One draw per realized round
    for round in Round::ALL {
        let draws = snapshot
            .events
            .events_for_round(round)
            .into_iter()
            .filter(|e| e.event_type() == "RegimeDrawn")
            .count();
        let expected = usize::from(state.round(round).is_realized());
        require(draws == expected, || {
            format!("{} has {} logged draws, expected {}", round, draws, expected)
        })?;
    }

    Ok(())
}
