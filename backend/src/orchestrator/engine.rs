//! Step Sequencer
//!
//! Drives one participant through the fixed, linear sequence of steps and
//! owns the write permission for every field of their record.
//!
//! # Architecture
//!
//! ```text
//! Welcome → Decision1 → Reveal1 → Beliefs → Decision2 → Reveal2 → Demographics → Summary
//!
//! Decision_r : record_allocation(percent)        (validated, write-once)
//! → Reveal_r : entering it runs, exactly once,
//!              1. draw the regime            (one Bernoulli trial)
//!              2. realize the round          (RoundOutcomeEngine)
//!              3. derive metrics             (performance, paper gain / delta risk)
//!              4. write all of it atomically into the record
//! Beliefs    : record_beliefs(form)
//! Demographics: record_demographics(form)
//! → Summary  : record frozen
//! ```
//!
//! Transitions only go forward. Leaving a step requires that step's input to
//! be recorded; a rejected transition leaves the session exactly as it was.
//! Views of the reveal steps read the recorded outcome and never draw again.
//!
//! # Example
//!
//! ```rust
//! use portfolio_experiment_core_rs::orchestrator::{ExperimentConfig, Step, StepSequencer};
//!
//! let mut session = StepSequencer::new(ExperimentConfig::default(), "P001").unwrap();
//!
//! session.advance().unwrap(); // Welcome → Decision1
//! session.record_allocation(40).unwrap();
//! assert_eq!(session.advance().unwrap(), Step::Reveal1);
//!
//! let outcome = session.state().outcome(portfolio_experiment_core_rs::Round::One).unwrap();
//! println!("Round 1 portfolio: {}", outcome.outcome);
//! ```

use crate::core::{Bps, Money, BPS_PER_UNIT};
use crate::models::event::{Event, EventLog};
use crate::models::inputs::{Allocation, BeliefsForm, DemographicsForm};
use crate::models::record::ExportRow;
use crate::models::state::{ParticipantRoundState, Round};
use crate::orchestrator::checkpoint::compute_config_hash;
use crate::outcome::draw::ReturnRegimes;
use crate::outcome::engine::realize;
use crate::outcome::metrics::DerivedMetrics;
use crate::rng::{RandomSource, RngManager};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Session configuration
///
/// Defaults: 100.00 endowment, +3% safe bond,
/// +29% / −15% tech stock, 50/50 regime draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Endowment of round 1 (cents)
    pub initial_endowment: Money,

    /// Safe asset return in basis points (applies in both regimes)
    pub safe_return_bps: i64,

    /// Risky asset return in the favorable regime (basis points)
    pub risky_gain_bps: i64,

    /// Risky asset return in the unfavorable regime (basis points, negative for a loss)
    pub risky_loss_bps: i64,

    /// Probability of the favorable regime (basis points, strictly between 0 and 10_000)
    pub favorable_probability_bps: i64,

    /// Session seed; each participant's stream is derived from it
    pub rng_seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            initial_endowment: Money::from_units(100),
            safe_return_bps: 300,
            risky_gain_bps: 2_900,
            risky_loss_bps: -1_500,
            favorable_probability_bps: 5_000,
            rng_seed: 0,
        }
    }
}

impl ExperimentConfig {
    /// Largest accepted endowment (1 000 000 000.00)
    pub const MAX_INITIAL_ENDOWMENT: Money = Money::from_units(1_000_000_000);

    /// Largest accepted return per round (+10 000%)
    ///
    /// With the endowment bound, two rounds at this return stay far inside
    /// the i64 cent range.
    pub const MAX_RETURN_BPS: i64 = 1_000_000;

    /// Parse a JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, ExperimentError> {
        let config: ExperimentConfig = serde_json::from_str(json)
            .map_err(|e| ExperimentError::Deserialization(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if !self.initial_endowment.is_positive()
            || self.initial_endowment > Self::MAX_INITIAL_ENDOWMENT
        {
            return Err(ExperimentError::InvalidConfig(format!(
                "initial_endowment must be in (0, {}], got {}",
                Self::MAX_INITIAL_ENDOWMENT,
                self.initial_endowment
            )));
        }

        if self.favorable_probability_bps <= 0 || self.favorable_probability_bps >= BPS_PER_UNIT {
            return Err(ExperimentError::InvalidConfig(format!(
                "favorable_probability_bps must be in (0, {}), got {}",
                BPS_PER_UNIT, self.favorable_probability_bps
            )));
        }

        for (name, value) in [
            ("safe_return_bps", self.safe_return_bps),
            ("risky_gain_bps", self.risky_gain_bps),
            ("risky_loss_bps", self.risky_loss_bps),
        ] {
            if value <= -BPS_PER_UNIT || value > Self::MAX_RETURN_BPS {
                return Err(ExperimentError::InvalidConfig(format!(
                    "{} must be in (-{}, {}], got {}",
                    name,
                    BPS_PER_UNIT,
                    Self::MAX_RETURN_BPS,
                    value
                )));
            }
        }

        Ok(())
    }

    /// Regime configuration derived from the returns of a valid config
    pub fn regimes(&self) -> Result<ReturnRegimes, ExperimentError> {
        self.validate()?;

        let multiplier = |name: &str, bps: i64| {
            Bps::from_bps(bps).growth_factor().ok_or_else(|| {
                ExperimentError::InvalidConfig(format!("{} overflows its multiplier", name))
            })
        };

        Ok(ReturnRegimes {
            favorable_probability: Bps::from_bps(self.favorable_probability_bps),
            safe_multiplier: multiplier("safe_return_bps", self.safe_return_bps)?,
            risky_favorable_multiplier: multiplier("risky_gain_bps", self.risky_gain_bps)?,
            risky_unfavorable_multiplier: multiplier("risky_loss_bps", self.risky_loss_bps)?,
        })
    }

    /// SHA-256 of the canonical JSON form
    pub fn config_hash(&self) -> Result<String, ExperimentError> {
        compute_config_hash(self)
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Steps of the flow, in their only permitted order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    Welcome,
    Decision1,
    Reveal1,
    Beliefs,
    Decision2,
    Reveal2,
    Demographics,
    Summary,
}

impl Step {
    pub const SEQUENCE: [Step; 8] = [
        Step::Welcome,
        Step::Decision1,
        Step::Reveal1,
        Step::Beliefs,
        Step::Decision2,
        Step::Reveal2,
        Step::Demographics,
        Step::Summary,
    ];

    /// Position in the sequence (0-indexed)
    pub fn index(self) -> usize {
        self as usize
    }

    /// The following step, `None` at `Summary`
    pub fn next(self) -> Option<Step> {
        Self::SEQUENCE.get(self.index() + 1).copied()
    }

    /// Round whose allocation is collected at this step
    pub fn decision_round(self) -> Option<Round> {
        match self {
            Step::Decision1 => Some(Round::One),
            Step::Decision2 => Some(Round::Two),
            _ => None,
        }
    }

    /// Round realized when this step is entered
    pub fn reveal_round(self) -> Option<Round> {
        match self {
            Step::Reveal1 => Some(Round::One),
            Step::Reveal2 => Some(Round::Two),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Step::Summary
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Welcome => "Welcome",
            Step::Decision1 => "Decision1",
            Step::Reveal1 => "Reveal1",
            Step::Beliefs => "Beliefs",
            Step::Decision2 => "Decision2",
            Step::Reveal2 => "Reveal2",
            Step::Demographics => "Demographics",
            Step::Summary => "Summary",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the participant reached the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    Complete,
    /// Abandoned or still in progress at `at`
    Incomplete { at: Step },
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the experiment core
///
/// `InvalidAllocation`, `InvalidStartingValue` and `InvalidField` are
/// recoverable: the harness re-prompts or halts the session. Everything else
/// is a contract violation by the caller or corrupt stored state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExperimentError {
    #[error("Invalid allocation {value}: must be an integer percent in [0, 100]")]
    InvalidAllocation { value: i64 },

    #[error("Invalid starting value {value}: a round must start from a positive portfolio")]
    InvalidStartingValue { value: Money },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Out-of-sequence transition at {step}: {detail}")]
    OutOfSequenceTransition { step: String, detail: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Config mismatch: expected hash {expected}, got {actual}")]
    ConfigMismatch { expected: String, actual: String },

    #[error("State validation error: {0}")]
    StateValidation(String),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),
}

impl ExperimentError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExperimentError::InvalidAllocation { .. }
                | ExperimentError::InvalidStartingValue { .. }
                | ExperimentError::InvalidField { .. }
        )
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// One participant's session
///
/// Generic over the random source so tests can inject a scripted or seeded
/// one; production sessions use [`RngManager`] derived from the session seed.
pub struct StepSequencer<R: RandomSource = RngManager> {
    config: ExperimentConfig,
    regimes: ReturnRegimes,
    step: Step,
    state: ParticipantRoundState,
    rng: R,
    events: EventLog,
}

impl StepSequencer<RngManager> {
    /// Start a session with the participant's own seeded stream
    pub fn new(
        config: ExperimentConfig,
        participant_id: impl Into<String>,
    ) -> Result<Self, ExperimentError> {
        let participant_id = participant_id.into();
        let rng = RngManager::for_participant(config.rng_seed, &participant_id);
        Self::with_rng(config, participant_id, rng)
    }
}

impl<R: RandomSource> StepSequencer<R> {
    /// Start a session with an injected random source
    pub fn with_rng(
        config: ExperimentConfig,
        participant_id: impl Into<String>,
        rng: R,
    ) -> Result<Self, ExperimentError> {
        let regimes = config.regimes()?;

        let participant_id = participant_id.into();
        if participant_id.trim().is_empty() {
            return Err(ExperimentError::InvalidConfig(
                "participant id must not be empty".to_string(),
            ));
        }

        let state = ParticipantRoundState::new(participant_id, config.initial_endowment);
        let mut events = EventLog::new();
        events.log(Event::StepEntered {
            step_index: Step::Welcome.index(),
            step: Step::Welcome,
        });

        info!(participant = state.participant_id(), "session started");

        Ok(Self {
            regimes,
            config,
            step: Step::Welcome,
            state,
            rng,
            events,
        })
    }

    /// Reassemble a session from already-validated parts (checkpoint restore)
    pub(crate) fn from_parts(
        config: ExperimentConfig,
        regimes: ReturnRegimes,
        step: Step,
        state: ParticipantRoundState,
        rng: R,
        events: EventLog,
    ) -> Self {
        Self {
            regimes,
            config,
            step,
            state,
            rng,
            events,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn regimes(&self) -> &ReturnRegimes {
        &self.regimes
    }

    pub fn current_step(&self) -> Step {
        self.step
    }

    pub fn state(&self) -> &ParticipantRoundState {
        &self.state
    }

    pub fn participant_id(&self) -> &str {
        self.state.participant_id()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn completion(&self) -> Completion {
        if self.step.is_terminal() {
            Completion::Complete
        } else {
            Completion::Incomplete { at: self.step }
        }
    }

    pub fn export_row(&self) -> ExportRow {
        ExportRow::from(&self.state)
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    fn reject(&self, detail: impl Into<String>) -> ExperimentError {
        let detail = detail.into();
        warn!(
            participant = self.participant_id(),
            step = %self.step,
            detail = %detail,
            "rejected out-of-sequence operation"
        );
        ExperimentError::OutOfSequenceTransition {
            step: self.step.name().to_string(),
            detail,
        }
    }

    /// Record the allocation for the current decision step
    ///
    /// # Errors
    /// - `InvalidAllocation` if `percent` is outside [0, 100] (re-prompt)
    /// - `OutOfSequenceTransition` outside a decision step or on a second submission
    pub fn record_allocation(&mut self, percent: i64) -> Result<Allocation, ExperimentError> {
        let round = self
            .step
            .decision_round()
            .ok_or_else(|| self.reject("allocations are only accepted at a decision step"))?;

        let allocation = Allocation::new(percent)?;
        self.state.record_allocation(round, allocation)?;

        self.events.log(Event::AllocationRecorded {
            step_index: self.step.index(),
            round,
            allocation,
        });
        debug!(
            participant = self.participant_id(),
            round = round.number(),
            allocation = allocation.percent(),
            "allocation recorded"
        );
        Ok(allocation)
    }

    /// Record the belief-elicitation answers
    pub fn record_beliefs(&mut self, form: BeliefsForm) -> Result<(), ExperimentError> {
        if self.step != Step::Beliefs {
            return Err(self.reject("beliefs are only accepted at the Beliefs step"));
        }

        let beliefs = form.validate()?;
        self.state.record_beliefs(beliefs)?;

        self.events.log(Event::BeliefsRecorded {
            step_index: self.step.index(),
        });
        debug!(participant = self.participant_id(), "beliefs recorded");
        Ok(())
    }

    /// Record the demographic covariates
    pub fn record_demographics(&mut self, form: DemographicsForm) -> Result<(), ExperimentError> {
        if self.step != Step::Demographics {
            return Err(self.reject("demographics are only accepted at the Demographics step"));
        }

        let demographics = form.validate()?;
        self.state.record_demographics(demographics)?;

        self.events.log(Event::DemographicsRecorded {
            step_index: self.step.index(),
        });
        debug!(participant = self.participant_id(), "demographics recorded");
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Move to the next step
    ///
    /// Entering a reveal step realizes that round. On any error the step and
    /// the record are unchanged.
    pub fn advance(&mut self) -> Result<Step, ExperimentError> {
        let from = self.step;
        let to = from
            .next()
            .ok_or_else(|| self.reject("Summary is the terminal step"))?;

        self.check_exit(from)?;

        if let Some(round) = to.reveal_round() {
            self.realize_round(round, to)?;
        }
        if to.is_terminal() {
            self.state.mark_complete()?;
        }

        self.step = to;
        self.events.log(Event::StepEntered {
            step_index: to.index(),
            step: to,
        });

        if to.is_terminal() {
            let final_value = self
                .state
                .outcome(Round::Two)
                .map(|o| o.outcome)
                .unwrap_or(Money::ZERO);
            self.events.log(Event::SessionCompleted {
                step_index: to.index(),
                final_value,
            });
        }

        info!(
            participant = self.participant_id(),
            from = %from,
            to = %to,
            "step advanced"
        );
        Ok(to)
    }

    /// Guard for leaving `from`: its input must be recorded
    fn check_exit(&self, from: Step) -> Result<(), ExperimentError> {
        let ready = match from {
            Step::Welcome => true,
            Step::Decision1 | Step::Decision2 => from
                .decision_round()
                .is_some_and(|round| self.state.allocation(round).is_some()),
            Step::Reveal1 | Step::Reveal2 => from
                .reveal_round()
                .is_some_and(|round| self.state.round(round).is_realized()),
            Step::Beliefs => self.state.beliefs().is_some(),
            Step::Demographics => self.state.demographics().is_some(),
            Step::Summary => false,
        };

        if ready {
            Ok(())
        } else {
            Err(self.reject(format!("cannot leave {} before its input is recorded", from)))
        }
    }

    /// Draw, realize and derive one round, then write it into the record
    fn realize_round(&mut self, round: Round, reveal: Step) -> Result<(), ExperimentError> {
        // Checked before drawing: a rejected realization must not consume entropy
        let starting_value = self.state.ensure_realizable(round)?;
        let allocation = self
            .state
            .allocation(round)
            .ok_or_else(|| self.reject("allocation missing at realization"))?;

        let draw = self.regimes.draw(&mut self.rng);
        let outcome = realize(starting_value, allocation.percent() as i64, &draw)?;
        let metrics = DerivedMetrics::for_round(round, &outcome, &self.state)?;
        self.state.record_realization(round, outcome, metrics)?;

        self.events.log(Event::RegimeDrawn {
            step_index: reveal.index(),
            round,
            regime: draw.regime,
        });
        self.events.log(Event::RoundRealized {
            step_index: reveal.index(),
            round,
            starting_value,
            outcome: outcome.outcome,
            performance: metrics.performance,
        });

        info!(
            participant = self.participant_id(),
            round = round.number(),
            allocation = allocation.percent(),
            regime = %draw.regime,
            starting_value = %starting_value,
            outcome = %outcome.outcome,
            performance = %metrics.performance.percent_string(),
            "round realized"
        );
        Ok(())
    }
}

impl<R: RandomSource> fmt::Debug for StepSequencer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSequencer")
            .field("participant_id", &self.participant_id())
            .field("step", &self.step)
            .field("event_count", &self.events.len())
            .finish()
    }
}
