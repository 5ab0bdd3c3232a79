//! Participant Round State
//!
//! The single record threaded through one participant's session. Every field
//! is written at most once, in step order, through a checked setter; there is
//! no way to overwrite a recorded value.
//!
//! # Critical Invariants
//!
//! 1. **Carry-forward**: round 2 starts from `outcome_1`, never from
//!    `endowment_initial`
//! 2. **Split conservation**: `safe_amount_r + risky_amount_r == starting_value_r`
//! 3. **Write-once**: allocation, regime, outcome and every derived field are
//!    set exactly once and never recomputed
//! 4. **No leakage**: a round's regime only exists after its allocation is
//!    recorded, because realization requires the allocation
//! 5. **Atomic writes**: a setter that fails leaves the record untouched

use crate::core::{Bps, Money};
use crate::models::inputs::{Allocation, Beliefs, Demographics};
use crate::orchestrator::ExperimentError;
use crate::outcome::draw::{Regime, ReturnRegimes};
use crate::outcome::engine::{realize, RoundOutcome};
use crate::outcome::metrics::DerivedMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two decision→reveal cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    One,
    Two,
}

impl Round {
    pub const ALL: [Round; 2] = [Round::One, Round::Two];

    /// 1-based round number
    pub fn number(self) -> u8 {
        match self {
            Round::One => 1,
            Round::Two => 2,
        }
    }

    fn slot(self) -> usize {
        self.number() as usize - 1
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}", self.number())
    }
}

/// Recorded values of one round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    allocation: Option<Allocation>,
    outcome: Option<RoundOutcome>,
    performance: Option<Bps>,
}

impl RoundRecord {
    pub fn allocation(&self) -> Option<Allocation> {
        self.allocation
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    pub fn performance(&self) -> Option<Bps> {
        self.performance
    }

    pub fn is_realized(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Complete per-participant record
///
/// # Example
///
/// ```rust
/// use portfolio_experiment_core_rs::{Allocation, Money, ParticipantRoundState, Round};
///
/// let mut state = ParticipantRoundState::new("P001".to_string(), Money::from_units(100));
/// state.record_allocation(Round::One, Allocation::new(40).unwrap()).unwrap();
///
/// // Writing the same field twice is a contract violation
/// assert!(state.record_allocation(Round::One, Allocation::new(50).unwrap()).is_err());
/// assert_eq!(state.allocation(Round::One).unwrap().percent(), 40);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRoundState {
    participant_id: String,
    endowment_initial: Money,
    rounds: [RoundRecord; 2],
    delta_risk: Option<i16>,
    paper_gain: Option<bool>,
    total_return: Option<Money>,
    total_return_rate: Option<Bps>,
    beliefs: Option<Beliefs>,
    demographics: Option<Demographics>,
    complete: bool,
}

fn violation(step: &str, detail: impl Into<String>) -> ExperimentError {
    ExperimentError::OutOfSequenceTransition {
        step: step.to_string(),
        detail: detail.into(),
    }
}

impl ParticipantRoundState {
    /// Create an empty record for a participant entering the flow
    pub fn new(participant_id: String, endowment_initial: Money) -> Self {
        Self {
            participant_id,
            endowment_initial,
            rounds: Default::default(),
            delta_risk: None,
            paper_gain: None,
            total_return: None,
            total_return_rate: None,
            beliefs: None,
            demographics: None,
            complete: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn endowment_initial(&self) -> Money {
        self.endowment_initial
    }

    pub fn round(&self, round: Round) -> &RoundRecord {
        &self.rounds[round.slot()]
    }

    pub fn allocation(&self, round: Round) -> Option<Allocation> {
        self.round(round).allocation
    }

    pub fn outcome(&self, round: Round) -> Option<&RoundOutcome> {
        self.round(round).outcome.as_ref()
    }

    /// Drawn regime of a round, available only once the round is realized
    pub fn regime(&self, round: Round) -> Option<Regime> {
        self.outcome(round).map(|outcome| outcome.regime)
    }

    pub fn performance(&self, round: Round) -> Option<Bps> {
        self.round(round).performance
    }

    /// Starting portfolio value of a round
    ///
    /// Round 1 starts from the endowment; round 2 from round 1's realized
    /// outcome (carry-forward), so it is `None` until round 1 is realized.
    pub fn starting_value(&self, round: Round) -> Option<Money> {
        match round {
            Round::One => Some(self.endowment_initial),
            Round::Two => self.outcome(Round::One).map(|outcome| outcome.outcome),
        }
    }

    pub fn delta_risk(&self) -> Option<i16> {
        self.delta_risk
    }

    pub fn paper_gain(&self) -> Option<bool> {
        self.paper_gain
    }

    pub fn total_return(&self) -> Option<Money> {
        self.total_return
    }

    pub fn total_return_rate(&self) -> Option<Bps> {
        self.total_return_rate
    }

    pub fn beliefs(&self) -> Option<&Beliefs> {
        self.beliefs.as_ref()
    }

    pub fn demographics(&self) -> Option<&Demographics> {
        self.demographics.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    // ========================================================================
    // Write-once setters
    // ========================================================================

    fn ensure_open(&self, what: &str) -> Result<(), ExperimentError> {
        if self.complete {
            return Err(violation(what, "record is complete and immutable"));
        }
        Ok(())
    }

    /// Record a round's allocation
    ///
    /// Round 2 only accepts an allocation once round 1 is realized.
    pub fn record_allocation(
        &mut self,
        round: Round,
        allocation: Allocation,
    ) -> Result<(), ExperimentError> {
        let what = format!("allocation_{}", round.number());
        self.ensure_open(&what)?;

        if self.allocation(round).is_some() {
            return Err(violation(&what, "allocation already recorded"));
        }
        if round == Round::Two && !self.round(Round::One).is_realized() {
            return Err(violation(&what, "round 1 has not been realized"));
        }

        self.rounds[round.slot()].allocation = Some(allocation);
        Ok(())
    }

    /// Check that `round` may be realized now and return its starting value
    ///
    /// Called before drawing so that no entropy is consumed for a realization
    /// that would be rejected.
    pub fn ensure_realizable(&self, round: Round) -> Result<Money, ExperimentError> {
        let what = format!("outcome_{}", round.number());
        self.ensure_open(&what)?;

        let record = self.round(round);
        if record.allocation.is_none() {
            return Err(violation(&what, "allocation has not been recorded"));
        }
        if record.is_realized() {
            return Err(violation(&what, "round already realized"));
        }

        let starting_value = self
            .starting_value(round)
            .ok_or_else(|| violation(&what, "previous round has not been realized"))?;
        if !starting_value.is_positive() {
            return Err(ExperimentError::InvalidStartingValue {
                value: starting_value,
            });
        }
        Ok(starting_value)
    }

    /// Record a realized round together with every field derived from it
    ///
    /// All checks run before the first write.
    pub fn record_realization(
        &mut self,
        round: Round,
        outcome: RoundOutcome,
        metrics: DerivedMetrics,
    ) -> Result<(), ExperimentError> {
        let starting_value = self.ensure_realizable(round)?;
        let what = format!("outcome_{}", round.number());

        if outcome.starting_value != starting_value {
            return Err(violation(
                &what,
                format!(
                    "starting value {} does not match carried value {}",
                    outcome.starting_value, starting_value
                ),
            ));
        }
        if Some(outcome.allocation) != self.allocation(round) {
            return Err(violation(&what, "outcome allocation differs from recorded"));
        }

        match round {
            Round::One => {
                if self.paper_gain.is_some() {
                    return Err(violation("paper_gain", "already recorded"));
                }
                if metrics.paper_gain.is_none() {
                    return Err(violation("paper_gain", "missing from round 1 metrics"));
                }
            }
            Round::Two => {
                if self.delta_risk.is_some() || self.total_return.is_some() {
                    return Err(violation("delta_risk", "already recorded"));
                }
                if metrics.delta_risk.is_none() || metrics.total_return.is_none() {
                    return Err(violation("delta_risk", "missing from round 2 metrics"));
                }
            }
        }

        let record = &mut self.rounds[round.slot()];
        record.outcome = Some(outcome);
        record.performance = Some(metrics.performance);

        match round {
            Round::One => self.paper_gain = metrics.paper_gain,
            Round::Two => {
                self.delta_risk = metrics.delta_risk;
                self.total_return = metrics.total_return;
                self.total_return_rate = metrics.total_return_rate;
            }
        }
        Ok(())
    }

    /// Record the between-rounds beliefs
    pub fn record_beliefs(&mut self, beliefs: Beliefs) -> Result<(), ExperimentError> {
        self.ensure_open("beliefs")?;
        if self.beliefs.is_some() {
            return Err(violation("beliefs", "already recorded"));
        }
        if !self.round(Round::One).is_realized() || self.allocation(Round::Two).is_some() {
            return Err(violation("beliefs", "only accepted between the rounds"));
        }
        self.beliefs = Some(beliefs);
        Ok(())
    }

    /// Record the demographic covariates
    pub fn record_demographics(&mut self, demographics: Demographics) -> Result<(), ExperimentError> {
        self.ensure_open("demographics")?;
        if self.demographics.is_some() {
            return Err(violation("demographics", "already recorded"));
        }
        if !self.round(Round::Two).is_realized() {
            return Err(violation("demographics", "round 2 has not been realized"));
        }
        self.demographics = Some(demographics);
        Ok(())
    }

    /// Freeze the record once the summary is reached
    pub fn mark_complete(&mut self) -> Result<(), ExperimentError> {
        self.ensure_open("complete")?;
        if self.demographics.is_none() {
            return Err(violation("complete", "demographics have not been recorded"));
        }
        self.complete = true;
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Verify every invariant of a (possibly partial) record
    ///
    /// Realized rounds are recomputed from their recorded regime, so a record
    /// loaded from storage is rejected unless it is exactly what the engine
    /// would have produced under `regimes`.
    pub fn validate(&self, regimes: &ReturnRegimes) -> Result<(), ExperimentError> {
        fn fail<T>(msg: String) -> Result<T, ExperimentError> {
            Err(ExperimentError::StateValidation(msg))
        }

        if !self.endowment_initial.is_positive() {
            return fail(format!(
                "endowment_initial {} is not positive",
                self.endowment_initial
            ));
        }

        for round in Round::ALL {
            let record = self.round(round);
            let Some(outcome) = record.outcome.as_ref() else {
                if record.performance.is_some() {
                    return fail(format!("performance set for unrealized {}", round));
                }
                continue;
            };

            if record.allocation != Some(outcome.allocation) {
                return fail(format!("{} outcome does not match its allocation", round));
            }
            if self.starting_value(round) != Some(outcome.starting_value) {
                return fail(format!("{} does not start from the carried value", round));
            }
            if outcome.safe_amount + outcome.risky_amount != outcome.starting_value {
                return fail(format!("{} split does not sum to starting value", round));
            }

            let draw = regimes.resolve(outcome.regime);
            let recomputed = realize(
                outcome.starting_value,
                outcome.allocation.percent() as i64,
                &draw,
            )
            .or_else(|e| fail(format!("{} cannot be recomputed: {}", round, e)))?;
            if &recomputed != outcome {
                return fail(format!("{} outcome differs from recomputation", round));
            }

            let expected_performance =
                crate::outcome::metrics::performance(outcome.outcome, outcome.starting_value);
            if record.performance != expected_performance {
                return fail(format!("{} performance differs from recomputation", round));
            }
        }

        if self.allocation(Round::Two).is_some() && !self.round(Round::One).is_realized() {
            return fail("allocation_2 recorded before round 1 was realized".to_string());
        }

        let expected_paper_gain = self
            .regime(Round::One)
            .map(crate::outcome::metrics::paper_gain);
        if self.paper_gain != expected_paper_gain {
            return fail("paper_gain does not reflect regime_1".to_string());
        }

        match (self.outcome(Round::One), self.outcome(Round::Two)) {
            (Some(_), Some(second)) => {
                let expected_delta = self
                    .allocation(Round::One)
                    .map(|first| crate::outcome::metrics::delta_risk(second.allocation, first));
                if self.delta_risk != expected_delta {
                    return fail("delta_risk differs from allocation_2 - allocation_1".to_string());
                }
                if self.total_return != Some(second.outcome - self.endowment_initial)
                    || self.total_return_rate
                        != second.outcome.relative_change_from(self.endowment_initial)
                {
                    return fail("total return differs from recomputation".to_string());
                }
            }
            _ => {
                if self.delta_risk.is_some()
                    || self.total_return.is_some()
                    || self.total_return_rate.is_some()
                {
                    return fail("round 2 metrics set before round 2 was realized".to_string());
                }
            }
        }

        if self.beliefs.is_some() && !self.round(Round::One).is_realized() {
            return fail("beliefs recorded before round 1 was realized".to_string());
        }
        if self.demographics.is_some() && !self.round(Round::Two).is_realized() {
            return fail("demographics recorded before round 2 was realized".to_string());
        }
        if self.complete && self.demographics.is_none() {
            return fail("record marked complete without demographics".to_string());
        }

        Ok(())
    }
}
