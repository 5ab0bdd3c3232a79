//! Derived analysis variables
//!
//! Pure functions of already-recorded state. No randomness, no I/O.

use crate::core::{Bps, Money};
use crate::models::inputs::Allocation;
use crate::models::state::{ParticipantRoundState, Round};
use crate::orchestrator::ExperimentError;
use crate::outcome::draw::Regime;
use crate::outcome::engine::RoundOutcome;
use serde::{Deserialize, Serialize};

/// Relative return of a round: `(outcome − starting_value) / starting_value`
///
/// Rounded half-up to 4 decimal places (basis points). `None` when the
/// starting value is not positive.
pub fn performance(outcome: Money, starting_value: Money) -> Option<Bps> {
    outcome.relative_change_from(starting_value)
}

/// Change in risky allocation between rounds: `allocation_2 − allocation_1`
pub fn delta_risk(allocation_2: Allocation, allocation_1: Allocation) -> i16 {
    allocation_2.percent() as i16 - allocation_1.percent() as i16
}

/// Gain/loss framing for round 2: the round-1 regime, not an independent draw
pub fn paper_gain(regime_1: Regime) -> bool {
    regime_1.is_favorable()
}

/// Every field derived when a round is realized
///
/// Round 1 fills `paper_gain`; round 2 fills `delta_risk` and the
/// session totals (relative to `endowment_initial`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub performance: Bps,
    pub paper_gain: Option<bool>,
    pub delta_risk: Option<i16>,
    pub total_return: Option<Money>,
    pub total_return_rate: Option<Bps>,
}

impl DerivedMetrics {
    /// Compute the metrics that become available once `round` is realized
    pub fn for_round(
        round: Round,
        outcome: &RoundOutcome,
        state: &ParticipantRoundState,
    ) -> Result<Self, ExperimentError> {
        let performance = performance(outcome.outcome, outcome.starting_value).ok_or(
            ExperimentError::InvalidStartingValue {
                value: outcome.starting_value,
            },
        )?;

        match round {
            Round::One => Ok(Self {
                performance,
                paper_gain: Some(paper_gain(outcome.regime)),
                delta_risk: None,
                total_return: None,
                total_return_rate: None,
            }),
            Round::Two => {
                let allocation_1 = state.allocation(Round::One).ok_or_else(|| {
                    ExperimentError::StateValidation(
                        "round 2 realized without a round 1 allocation".to_string(),
                    )
                })?;
                let endowment = state.endowment_initial();

                Ok(Self {
                    performance,
                    paper_gain: None,
                    delta_risk: Some(delta_risk(outcome.allocation, allocation_1)),
                    total_return: Some(outcome.outcome - endowment),
                    total_return_rate: outcome.outcome.relative_change_from(endowment),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(percent: i64) -> Allocation {
        Allocation::new(percent).unwrap()
    }

    #[test]
    fn test_performance_four_places() {
        let perf = performance(Money::from_cents(11_180), Money::from_units(100)).unwrap();
        assert_eq!(perf, Bps::from_bps(1_180));
    }

    #[test]
    fn test_performance_undefined_for_zero_start() {
        assert_eq!(performance(Money::from_units(1), Money::ZERO), None);
    }

    #[test]
    fn test_delta_risk_sign_and_magnitude() {
        assert_eq!(delta_risk(alloc(70), alloc(30)), 40);
        assert_eq!(delta_risk(alloc(20), alloc(40)), -20);
        assert_eq!(delta_risk(alloc(0), alloc(100)), -100);
    }

    #[test]
    fn test_paper_gain_aliases_round_one_regime() {
        assert!(paper_gain(Regime::Favorable));
        assert!(!paper_gain(Regime::Unfavorable));
    }
}
