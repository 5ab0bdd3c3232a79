//! Per-step display values
//!
//! Everything a step page shows is read from the recorded state. Building a
//! view never draws and never writes, so what a participant sees on a reveal
//! page is exactly what was persisted for that round.

use crate::core::{Bps, Money};
use crate::models::state::{ParticipantRoundState, Round};
use crate::orchestrator::engine::{ExperimentError, Step, StepSequencer};
use crate::outcome::draw::Regime;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Recorded outcome of one round as displayed on its reveal page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealView {
    pub round: u8,
    pub starting_value: Money,
    pub allocation: u8,
    pub safe_amount: Money,
    pub risky_amount: Money,
    pub safe_value_end: Money,
    pub risky_value_end: Money,
    pub outcome: Money,
    pub regime: Regime,
    /// Signed risky return, e.g. "+29%"
    pub risky_return_label: String,
    /// Round performance, e.g. "11.80%"
    pub performance_percent: String,
    pub performance: Bps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step")]
pub enum StepView {
    Welcome {
        endowment: Money,
    },
    Decision1 {
        current_portfolio: Money,
    },
    Reveal1(RevealView),
    Beliefs {
        current_portfolio: Money,
    },
    Decision2 {
        current_portfolio: Money,
        round_1_gain: bool,
        round_1_performance_percent: String,
        /// Suggested 50/50 split of the current portfolio
        default_safe_amount: Money,
        default_risky_amount: Money,
    },
    Reveal2(RevealView),
    Demographics,
    Summary {
        endowment_initial: Money,
        outcome_1: Money,
        final_outcome: Money,
        total_return: Money,
        total_return_rate: Bps,
        regime_1: Regime,
        regime_2: Regime,
    },
}

fn missing(step: Step, what: &str) -> ExperimentError {
    ExperimentError::StateValidation(format!("{} view needs {} which is not recorded", step, what))
}

fn reveal_view(
    state: &ParticipantRoundState,
    round: Round,
    step: Step,
) -> Result<RevealView, ExperimentError> {
    let outcome = state
        .outcome(round)
        .ok_or_else(|| missing(step, "the round outcome"))?;
    let performance = state
        .performance(round)
        .ok_or_else(|| missing(step, "the round performance"))?;

    Ok(RevealView {
        round: round.number(),
        starting_value: outcome.starting_value,
        allocation: outcome.allocation.percent(),
        safe_amount: outcome.safe_amount,
        risky_amount: outcome.risky_amount,
        safe_value_end: outcome.safe_value_end,
        risky_value_end: outcome.risky_value_end,
        outcome: outcome.outcome,
        regime: outcome.regime,
        risky_return_label: outcome.risky_return().signed_percent_label(),
        performance_percent: performance.percent_string(),
        performance,
    })
}

/// Build the display values of `step` from `state`
pub fn build_view(state: &ParticipantRoundState, step: Step) -> Result<StepView, ExperimentError> {
    let portfolio = |round: Round| {
        state
            .outcome(round)
            .map(|o| o.outcome)
            .ok_or_else(|| missing(step, "the previous round outcome"))
    };

    Ok(match step {
        Step::Welcome => StepView::Welcome {
            endowment: state.endowment_initial(),
        },
        Step::Decision1 => StepView::Decision1 {
            current_portfolio: state.endowment_initial(),
        },
        Step::Reveal1 => StepView::Reveal1(reveal_view(state, Round::One, step)?),
        Step::Beliefs => StepView::Beliefs {
            current_portfolio: portfolio(Round::One)?,
        },
        Step::Decision2 => {
            let current_portfolio = portfolio(Round::One)?;
            let round_1_gain = state.paper_gain().ok_or_else(|| missing(step, "paper_gain"))?;
            let performance = state
                .performance(Round::One)
                .ok_or_else(|| missing(step, "performance_1"))?;
            let default_risky_amount = current_portfolio.percent_of(50).ok_or_else(|| {
                ExperimentError::ArithmeticOverflow(format!(
                    "half of {} does not fit",
                    current_portfolio
                ))
            })?;

            StepView::Decision2 {
                current_portfolio,
                round_1_gain,
                round_1_performance_percent: performance.percent_string(),
                default_safe_amount: current_portfolio - default_risky_amount,
                default_risky_amount,
            }
        }
        Step::Reveal2 => StepView::Reveal2(reveal_view(state, Round::Two, step)?),
        Step::Demographics => StepView::Demographics,
        Step::Summary => StepView::Summary {
            endowment_initial: state.endowment_initial(),
            outcome_1: portfolio(Round::One)?,
            final_outcome: portfolio(Round::Two)?,
            total_return: state
                .total_return()
                .ok_or_else(|| missing(step, "total_return"))?,
            total_return_rate: state
                .total_return_rate()
                .ok_or_else(|| missing(step, "total_return_rate"))?,
            regime_1: state
                .regime(Round::One)
                .ok_or_else(|| missing(step, "regime_1"))?,
            regime_2: state
                .regime(Round::Two)
                .ok_or_else(|| missing(step, "regime_2"))?,
        },
    })
}

impl<R: RandomSource> StepSequencer<R> {
    /// Display values of the current step
    pub fn view(&self) -> Result<StepView, ExperimentError> {
        build_view(self.state(), self.current_step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_view_requires_realized_round() {
        let state = ParticipantRoundState::new("P001".to_string(), Money::from_units(100));

        assert!(matches!(
            build_view(&state, Step::Reveal1),
            Err(ExperimentError::StateValidation(_))
        ));
        assert_eq!(
            build_view(&state, Step::Decision1).unwrap(),
            StepView::Decision1 {
                current_portfolio: Money::from_units(100)
            }
        );
    }

    #[test]
    fn test_view_serializes_with_step_tag() {
        let json = serde_json::to_string(&StepView::Demographics).unwrap();
        assert_eq!(json, r#"{"step":"Demographics"}"#);
    }
}
