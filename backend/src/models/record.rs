//! Flat export row
//!
//! One row per participant; the columns are the record's attribute list.
//! Money columns are cents, rate columns are basis points, and anything not
//! yet recorded is `None` (an incomplete session exports as a partial row).

use crate::models::state::{ParticipantRoundState, Round};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub participant_id: String,
    pub endowment_initial: i64,

    pub allocation_1: Option<u8>,
    pub regime_1: Option<bool>,
    pub safe_amount_1: Option<i64>,
    pub risky_amount_1: Option<i64>,
    pub safe_value_end_1: Option<i64>,
    pub risky_value_end_1: Option<i64>,
    pub outcome_1: Option<i64>,
    pub performance_1: Option<i64>,

    pub allocation_2: Option<u8>,
    pub regime_2: Option<bool>,
    pub safe_amount_2: Option<i64>,
    pub risky_amount_2: Option<i64>,
    pub safe_value_end_2: Option<i64>,
    pub risky_value_end_2: Option<i64>,
    pub outcome_2: Option<i64>,
    pub performance_2: Option<i64>,

    pub delta_risk: Option<i16>,
    pub paper_gain: Option<bool>,
    pub total_return: Option<i64>,
    pub total_return_rate: Option<i64>,

    pub wta_sell: Option<i64>,
    pub belief_stock_prob: Option<u8>,
    pub luck_vs_skill: Option<u8>,

    pub age: Option<u8>,
    pub gender: Option<String>,
    pub education: Option<String>,
    pub field_of_study: Option<String>,
    pub risk_attitude: Option<u8>,
    pub investment_experience: Option<String>,
    pub decision_reasoning: Option<String>,

    pub complete: bool,
}

/// Per-round columns, in export order
struct RoundColumns {
    allocation: Option<u8>,
    regime: Option<bool>,
    safe_amount: Option<i64>,
    risky_amount: Option<i64>,
    safe_value_end: Option<i64>,
    risky_value_end: Option<i64>,
    outcome: Option<i64>,
    performance: Option<i64>,
}

fn round_columns(state: &ParticipantRoundState, round: Round) -> RoundColumns {
    let record = state.round(round);
    let outcome = record.outcome();

    RoundColumns {
        allocation: record.allocation().map(|a| a.percent()),
        regime: outcome.map(|o| o.regime.is_favorable()),
        safe_amount: outcome.map(|o| o.safe_amount.cents()),
        risky_amount: outcome.map(|o| o.risky_amount.cents()),
        safe_value_end: outcome.map(|o| o.safe_value_end.cents()),
        risky_value_end: outcome.map(|o| o.risky_value_end.cents()),
        outcome: outcome.map(|o| o.outcome.cents()),
        performance: record.performance().map(|p| p.value()),
    }
}

impl From<&ParticipantRoundState> for ExportRow {
    fn from(state: &ParticipantRoundState) -> Self {
        let first = round_columns(state, Round::One);
        let second = round_columns(state, Round::Two);
        let beliefs = state.beliefs();
        let demographics = state.demographics();

        ExportRow {
            participant_id: state.participant_id().to_string(),
            endowment_initial: state.endowment_initial().cents(),

            allocation_1: first.allocation,
            regime_1: first.regime,
            safe_amount_1: first.safe_amount,
            risky_amount_1: first.risky_amount,
            safe_value_end_1: first.safe_value_end,
            risky_value_end_1: first.risky_value_end,
            outcome_1: first.outcome,
            performance_1: first.performance,

            allocation_2: second.allocation,
            regime_2: second.regime,
            safe_amount_2: second.safe_amount,
            risky_amount_2: second.risky_amount,
            safe_value_end_2: second.safe_value_end,
            risky_value_end_2: second.risky_value_end,
            outcome_2: second.outcome,
            performance_2: second.performance,

            delta_risk: state.delta_risk(),
            paper_gain: state.paper_gain(),
            total_return: state.total_return().map(|m| m.cents()),
            total_return_rate: state.total_return_rate().map(|r| r.value()),

            wta_sell: beliefs.map(|b| b.wta_sell.cents()),
            belief_stock_prob: beliefs.map(|b| b.belief_stock_prob),
            luck_vs_skill: beliefs.map(|b| b.luck_vs_skill),

            age: demographics.map(|d| d.age),
            gender: demographics.map(|d| d.gender.as_str().to_string()),
            education: demographics.map(|d| d.education.as_str().to_string()),
            field_of_study: demographics.and_then(|d| d.field_of_study.clone()),
            risk_attitude: demographics.map(|d| d.risk_attitude),
            investment_experience: demographics
                .map(|d| d.investment_experience.as_str().to_string()),
            decision_reasoning: demographics.and_then(|d| d.decision_reasoning.clone()),

            complete: state.is_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Money;

    #[test]
    fn test_empty_record_exports_partial_row() {
        let state = ParticipantRoundState::new("P042".to_string(), Money::from_units(100));
        let row = ExportRow::from(&state);

        assert_eq!(row.participant_id, "P042");
        assert_eq!(row.endowment_initial, 10_000);
        assert_eq!(row.allocation_1, None);
        assert_eq!(row.outcome_2, None);
        assert!(!row.complete);
    }
}
