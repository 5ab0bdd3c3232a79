//! Step Sequencer Tests
//!
//! Critical invariants tested:
//! - Linear flow: no skipping, no going back
//! - Exit guards: a step's input must be recorded before leaving it
//! - Carry-forward: round 2 starts from round 1's outcome
//! - Atomicity: a rejected operation leaves the session unchanged
//! - Completion: only a session that reached Summary is complete

use portfolio_experiment_core_rs::{
    BeliefsForm, Bps, Completion, DemographicsForm, ExperimentConfig, ExperimentError, Money,
    RandomSource, Regime, Round, Step, StepSequencer, StepView,
};
use std::collections::VecDeque;

// ============================================================================
// Test Helpers
// ============================================================================

/// Random source replaying a fixed list of regime outcomes
struct Scripted(VecDeque<bool>);

impl RandomSource for Scripted {
    fn bernoulli(&mut self, _probability: Bps) -> bool {
        self.0.pop_front().expect("script ran out of draws")
    }
}

/// Config of the worked scenario: +3% bond, +25% / -15% stock
fn scenario_config() -> ExperimentConfig {
    ExperimentConfig {
        risky_gain_bps: 2_500,
        ..Default::default()
    }
}

fn scripted_session(draws: &[bool]) -> StepSequencer<Scripted> {
    StepSequencer::with_rng(
        scenario_config(),
        "P001",
        Scripted(draws.iter().copied().collect()),
    )
    .unwrap()
}

fn beliefs() -> BeliefsForm {
    BeliefsForm {
        wta_sell: Money::from_cents(11_500),
        belief_stock_prob: 65,
        luck_vs_skill: 3,
    }
}

fn demographics() -> DemographicsForm {
    DemographicsForm {
        age: 24,
        gender: "other".to_string(),
        education: "bachelor".to_string(),
        field_of_study: Some("physics".to_string()),
        risk_attitude: 7,
        investment_experience: "none".to_string(),
        decision_reasoning: Some("locked in the gain".to_string()),
    }
}

/// Advance a session to the start of Decision2 with the scenario's round 1
fn through_round_one(session: &mut StepSequencer<Scripted>) {
    session.advance().unwrap();
    session.record_allocation(40).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();
    session.record_beliefs(beliefs()).unwrap();
    session.advance().unwrap();
}

// ============================================================================
// Worked scenario
// ============================================================================

#[test]
fn test_two_round_scenario_end_to_end() {
    let mut session = scripted_session(&[true, false]);
    assert_eq!(session.current_step(), Step::Welcome);

    session.advance().unwrap();
    session.record_allocation(40).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Reveal1);

    let state = session.state();
    assert_eq!(state.outcome(Round::One).unwrap().outcome, Money::from_cents(11_180));
    assert_eq!(state.performance(Round::One), Some(Bps::from_bps(1_180)));
    assert_eq!(state.paper_gain(), Some(true));
    assert_eq!(state.delta_risk(), None);

    session.advance().unwrap();
    session.record_beliefs(beliefs()).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Decision2);
    assert_eq!(
        session.state().starting_value(Round::Two),
        Some(Money::from_cents(11_180))
    );

    session.record_allocation(20).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Reveal2);

    let state = session.state();
    let second = state.outcome(Round::Two).unwrap();
    assert_eq!(second.risky_amount, Money::from_cents(2_236));
    assert_eq!(second.safe_amount, Money::from_cents(8_944));
    assert_eq!(second.outcome, Money::from_cents(11_113));
    assert_eq!(second.regime, Regime::Unfavorable);
    assert_eq!(state.performance(Round::Two), Some(Bps::from_bps(-60)));
    assert_eq!(state.delta_risk(), Some(-20));
    assert_eq!(state.total_return(), Some(Money::from_cents(1_113)));
    assert_eq!(state.total_return_rate(), Some(Bps::from_bps(1_113)));

    session.advance().unwrap();
    session.record_demographics(demographics()).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Summary);

    assert_eq!(session.completion(), Completion::Complete);
    assert!(session.state().is_complete());
    assert!(session.state().validate(session.regimes()).is_ok());
}

#[test]
fn test_zero_allocation_outcome_independent_of_regime() {
    for regime in [true, false] {
        let mut session = scripted_session(&[regime]);
        session.advance().unwrap();
        session.record_allocation(0).unwrap();
        session.advance().unwrap();

        let outcome = session.state().outcome(Round::One).unwrap();
        assert_eq!(outcome.outcome, Money::from_units(103));
    }
}

// ============================================================================
// Sequencing
// ============================================================================

#[test]
fn test_cannot_enter_reveal_without_allocation() {
    let mut session = scripted_session(&[true]);
    session.advance().unwrap();
    let before = session.state().clone();
    let events_before = session.events().len();

    let err = session.advance().unwrap_err();

    assert!(matches!(err, ExperimentError::OutOfSequenceTransition { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(session.current_step(), Step::Decision1);
    assert_eq!(session.state(), &before);
    assert_eq!(session.events().len(), events_before);
}

#[test]
fn test_allocation_rejected_outside_decision_steps() {
    let mut session = scripted_session(&[true]);

    let err = session.record_allocation(50).unwrap_err();
    assert!(matches!(err, ExperimentError::OutOfSequenceTransition { .. }));
    assert_eq!(session.state().allocation(Round::One), None);
}

#[test]
fn test_allocation_is_write_once() {
    let mut session = scripted_session(&[true]);
    session.advance().unwrap();
    session.record_allocation(40).unwrap();

    assert!(session.record_allocation(80).is_err());
    assert_eq!(session.state().allocation(Round::One).unwrap().percent(), 40);
}

#[test]
fn test_invalid_allocation_is_recoverable_and_leaves_state() {
    let mut session = scripted_session(&[true]);
    session.advance().unwrap();

    let err = session.record_allocation(150).unwrap_err();
    assert_eq!(err, ExperimentError::InvalidAllocation { value: 150 });
    assert!(err.is_recoverable());
    assert_eq!(session.state().allocation(Round::One), None);

    // The participant is re-prompted and submits a valid value
    session.record_allocation(100).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Reveal1);
}

#[test]
fn test_beliefs_required_before_decision_two() {
    let mut session = scripted_session(&[true]);
    session.advance().unwrap();
    session.record_allocation(40).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();

    assert_eq!(session.current_step(), Step::Beliefs);
    assert!(session.advance().is_err());

    session.record_beliefs(beliefs()).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Decision2);
}

#[test]
fn test_demographics_required_before_summary() {
    let mut session = scripted_session(&[true, true]);
    through_round_one(&mut session);
    session.record_allocation(50).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();

    assert_eq!(session.current_step(), Step::Demographics);
    assert!(session.advance().is_err());
    assert_eq!(
        session.completion(),
        Completion::Incomplete {
            at: Step::Demographics
        }
    );
}

#[test]
fn test_summary_is_terminal_and_record_frozen() {
    let mut session = scripted_session(&[false, true]);
    through_round_one(&mut session);
    session.record_allocation(70).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();
    session.record_demographics(demographics()).unwrap();
    session.advance().unwrap();

    let frozen = session.state().clone();
    assert!(session.advance().is_err());
    assert!(session.record_allocation(10).is_err());
    assert!(session.record_demographics(demographics()).is_err());
    assert_eq!(session.state(), &frozen);
}

#[test]
fn test_paper_loss_sets_paper_gain_false() {
    let mut session = scripted_session(&[false]);
    session.advance().unwrap();
    session.record_allocation(40).unwrap();
    session.advance().unwrap();

    // 60.00 * 1.03 + 40.00 * 0.85 = 61.80 + 34.00
    assert_eq!(
        session.state().outcome(Round::One).unwrap().outcome,
        Money::from_cents(9_580)
    );
    assert_eq!(session.state().paper_gain(), Some(false));
}

// ============================================================================
// Views and events
// ============================================================================

#[test]
fn test_decision_two_view_offers_even_split_of_carried_value() {
    let mut session = scripted_session(&[true]);
    through_round_one(&mut session);

    match session.view().unwrap() {
        StepView::Decision2 {
            current_portfolio,
            round_1_gain,
            round_1_performance_percent,
            default_safe_amount,
            default_risky_amount,
        } => {
            assert_eq!(current_portfolio, Money::from_cents(11_180));
            assert!(round_1_gain);
            assert_eq!(round_1_performance_percent, "11.80%");
            assert_eq!(default_safe_amount + default_risky_amount, current_portfolio);
        }
        other => panic!("unexpected view {:?}", other),
    }
}

#[test]
fn test_summary_view_reports_totals() {
    let mut session = scripted_session(&[true, false]);
    through_round_one(&mut session);
    session.record_allocation(20).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();
    session.record_demographics(demographics()).unwrap();
    session.advance().unwrap();

    match session.view().unwrap() {
        StepView::Summary {
            endowment_initial,
            outcome_1,
            final_outcome,
            total_return,
            regime_1,
            regime_2,
            ..
        } => {
            assert_eq!(endowment_initial, Money::from_units(100));
            assert_eq!(outcome_1, Money::from_cents(11_180));
            assert_eq!(final_outcome, Money::from_cents(11_113));
            assert_eq!(total_return, Money::from_cents(1_113));
            assert_eq!(regime_1, Regime::Favorable);
            assert_eq!(regime_2, Regime::Unfavorable);
        }
        other => panic!("unexpected view {:?}", other),
    }
}

#[test]
fn test_event_log_follows_step_order() {
    let mut session = scripted_session(&[true, false]);
    through_round_one(&mut session);
    session.record_allocation(20).unwrap();
    session.advance().unwrap();

    let indices: Vec<usize> = session.events().events().iter().map(|e| e.step_index()).collect();
    let mut sorted = indices.clone();
    sorted.sort();
    assert_eq!(indices, sorted);

    assert_eq!(session.events().events_of_type("RegimeDrawn").len(), 2);
    assert_eq!(session.events().events_for_round(Round::Two).len(), 3);
}

#[test]
fn test_export_row_of_finished_session() {
    let mut session = scripted_session(&[true, false]);
    through_round_one(&mut session);
    session.record_allocation(20).unwrap();
    session.advance().unwrap();
    session.advance().unwrap();
    session.record_demographics(demographics()).unwrap();
    session.advance().unwrap();

    let row = session.export_row();
    assert_eq!(row.allocation_1, Some(40));
    assert_eq!(row.regime_1, Some(true));
    assert_eq!(row.outcome_1, Some(11_180));
    assert_eq!(row.performance_1, Some(1_180));
    assert_eq!(row.allocation_2, Some(20));
    assert_eq!(row.outcome_2, Some(11_113));
    assert_eq!(row.delta_risk, Some(-20));
    assert_eq!(row.paper_gain, Some(true));
    assert_eq!(row.wta_sell, Some(11_500));
    assert_eq!(row.gender.as_deref(), Some("other"));
    assert!(row.complete);
}

#[test]
fn test_rejects_invalid_config() {
    let config = ExperimentConfig {
        initial_endowment: Money::ZERO,
        ..Default::default()
    };
    assert!(matches!(
        StepSequencer::new(config, "P001"),
        Err(ExperimentError::InvalidConfig(_))
    ));
    assert!(StepSequencer::new(ExperimentConfig::default(), "  ").is_err());
}

#[test]
fn test_rejects_config_that_would_overflow_money() {
    let huge_gain = ExperimentConfig {
        risky_gain_bps: i64::MAX,
        ..Default::default()
    };
    assert!(matches!(
        StepSequencer::new(huge_gain, "P001"),
        Err(ExperimentError::InvalidConfig(_))
    ));

    let huge_endowment = ExperimentConfig {
        initial_endowment: Money::from_cents(i64::MAX),
        ..Default::default()
    };
    assert!(matches!(
        StepSequencer::new(huge_endowment, "P001"),
        Err(ExperimentError::InvalidConfig(_))
    ));
}
