// Regression: the reveal page must show the value that is persisted.
//
// A reveal is rendered from the recorded outcome; rendering it again (page
// refresh) must neither draw nor change anything.

use crate::core::Bps;
use crate::models::inputs::{BeliefsForm, DemographicsForm};
use crate::models::state::Round;
use crate::orchestrator::engine::{ExperimentConfig, Step, StepSequencer};
use crate::orchestrator::view::StepView;
use crate::rng::{RandomSource, RngManager};
use crate::Money;

/// Wraps a real stream and counts how often it is asked for a draw
struct CountingSource {
    inner: RngManager,
    draws: usize,
}

impl RandomSource for CountingSource {
    fn bernoulli(&mut self, probability: Bps) -> bool {
        self.draws += 1;
        self.inner.bernoulli(probability)
    }
}

fn beliefs() -> BeliefsForm {
    BeliefsForm {
        wta_sell: Money::from_units(105),
        belief_stock_prob: 60,
        luck_vs_skill: 4,
    }
}

fn demographics() -> DemographicsForm {
    DemographicsForm {
        age: 29,
        gender: "female".to_string(),
        education: "master".to_string(),
        field_of_study: Some("economics".to_string()),
        risk_attitude: 6,
        investment_experience: "little".to_string(),
        decision_reasoning: None,
    }
}

#[test]
fn test_reveal_view_matches_persisted_outcome() {
    let source = CountingSource {
        inner: RngManager::new(2024),
        draws: 0,
    };
    let mut session =
        StepSequencer::with_rng(ExperimentConfig::default(), "P-REG", source).unwrap();

    session.advance().unwrap();
    session.record_allocation(40).unwrap();
    assert_eq!(session.advance().unwrap(), Step::Reveal1);
    assert_eq!(session.rng().draws, 1);

    // Render the reveal page several times
    let first = session.view().unwrap();
    for _ in 0..5 {
        assert_eq!(session.view().unwrap(), first);
    }
    assert_eq!(session.rng().draws, 1, "viewing must not draw");

    let persisted = *session.state().outcome(Round::One).unwrap();
    match first {
        StepView::Reveal1(reveal) => {
            assert_eq!(reveal.outcome, persisted.outcome);
            assert_eq!(reveal.regime, persisted.regime);
            assert_eq!(reveal.safe_value_end, persisted.safe_value_end);
            assert_eq!(reveal.risky_value_end, persisted.risky_value_end);
            assert_eq!(
                reveal.performance,
                session.state().performance(Round::One).unwrap()
            );
        }
        other => panic!("expected a round 1 reveal, got {:?}", other),
    }

    session.advance().unwrap();
    session.record_beliefs(beliefs()).unwrap();
    session.advance().unwrap();
    session.record_allocation(20).unwrap();
    session.advance().unwrap();
    let _ = session.view().unwrap();
    session.advance().unwrap();
    session.record_demographics(demographics()).unwrap();
    session.advance().unwrap();
    let _ = session.view().unwrap();

    assert_eq!(session.rng().draws, 2, "exactly one draw per round");
    assert_eq!(session.events().events_of_type("RegimeDrawn").len(), 2);
}

#[test]
fn test_rejected_reveal_consumes_no_entropy() {
    let source = CountingSource {
        inner: RngManager::new(7),
        draws: 0,
    };
    let mut session =
        StepSequencer::with_rng(ExperimentConfig::default(), "P-REG", source).unwrap();

    session.advance().unwrap();
    assert!(session.advance().is_err());
    assert_eq!(session.rng().draws, 0);
    assert_eq!(session.current_step(), Step::Decision1);
}
