//! Round Outcome Engine Tests
//!
//! Critical invariants tested:
//! - Split conservation: safe + risky == starting value, exactly
//! - Component reconstruction: outcome == safe end + risky end
//! - Determinism: same inputs → same outcome
//! - Boundaries: 0% and 100% allocations, invalid inputs rejected

use portfolio_experiment_core_rs::{
    realize, Bps, DrawResult, ExperimentError, Money, Regime, ReturnRegimes,
};
use proptest::prelude::*;

fn regimes() -> ReturnRegimes {
    ReturnRegimes {
        favorable_probability: Bps::from_bps(5_000),
        safe_multiplier: Bps::from_bps(10_300),
        risky_favorable_multiplier: Bps::from_bps(12_500),
        risky_unfavorable_multiplier: Bps::from_bps(8_500),
    }
}

fn draw(regime: Regime) -> DrawResult {
    regimes().resolve(regime)
}

// ============================================================================
// Worked scenario
// ============================================================================

#[test]
fn test_round_one_gain_scenario() {
    // 100.00, 40% risky, favorable: 60.00 * 1.03 + 40.00 * 1.25
    let round = realize(Money::from_units(100), 40, &draw(Regime::Favorable)).unwrap();

    assert_eq!(round.risky_amount, Money::from_units(40));
    assert_eq!(round.safe_amount, Money::from_units(60));
    assert_eq!(round.safe_value_end, Money::from_cents(6_180));
    assert_eq!(round.risky_value_end, Money::from_units(50));
    assert_eq!(round.outcome, Money::from_cents(11_180));
}

#[test]
fn test_round_two_starts_from_carried_value() {
    let first = realize(Money::from_units(100), 40, &draw(Regime::Favorable)).unwrap();
    let second = realize(first.outcome, 20, &draw(Regime::Unfavorable)).unwrap();

    assert_eq!(second.starting_value, Money::from_cents(11_180));
    assert_eq!(second.risky_amount, Money::from_cents(2_236));
    assert_eq!(second.safe_amount, Money::from_cents(8_944));
    assert_eq!(second.outcome, Money::from_cents(11_113));
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_zero_allocation_ignores_regime() {
    let up = realize(Money::from_units(100), 0, &draw(Regime::Favorable)).unwrap();
    let down = realize(Money::from_units(100), 0, &draw(Regime::Unfavorable)).unwrap();

    assert_eq!(up.risky_amount, Money::ZERO);
    assert_eq!(up.outcome, Money::from_units(103));
    assert_eq!(up.outcome, down.outcome);
}

#[test]
fn test_full_allocation_has_no_safe_component() {
    let round = realize(Money::from_units(100), 100, &draw(Regime::Unfavorable)).unwrap();

    assert_eq!(round.safe_amount, Money::ZERO);
    assert_eq!(round.outcome, Money::from_units(85));
}

#[test]
fn test_invalid_inputs_rejected() {
    assert_eq!(
        realize(Money::from_units(100), 101, &draw(Regime::Favorable)),
        Err(ExperimentError::InvalidAllocation { value: 101 })
    );
    assert_eq!(
        realize(Money::from_cents(-1), 50, &draw(Regime::Favorable)),
        Err(ExperimentError::InvalidStartingValue {
            value: Money::from_cents(-1)
        })
    );
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_split_sums_to_starting_value(
        cents in 1i64..100_000_000,
        percent in 0i64..=100,
        favorable in any::<bool>(),
    ) {
        let round = realize(
            Money::from_cents(cents),
            percent,
            &draw(Regime::from_favorable(favorable)),
        ).unwrap();

        prop_assert_eq!(round.safe_amount + round.risky_amount, Money::from_cents(cents));
        prop_assert_eq!(round.safe_value_end + round.risky_value_end, round.outcome);
        prop_assert!(round.outcome.is_positive());
    }

    #[test]
    fn prop_realize_is_deterministic(
        cents in 1i64..100_000_000,
        percent in 0i64..=100,
        favorable in any::<bool>(),
    ) {
        let d = draw(Regime::from_favorable(favorable));
        let a = realize(Money::from_cents(cents), percent, &d).unwrap();
        let b = realize(Money::from_cents(cents), percent, &d).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_out_of_range_allocation_always_rejected(
        percent in prop_oneof![i64::MIN..0i64, 101i64..i64::MAX],
    ) {
        let result = realize(Money::from_units(100), percent, &draw(Regime::Favorable));
        prop_assert_eq!(result, Err(ExperimentError::InvalidAllocation { value: percent }));
    }

    /// A favorable round on a value near i64::MAX cents fails instead of saturating
    #[test]
    fn prop_overflowing_outcome_is_rejected(
        cents in (i64::MAX / 102 * 100)..=i64::MAX,
        percent in 0i64..=100,
    ) {
        let result = realize(Money::from_cents(cents), percent, &draw(Regime::Favorable));
        prop_assert!(matches!(result, Err(ExperimentError::ArithmeticOverflow(_))));
    }
}
