//! Round outcome engine
//!
//! Splits a round's starting value into safe and risky sub-amounts and applies
//! the drawn multipliers.
//!
//! # Critical Invariants
//!
//! 1. `safe_amount + risky_amount == starting_value` exactly: the safe amount
//!    is computed by subtraction, never from the complementary percentage
//! 2. `outcome == safe_value_end + risky_value_end`: each component is rounded
//!    to the cent on its own, so the stored outcome reconstructs from the
//!    stored components
//! 3. Deterministic: same `(starting_value, allocation, draw)` → same outcome

use crate::core::{Bps, Money};
use crate::models::inputs::Allocation;
use crate::orchestrator::ExperimentError;
use crate::outcome::draw::{DrawResult, Regime};
use serde::{Deserialize, Serialize};

/// Realized result of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Portfolio value at the start of the round
    pub starting_value: Money,
    /// Share of the starting value put in the risky asset
    pub allocation: Allocation,
    /// Regime the multipliers were taken from
    pub regime: Regime,
    pub safe_amount: Money,
    pub risky_amount: Money,
    /// Safe sub-amount after its return
    pub safe_value_end: Money,
    /// Risky sub-amount after its return
    pub risky_value_end: Money,
    /// End-of-round portfolio value
    pub outcome: Money,
    pub safe_multiplier_applied: Bps,
    pub risky_multiplier_applied: Bps,
}

impl RoundOutcome {
    /// Return of the risky asset in this round (multiplier − 1)
    pub fn risky_return(&self) -> Bps {
        Bps::from_bps(self.risky_multiplier_applied.value() - Bps::ONE.value())
    }
}

/// Realize a round from its starting value, allocation and regime draw
///
/// # Errors
/// - `InvalidAllocation` if `allocation_percent` is outside [0, 100]
/// - `InvalidStartingValue` if `starting_value` is not positive
/// - `ArithmeticOverflow` if a sub-amount or the outcome leaves the i64 cent range
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::{realize, Bps, Money, Regime, DrawResult};
///
/// let draw = DrawResult {
///     regime: Regime::Favorable,
///     safe_multiplier: Bps::from_bps(10_300),
///     risky_multiplier: Bps::from_bps(12_500),
/// };
///
/// let round = realize(Money::from_units(100), 40, &draw).unwrap();
/// assert_eq!(round.safe_amount, Money::from_units(60));
/// assert_eq!(round.risky_amount, Money::from_units(40));
/// assert_eq!(round.outcome, Money::from_cents(11_180));
/// ```
pub fn realize(
    starting_value: Money,
    allocation_percent: i64,
    draw: &DrawResult,
) -> Result<RoundOutcome, ExperimentError> {
    let allocation = Allocation::new(allocation_percent)?;

    if !starting_value.is_positive() {
        return Err(ExperimentError::InvalidStartingValue {
            value: starting_value,
        });
    }

    let overflow = |what: &str| {
        ExperimentError::ArithmeticOverflow(format!(
            "{} of {} at {}% risky",
            what,
            starting_value,
            allocation.percent()
        ))
    };

    let risky_amount = starting_value
        .percent_of(allocation.percent())
        .ok_or_else(|| overflow("risky amount"))?;
    let safe_amount = starting_value
        .checked_sub(risky_amount)
        .ok_or_else(|| overflow("safe amount"))?;

    let safe_value_end = safe_amount
        .apply_multiplier(draw.safe_multiplier)
        .ok_or_else(|| overflow("safe end value"))?;
    let risky_value_end = risky_amount
        .apply_multiplier(draw.risky_multiplier)
        .ok_or_else(|| overflow("risky end value"))?;
    let outcome = safe_value_end
        .checked_add(risky_value_end)
        .ok_or_else(|| overflow("outcome"))?;

    Ok(RoundOutcome {
        starting_value,
        allocation,
        regime: draw.regime,
        safe_amount,
        risky_amount,
        safe_value_end,
        risky_value_end,
        outcome,
        safe_multiplier_applied: draw.safe_multiplier,
        risky_multiplier_applied: draw.risky_multiplier,
    })
}
