//! Return regime draw
//!
//! A round's regime is one Bernoulli trial: favorable with the configured
//! probability, unfavorable otherwise. The safe asset's multiplier is fixed
//! and does not depend on the draw.

use crate::core::Bps;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary return regime of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Favorable,
    Unfavorable,
}

impl Regime {
    pub fn from_favorable(is_favorable: bool) -> Self {
        if is_favorable {
            Regime::Favorable
        } else {
            Regime::Unfavorable
        }
    }

    pub fn is_favorable(self) -> bool {
        matches!(self, Regime::Favorable)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Favorable => write!(f, "favorable"),
            Regime::Unfavorable => write!(f, "unfavorable"),
        }
    }
}

/// Result of one regime draw: the regime and the multipliers to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub regime: Regime,
    pub safe_multiplier: Bps,
    pub risky_multiplier: Bps,
}

impl DrawResult {
    pub fn is_favorable(&self) -> bool {
        self.regime.is_favorable()
    }
}

/// Return-regime configuration: draw probability and multipliers
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::{Bps, Regime, ReturnRegimes, RngManager};
///
/// let regimes = ReturnRegimes {
///     favorable_probability: Bps::from_bps(5_000),
///     safe_multiplier: Bps::from_bps(10_300),
///     risky_favorable_multiplier: Bps::from_bps(12_900),
///     risky_unfavorable_multiplier: Bps::from_bps(8_500),
/// };
///
/// let mut rng = RngManager::new(12345);
/// let draw = regimes.draw(&mut rng);
/// assert_eq!(draw.safe_multiplier, Bps::from_bps(10_300));
/// assert_eq!(draw, regimes.resolve(draw.regime));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRegimes {
    /// Probability of the favorable regime, strictly inside (0, 10_000) bp
    pub favorable_probability: Bps,
    /// Fixed multiplier of the safe asset
    pub safe_multiplier: Bps,
    /// Risky asset multiplier in the favorable regime
    pub risky_favorable_multiplier: Bps,
    /// Risky asset multiplier in the unfavorable regime
    pub risky_unfavorable_multiplier: Bps,
}

impl ReturnRegimes {
    /// Draw one regime, consuming exactly one Bernoulli trial
    pub fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> DrawResult {
        let is_favorable = rng.bernoulli(self.favorable_probability);
        self.resolve(Regime::from_favorable(is_favorable))
    }

    /// Multipliers for an already-known regime (no randomness)
    pub fn resolve(&self, regime: Regime) -> DrawResult {
        let risky_multiplier = match regime {
            Regime::Favorable => self.risky_favorable_multiplier,
            Regime::Unfavorable => self.risky_unfavorable_multiplier,
        };

        DrawResult {
            regime,
            safe_multiplier: self.safe_multiplier,
            risky_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that replays a fixed list of outcomes
    struct Scripted(Vec<bool>);

    impl RandomSource for Scripted {
        fn bernoulli(&mut self, _probability: Bps) -> bool {
            self.0.remove(0)
        }
    }

    fn regimes() -> ReturnRegimes {
        ReturnRegimes {
            favorable_probability: Bps::from_bps(5_000),
            safe_multiplier: Bps::from_bps(10_300),
            risky_favorable_multiplier: Bps::from_bps(12_500),
            risky_unfavorable_multiplier: Bps::from_bps(8_500),
        }
    }

    #[test]
    fn test_draw_maps_trial_to_multiplier() {
        let mut source = Scripted(vec![true, false]);

        let up = regimes().draw(&mut source);
        assert_eq!(up.regime, Regime::Favorable);
        assert_eq!(up.risky_multiplier, Bps::from_bps(12_500));

        let down = regimes().draw(&mut source);
        assert_eq!(down.regime, Regime::Unfavorable);
        assert_eq!(down.risky_multiplier, Bps::from_bps(8_500));
    }

    #[test]
    fn test_safe_multiplier_independent_of_regime() {
        let config = regimes();
        assert_eq!(
            config.resolve(Regime::Favorable).safe_multiplier,
            config.resolve(Regime::Unfavorable).safe_multiplier
        );
    }

    #[test]
    fn test_draw_consumes_one_trial() {
        let mut source = Scripted(vec![false, true, true]);
        regimes().draw(&mut source);
        assert_eq!(source.0.len(), 2);
    }
}
