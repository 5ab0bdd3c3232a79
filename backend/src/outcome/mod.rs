//! Round outcome realization
//!
//! - **draw**: one Bernoulli regime draw per round ([`ReturnRegimes`])
//! - **engine**: splits the starting value and applies the drawn multipliers
//! - **metrics**: performance, delta risk and paper gain from recorded rounds
//!
//! Every function here is pure except [`ReturnRegimes::draw`], which only
//! consumes entropy from the injected [`crate::rng::RandomSource`].

pub mod draw;
pub mod engine;
pub mod metrics;

pub use draw::{DrawResult, Regime, ReturnRegimes};
pub use engine::{realize, RoundOutcome};
pub use metrics::{delta_risk, paper_gain, performance, DerivedMetrics};
