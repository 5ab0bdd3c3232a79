//! Core numeric primitives shared by every module

pub mod precision;

pub use precision::{div_round_half_up, Bps, Money, BPS_PER_UNIT, CENTS_PER_UNIT};
