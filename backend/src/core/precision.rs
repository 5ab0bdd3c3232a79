//! Fixed-point money and rates
//!
//! Nothing recorded by the experiment is ever a float.
//!
//! - **Money** is i64 minor units (cents), so the display precision is 2 places.
//! - **Bps** is i64 basis points (1 bp = 0.0001). Returns, multipliers,
//!   probabilities and relative performance all use it, which makes the
//!   4-decimal performance precision exact.
//!
//! # Rounding Policy
//!
//! Every division goes through [`div_round_half_up`]: ties round away from
//! zero on the magnitude, so `-0.5` becomes `-1` and mirrors `+0.5 → +1`.
//! Intermediate products are computed in i128.
//!
//! # Overflow
//!
//! Arithmetic that could leave the i64 range is checked and returns `None`;
//! a value is never saturated into range.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Basis points in one whole unit
pub const BPS_PER_UNIT: i64 = 10_000;

/// Cents in one currency unit
pub const CENTS_PER_UNIT: i64 = 100;

/// Integer division rounding half-up on the magnitude
///
/// # Panics
/// Panics if `denominator` is zero
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::core::div_round_half_up;
///
/// assert_eq!(div_round_half_up(5, 2), 3);
/// assert_eq!(div_round_half_up(-5, 2), -3);
/// assert_eq!(div_round_half_up(4, 3), 1);
/// ```
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    assert!(denominator != 0, "denominator must be non-zero");

    let (n, d) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };

    let quotient = n / d;
    let remainder = n % d;

    if 2 * remainder.abs() >= d {
        quotient + n.signum()
    } else {
        quotient
    }
}

fn to_i64(value: i128) -> Option<i64> {
    i64::try_from(value).ok()
}

/// Amount of money in cents
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::Money;
///
/// let endowment = Money::from_units(100);
/// assert_eq!(endowment.cents(), 10_000);
/// assert_eq!(endowment.to_string(), "100.00");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Whole currency units (e.g. euros) to cents
    pub const fn from_units(units: i64) -> Self {
        Money(units * CENTS_PER_UNIT)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self * percent / 100`, rounded to the cent
    pub fn percent_of(self, percent: u8) -> Option<Money> {
        let value = div_round_half_up(self.0 as i128 * percent as i128, 100);
        to_i64(value).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `self * multiplier`, rounded to the cent
    ///
    /// # Example
    /// ```
    /// use portfolio_experiment_core_rs::{Bps, Money};
    ///
    /// let grown = Money::from_cents(8_944).apply_multiplier(Bps::from_bps(10_300));
    /// assert_eq!(grown.map(|m| m.cents()), Some(9_212)); // 92.1232 → 92.12
    ///
    /// assert_eq!(Money::from_cents(i64::MAX).apply_multiplier(Bps::from_bps(10_300)), None);
    /// ```
    pub fn apply_multiplier(self, multiplier: Bps) -> Option<Money> {
        let value = div_round_half_up(
            self.0 as i128 * multiplier.value() as i128,
            BPS_PER_UNIT as i128,
        );
        to_i64(value).map(Money)
    }

    /// Relative change from `base` to `self` in basis points
    ///
    /// Returns `None` when `base` is not positive or the change does not fit.
    ///
    /// # Example
    /// ```
    /// use portfolio_experiment_core_rs::Money;
    ///
    /// let change = Money::from_cents(11_180).relative_change_from(Money::from_cents(10_000));
    /// assert_eq!(change.map(|bps| bps.value()), Some(1_180)); // 0.118
    /// ```
    pub fn relative_change_from(self, base: Money) -> Option<Bps> {
        if base.0 <= 0 {
            return None;
        }
        let delta = self.0 as i128 - base.0 as i128;
        let value = div_round_half_up(delta * BPS_PER_UNIT as i128, base.0 as i128);
        to_i64(value).map(Bps)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_unit = CENTS_PER_UNIT as u64;
        write!(f, "{}{}.{:02}", sign, abs / per_unit, abs % per_unit)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

/// Rate in basis points (1 bp = 0.0001)
///
/// Used for returns (`300` = +3%), multipliers (`10_300` = ×1.03),
/// probabilities (`5_000` = 0.5) and relative performance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bps(i64);

impl Bps {
    pub const ZERO: Bps = Bps(0);

    /// A multiplier of exactly 1
    pub const ONE: Bps = Bps(BPS_PER_UNIT);

    pub const fn from_bps(bps: i64) -> Self {
        Bps(bps)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Multiplier corresponding to a return: `1 + return`
    ///
    /// # Example
    /// ```
    /// use portfolio_experiment_core_rs::Bps;
    ///
    /// assert_eq!(Bps::from_bps(-1_500).growth_factor(), Some(Bps::from_bps(8_500)));
    /// ```
    pub const fn growth_factor(self) -> Option<Bps> {
        match BPS_PER_UNIT.checked_add(self.0) {
            Some(factor) => Some(Bps(factor)),
            None => None,
        }
    }

    /// Fraction in [0, 1] scale as f64, for sampling only
    pub fn as_fraction(self) -> f64 {
        self.0 as f64 / BPS_PER_UNIT as f64
    }

    /// Percentage with two decimals, e.g. `1_180` → `"11.80%"`
    pub fn percent_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}%", sign, abs / 100, abs % 100)
    }

    /// Signed percentage label, e.g. `2_900` → `"+29%"`, `-1_550` → `"-15.50%"`
    pub fn signed_percent_label(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "+" };
        let abs = self.0.unsigned_abs();
        if abs % 100 == 0 {
            format!("{}{}%", sign, abs / 100)
        } else {
            format!("{}{}.{:02}%", sign, abs / 100, abs % 100)
        }
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}
