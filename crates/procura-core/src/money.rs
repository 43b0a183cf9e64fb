//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Fixed-Point Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    90 × 10 / 110 = 8.181818...  → rounding depends on float noise       │
//! │                                                                         │
//! │  Receiving also deals in fractional quantities (2.5 kg, 0.75 L) and    │
//! │  fractional rates (7.5%), so integer cents alone are not enough.        │
//! │                                                                         │
//! │  OUR SOLUTION: Decimal held at 2 places                                 │
//! │    Every Money value is re-rounded half-away-from-zero to 0.01.         │
//! │    Each derived step of a line calculation is therefore rounded,        │
//! │    exactly like the receiving forms display it.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use procura_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let line = price.mul_quantity(Decimal::new(25, 1)); // × 2.5
//! assert_eq!(line, Money::from_cents(2748)); // 27.475 → 27.48
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Number of decimal places every monetary value is held at.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a decimal to [`MONEY_SCALE`] places, half away from zero.
///
/// This is the rounding the back-office forms apply to amounts and
/// back-computed percentages alike.
///
/// ## Example
/// ```rust
/// use procura_core::money::round2;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round2(Decimal::new(8181818, 6)), Decimal::new(818, 2));
/// assert_eq!(round2(Decimal::new(2745, 3)), Decimal::new(275, 2));
/// assert_eq!(round2(Decimal::new(-2745, 3)), Decimal::new(-275, 2));
/// ```
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in a single currency, always rounded to 0.01.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative values appear for credit notes and
///   over-receipt adjustments
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serialized as a string**: `"8.18"`, so the browser never parses
///   money into a float; numbers are accepted on input
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  unit price ──► subtotal ──► discount ──► net before tax ──► tax       │
/// │                                                     │                   │
/// │                                       net / total ◄─┘                   │
/// │                                           │                             │
/// │                                           └──► × exchange rate ──► base │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Creates a Money value from a decimal, rounding to two places.
    ///
    /// ## Example
    /// ```rust
    /// use procura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::new(Decimal::new(81818, 4)); // 8.1818
    /// assert_eq!(m.amount(), Decimal::new(818, 2));
    /// ```
    #[inline]
    pub fn new(amount: Decimal) -> Self {
        Money(round2(amount))
    }

    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MONEY_SCALE))
    }

    /// Returns the rounded decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a (possibly fractional) quantity, rounding the result.
    /// Saturates at the `Decimal` bounds instead of overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use procura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let unit_price = Money::from_cents(1000);
    /// assert_eq!(unit_price.mul_quantity(Decimal::from(10)), Money::from_cents(10000));
    /// ```
    #[inline]
    pub fn mul_quantity(&self, quantity: Decimal) -> Self {
        Money::new(self.0.saturating_mul(quantity))
    }

    /// Returns `rate` percent of this amount, rounded.
    ///
    /// ## Example
    /// ```rust
    /// use procura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let subtotal = Money::from_cents(10000); // 100.00
    /// assert_eq!(subtotal.percent(Decimal::from(10)), Money::from_cents(1000));
    /// ```
    #[inline]
    pub fn percent(&self, rate: Decimal) -> Self {
        Money::new(self.0.saturating_mul(rate) / Decimal::ONE_HUNDRED)
    }

    /// Expresses `self` as a percentage of `whole`, rounded to two places.
    ///
    /// A zero `whole` yields zero instead of dividing.
    ///
    /// ## Example
    /// ```rust
    /// use procura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let discount = Money::from_cents(1500);
    /// let subtotal = Money::from_cents(20000);
    /// assert_eq!(discount.rate_of(subtotal), Decimal::new(75, 1)); // 7.5%
    /// assert_eq!(discount.rate_of(Money::zero()), Decimal::ZERO);
    /// ```
    pub fn rate_of(&self, whole: Money) -> Decimal {
        if whole.is_zero() {
            return Decimal::ZERO;
        }
        self.0
            .checked_div(whole.0)
            .map(|ratio| round2(ratio.saturating_mul(Decimal::ONE_HUNDRED)))
            .unwrap_or(Decimal::ZERO)
    }

    /// Converts into another currency by multiplying with `rate`, rounded.
    #[inline]
    pub fn convert(&self, rate: Decimal) -> Self {
        Money::new(self.0.saturating_mul(rate))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain amount with two decimals, e.g. `-12.30`.
///
/// Currency symbols belong to [`crate::config::CoreConfig::format_currency`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money::new(amount)
    }
}

/// Incoming amounts are re-rounded so a value like `8.181` from a form
/// cannot carry extra precision into the calculations.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <Decimal as Deserialize>::deserialize(deserializer).map(Money::new)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
