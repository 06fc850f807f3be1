//! Type-safe price representation using decimal arithmetic.
//!
//! The marketplace backend prices everything in a single currency and sends
//! amounts as JSON numbers, so a price is just a non-negative decimal amount
//! with helpers for cart arithmetic and display.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount.
///
/// Accepts both JSON numbers and decimal strings when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents (e.g. `500` is `5.00`).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        self * quantity
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(500).to_string(), "5.00");
        assert_eq!(Price::from_cents(1999).amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::new(Decimal::new(1250, 2));
        let total: Price = [unit.times(2), Price::from_cents(75)].into_iter().sum();
        assert_eq!(total.to_string(), "25.75");
    }

    #[test]
    fn test_deserializes_json_number() {
        let price: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(price, Price::new(Decimal::new(1999, 2)));
    }

    #[test]
    fn test_deserializes_decimal_string() {
        let price: Price = serde_json::from_str("\"4.5\"").unwrap();
        assert_eq!(price.to_string(), "4.50");
    }

    #[test]
    fn test_zero() {
        assert!(Price::ZERO.is_zero());
        assert!(!Price::from_cents(1).is_zero());
    }
}
