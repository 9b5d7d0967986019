//! Fixed-point monetary amount with 2 decimal places.
//!
//! Uses `rust_decimal` internally with scale enforcement so that payouts,
//! stakes and balances never pick up floating-point drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// A monetary amount that always carries exactly 2 decimal places.
///
/// Balances may be negative; payouts are validated as positive by the
/// session before they reach settlement. Arithmetic is checked: the
/// `checked_*` methods return `None` instead of panicking on overflow.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use cacho_scorekeeper::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert_eq!(amount.checked_times(2), Some(Money::from(21)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Creates a new `Money` from a `Decimal`, normalizing to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        if normalized.is_zero() {
            normalized.set_sign_positive(true);
        }
        Money(normalized)
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiplies the amount by a whole factor, `None` on overflow.
    pub fn checked_times(self, factor: i64) -> Option<Self> {
        self.0.checked_mul(Decimal::from(factor)).map(Money::new)
    }

    /// Adds two amounts, `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money::new)
    }

    /// Subtracts `rhs`, `None` on overflow.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Money::new)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money::new(Decimal::from(value))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let decimal = Decimal::from_str(trimmed)?;
        Ok(Money::new(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money::new(-self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:.2}", self.0))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_normalizes_scale() {
        assert_eq!(Money::from_str("1").unwrap().to_string(), "1.00");
        assert_eq!(Money::from_str("1.5").unwrap().to_string(), "1.50");
        assert_eq!(Money::from_str("  2.25  ").unwrap().to_string(), "2.25");
    }

    #[test]
    fn test_times_doubles_stake() {
        let payout = Money::from_str("5").unwrap();
        assert_eq!(payout.checked_times(2), Some(Money::from(10)));
        assert_eq!(payout.checked_times(1), Some(payout));
    }

    #[test]
    fn test_negative_balances() {
        let ten = Money::from(10);
        let balance = Money::ZERO.checked_sub(ten).unwrap();
        assert_eq!(balance.to_string(), "-10.00");
        assert_eq!(-balance, ten);
        assert!(!balance.is_positive());
    }

    #[test]
    fn test_zero_has_no_sign() {
        let balance = Money::from(10).checked_sub(Money::from(10)).unwrap();
        assert_eq!(balance.to_string(), "0.00");
        assert!(balance.is_zero());
        assert_eq!((-Money::ZERO).to_string(), "0.00");
    }

    #[test]
    fn test_overflow_is_reported_not_panicking() {
        let huge = Money::from_str("50000000000000000000000000000").unwrap();
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!((-huge).checked_sub(huge), None);
        assert_eq!(huge.checked_add(Money::from(-1)).map(|m| m < huge), Some(true));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Money::from(7)).unwrap();
        assert_eq!(json, "\"7.00\"");
        let back: Money = serde_json::from_str("\"-3.5\"").unwrap();
        assert_eq!(back.to_string(), "-3.50");
    }
}
