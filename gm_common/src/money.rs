use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of minor units (kopecks, cents) in one major currency unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount held as an exact number of minor units. Balances, accruals and withdrawals all use this type,
/// so no floating point value ever reaches the ledger.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("{value} minor units is too large")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per_major, abs % per_major)
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS_PER_MAJOR)
    }

    /// Converts a decimal amount in major units (as reported by external systems, e.g. `729.98`) into minor units,
    /// rounding to the nearest minor unit. Negative, NaN and infinite values are rejected.
    pub fn try_from_major_f64(value: f64) -> Result<Self, MoneyConversionError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MoneyConversionError(format!("{value} is not a valid non-negative amount")));
        }
        let minor = (value * MINOR_UNITS_PER_MAJOR as f64).round();
        if minor > i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{value} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(minor as i64))
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_uses_major_units() {
        assert_eq!(Money::from(0).to_string(), "0.00");
        assert_eq!(Money::from(5).to_string(), "0.05");
        assert_eq!(Money::from(72998).to_string(), "729.98");
        assert_eq!(Money::from(-150).to_string(), "-1.50");
        assert_eq!(Money::from_major(500).to_string(), "500.00");
    }

    #[test]
    fn converts_decimal_amounts_exactly() {
        assert_eq!(Money::try_from_major_f64(729.98).unwrap(), Money::from(72998));
        assert_eq!(Money::try_from_major_f64(0.1 + 0.2).unwrap(), Money::from(30));
        assert_eq!(Money::try_from_major_f64(500.0).unwrap(), Money::from_major(500));
        assert!(Money::try_from_major_f64(-1.0).is_err());
        assert!(Money::try_from_major_f64(f64::NAN).is_err());
        assert!(Money::try_from_major_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic() {
        let mut m = Money::from(300);
        m += Money::from(200);
        assert_eq!(m, Money::from(500));
        m -= Money::from(150);
        assert_eq!(m.value(), 350);
        assert!((-m).is_negative());
        let total: Money = [1, 2, 3].into_iter().map(Money::from).sum();
        assert_eq!(total, Money::from(6));
        assert!(Money::from(i64::MAX).checked_add(Money::from(1)).is_none());
        assert!(Money::try_from(u64::MAX).is_err());
    }

    #[test]
    fn serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from(72998)).unwrap();
        assert_eq!(json, "72998");
        let m: Money = serde_json::from_str("150").unwrap();
        assert_eq!(m, Money::from(150));
    }
}
