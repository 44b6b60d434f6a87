//! Leave day quantities with decimal precision.
//!
//! CRITICAL: Never use floating-point for balance calculations.
//! Half days and prorated accruals are exact with `rust_decimal::Decimal`.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for posted amounts.
pub const DAYS_SCALE: u32 = 2;

/// A (possibly signed) number of leave days.
///
/// Balances are always non-negative; signed values appear in ledger deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Days(Decimal);

impl Days {
    /// Zero days.
    pub const ZERO: Self = Self(Decimal::ZERO);
    /// One full day.
    pub const ONE: Self = Self(Decimal::ONE);
    /// Half a day.
    pub const HALF: Self = Self(Decimal::from_parts(5, 0, 0, false, 1));

    /// Wraps a decimal quantity.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Creates a whole number of days.
    #[must_use]
    pub fn whole(days: i64) -> Self {
        Self(Decimal::from(days))
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Returns true if the quantity is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the quantity is strictly negative.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if the quantity is strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Floors negative quantities at zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        self.max(Self::ZERO)
    }

    /// Rounds to [`DAYS_SCALE`] places using Banker's Rounding.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(DAYS_SCALE, RoundingStrategy::MidpointNearestEven)
                .normalize(),
        )
    }
}

impl From<Decimal> for Days {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Days {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Days {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Days {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Days {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self {
        Self(self.0 * rhs)
    }
}

impl AddAssign for Days {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Days {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Days {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Days {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl std::str::FromStr for Days {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Decimal::from_str(s.trim())?))
    }
}
