use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// internal scale for all ledger amounts
const SCALE: u32 = 8;

/// Money type backed by a decimal, rounded to 8 places on every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(SCALE))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(SCALE)))
    }

    /// create from integer amount (dollars, shillings, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents) at the given scale
    pub fn from_minor(amount: i64, scale: u32) -> Self {
        Money(Decimal::new(amount, scale).round_dp(SCALE))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// true when the two amounts differ by no more than `tolerance`
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

/// binary ops re-round to the ledger scale
macro_rules! scaled_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign:ident, $op:tt) => {
        impl $trait for Money {
            type Output = Money;

            fn $method(self, other: Money) -> Money {
                Money((self.0 $op other.0).round_dp(SCALE))
            }
        }

        impl $assign_trait for Money {
            fn $assign(&mut self, other: Money) {
                *self = *self $op other;
            }
        }
    };
}

scaled_op!(Add, add, AddAssign, add_assign, +);
scaled_op!(Sub, sub, SubAssign, sub_assign, -);

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(SCALE))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

/// conversion rate between a credit's account currency and the company currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub const PAR: ExchangeRate = ExchangeRate(Decimal::ONE);

    /// create from decimal, non-positive rates fall back to par
    pub fn from_decimal(d: Decimal) -> Self {
        if d > Decimal::ZERO {
            ExchangeRate(d)
        } else {
            Self::PAR
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_par(&self) -> bool {
        self.0 == Decimal::ONE
    }

    /// convert an amount at this rate
    pub fn convert(&self, amount: Money) -> Money {
        amount * self.0
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::PAR
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// currency precision, the source of the comparison tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    pub decimal_places: u32,
}

impl Precision {
    pub const fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    /// smallest representable unit, e.g. 0.01 for two places
    pub fn tolerance(&self) -> Money {
        Money::from_decimal(Decimal::new(1, self.decimal_places))
    }

    pub fn round(&self, amount: Money) -> Money {
        amount.round_dp(self.decimal_places)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::new(2)
    }
}

/// render an amount for messages, e.g. "USD 120.00"
pub fn format_money(amount: Money, currency: &str, precision: Precision) -> String {
    let rounded = precision.round(amount).as_decimal();
    format!("{} {:.*}", currency, precision.decimal_places as usize, rounded)
}
