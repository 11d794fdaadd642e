use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LedgerError, Result};

/// round to the nearest cent, half away from zero
pub fn round2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// cent rounding for binary floats coming in from the input boundary.
/// the epsilon bias pushes values like 1.005 (stored as 1.00499..) back over the midpoint
pub fn round2_f64(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let biased = x + f64::EPSILON.copysign(x);
    (biased * 100.0).round() / 100.0
}

/// Money type with cent precision; every value is normalised through `round2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round2(d))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> std::result::Result<Self, rust_decimal::Error> {
        Ok(Money(round2(Decimal::from_str(s)?)))
    }

    /// create from integer amount (pesos, dollars, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from cents
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// create from a binary float, applying the epsilon-biased cent rounding
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64_retain(round2_f64(value)).map(Money::from_decimal)
    }

    /// parse a form field value. empty input means zero, so the
    /// empty-vs-zero question is settled here and nowhere else
    pub fn parse_input(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Money::ZERO);
        }
        Decimal::from_str(trimmed)
            .map(Money::from_decimal)
            .map_err(|_| LedgerError::InvalidMoneyInput {
                input: input.to_string(),
            })
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// check if zero
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

    /// absolute value
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// apply a per-period rate (e.g. 0.015 for 1.5% a month)
    pub fn apply_rate(&self, rate: Rate) -> Self {
        Money::from_decimal(self.0 * rate.as_decimal())
    }

    /// `apply_rate` that returns `None` instead of overflowing
    pub fn checked_apply_rate(&self, rate: Rate) -> Option<Self> {
        self.0.checked_mul(rate.as_decimal()).map(Money::from_decimal)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money::from_decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(round2(self.0 + other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = round2(self.0 + other.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(round2(self.0 - other.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = round2(self.0 - other.0);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money(round2(self.0 * other))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money(round2(self.0 / other))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate type for per-period interest and late-fee rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from decimal (e.g., 0.015 for 1.5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 2 for 2%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from basis points (e.g., 150 for 1.5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10000))
    }

    /// get as decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// get as percentage
    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn test_round2_idempotent() {
        for x in [dec!(0.125), dec!(1180.004999), dec!(-3.335), dec!(98.765432), dec!(0)] {
            assert_eq!(round2(round2(x)), round2(x));
        }
    }

    #[test]
    fn test_round2_f64_epsilon_bias() {
        // 1.005 is 1.00499999999999989... in binary
        assert_eq!(round2_f64(1.005), 1.01);
        assert_eq!(round2_f64(-1.005), -1.01);
        assert_eq!(round2_f64(0.1 + 0.2), 0.3);
        assert_eq!(round2_f64(round2_f64(2.675)), round2_f64(2.675));
    }

    #[test]
    fn test_money_normalised_to_cents() {
        let m = Money::from_str_exact("100.125").unwrap();
        assert_eq!(m.to_string(), "100.13");
        assert_eq!(Money::from_cents(118000), Money::from_major(1180));
        assert_eq!(Money::from_f64(1.005), Some(Money::from_cents(101)));
    }

    #[test]
    fn test_arithmetic_stays_at_cents() {
        let m = Money::from_major(1180) / dec!(12);
        assert_eq!(m, Money::from_str_exact("98.33").unwrap());
        assert_eq!(m * dec!(11), Money::from_str_exact("1081.63").unwrap());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Money::parse_input("").unwrap(), Money::ZERO);
        assert_eq!(Money::parse_input("   ").unwrap(), Money::ZERO);
        assert_eq!(Money::parse_input(" 12.5 ").unwrap(), Money::from_cents(1250));
        assert!(matches!(
            Money::parse_input("1,000"),
            Err(LedgerError::InvalidMoneyInput { .. })
        ));
    }

    #[test]
    fn test_apply_rate() {
        let interest = Money::from_major(1200).apply_rate(Rate::from_percentage(2));
        assert_eq!(interest, Money::from_major(24));
        assert_eq!(Rate::from_bps(150).as_decimal(), dec!(0.015));
    }

    #[test]
    fn test_checked_apply_rate() {
        let big = Money::from_decimal(Decimal::MAX);
        assert_eq!(big.checked_apply_rate(Rate::from_percentage(200)), None);
        assert_eq!(big.checked_add(Money::ONE), None);
        assert_eq!(
            Money::from_major(1200).checked_apply_rate(Rate::from_percentage(2)),
            Some(Money::from_major(24))
        );
    }
}
