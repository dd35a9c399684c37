//! Raw token quantities.
//!
//! Token balances are integers in the asset's smallest unit and routinely exceed
//! 10^30 for 24-decimal assets, so they are kept in a 256-bit unsigned integer.
//! Products go through a 512-bit intermediate before the floor division.

use crate::domain::Decimal;
use primitive_types::{U256, U512};
use rust_decimal::Decimal as RustDecimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest number of fractional digits rust_decimal can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Non-negative raw token quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid token amount: {0}")]
pub struct AmountParseError(pub String);

impl Amount {
    pub fn new(value: U256) -> Self {
        Amount(value)
    }

    pub fn zero() -> Self {
        Amount(U256::zero())
    }

    pub fn inner(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `10^exp`, saturating at the largest representable power.
    pub fn pow10(exp: u32) -> Self {
        Amount(U256::exp10(exp.min(77) as usize))
    }

    /// Parse a base-10 integer string.
    pub fn from_dec_str(s: &str) -> Result<Self, AmountParseError> {
        U256::from_dec_str(s.trim())
            .map(Amount)
            .map_err(|_| AmountParseError(s.to_string()))
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// Subtract, clamping at zero.
    ///
    /// Returns `(result, shortfall)` where `shortfall` is how far below zero the
    /// unclamped result would have gone.
    pub fn sub_with_shortfall(self, rhs: Amount) -> (Amount, Amount) {
        match self.0.checked_sub(rhs.0) {
            Some(v) => (Amount(v), Amount::zero()),
            None => (Amount::zero(), Amount(rhs.0 - self.0)),
        }
    }

    /// `floor(self * mul / div)`; `None` when `div` is zero or the quotient
    /// does not fit in 256 bits.
    pub fn mul_div_floor(self, mul: Amount, div: Amount) -> Option<Amount> {
        if div.is_zero() {
            return None;
        }
        let q = (U512::from(self.0) * U512::from(mul.0)) / U512::from(div.0);
        U256::try_from(q).ok().map(Amount)
    }

    /// `floor(self * factor)` for a non-negative decimal factor.
    pub fn mul_decimal_floor(self, factor: Decimal) -> Option<Amount> {
        let inner = factor.inner();
        if inner.is_sign_negative() && !inner.is_zero() {
            return None;
        }
        let mantissa = U256::from(inner.mantissa().unsigned_abs());
        let scale = Amount::pow10(inner.scale());
        self.mul_div_floor(Amount(mantissa), scale)
    }

    /// Truncate a decimal into whole raw units; negatives clamp to zero.
    pub fn from_decimal_trunc(value: Decimal) -> Amount {
        let t = value.inner().trunc();
        if t.is_sign_negative() {
            return Amount::zero();
        }
        Amount(U256::from(t.mantissa().unsigned_abs()))
    }

    /// Express this raw quantity in whole-token units for an asset with
    /// `decimals` digits of precision.
    ///
    /// Integer parts beyond the decimal range saturate; the fractional part keeps
    /// at most 28 digits.
    pub fn to_decimal_units(self, decimals: u32) -> Decimal {
        let divisor = Amount::pow10(decimals).0;
        let whole = self.0 / divisor;
        let frac = self.0 % divisor;

        let whole_dec = if whole.bits() <= 96 {
            RustDecimal::from_i128_with_scale(whole.as_u128() as i128, 0)
        } else {
            RustDecimal::MAX
        };

        let keep = decimals.min(MAX_DECIMAL_SCALE);
        let frac_kept = frac / Amount::pow10(decimals - keep).0;
        let frac_dec = if frac_kept.bits() <= 96 {
            RustDecimal::try_from_i128_with_scale(frac_kept.as_u128() as i128, keep)
                .unwrap_or(RustDecimal::ZERO)
        } else {
            RustDecimal::ZERO
        };

        Decimal::new(whole_dec.saturating_add(frac_dec))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dec_str(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer or a base-10 integer string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(Amount::from)
                    .map_err(|_| E::custom(format!("negative amount: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::from_dec_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(s: &str) -> Amount {
        Amount::from_dec_str(s).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_sub_with_shortfall() {
        assert_eq!(a("10").sub_with_shortfall(a("3")), (a("7"), Amount::zero()));
        assert_eq!(a("3").sub_with_shortfall(a("10")), (Amount::zero(), a("7")));
    }

    #[test]
    fn test_mul_div_floor_uses_wide_intermediate() {
        let big = a("1000000000000000000000000000000000000000000000000000000000000");
        let r = big.mul_div_floor(big, big).unwrap();
        assert_eq!(r, big);
        assert_eq!(a("10").mul_div_floor(a("1"), a("3")), Some(a("3")));
        assert_eq!(a("10").mul_div_floor(a("1"), Amount::zero()), None);
    }

    #[test]
    fn test_mul_decimal_floor_truncates() {
        assert_eq!(a("200").mul_decimal_floor(d("0.0333")), Some(a("6")));
        assert_eq!(a("200").mul_decimal_floor(d("-1")), None);
    }

    #[test]
    fn test_to_decimal_units() {
        assert_eq!(a("1500000").to_decimal_units(6), d("1.5"));
        assert_eq!(a("1").to_decimal_units(24), d("0.000000000000000000000001"));
        assert_eq!(a("42").to_decimal_units(0), d("42"));
    }

    #[test]
    fn test_to_decimal_units_keeps_27_decimal_rates() {
        let rate = a("1000000000003593629036885046");
        assert_eq!(
            rate.to_decimal_units(27),
            d("1.000000000003593629036885046")
        );
    }

    #[test]
    fn test_serde_string_and_number() {
        let json = serde_json::to_string(&a("123456789012345678901234567890")).unwrap();
        assert_eq!(json, "\"123456789012345678901234567890\"");
        let from_num: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(from_num, a("42"));
        let from_str: Amount = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_str, a("42"));
        assert!(serde_json::from_str::<Amount>("-1").is_err());
    }

    #[test]
    fn test_from_decimal_trunc() {
        assert_eq!(Amount::from_decimal_trunc(d("99.99")), a("99"));
        assert_eq!(Amount::from_decimal_trunc(d("-5")), Amount::zero());
    }
}
