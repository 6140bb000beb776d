use crate::error::MathError;
use crate::math::{normalize, pow10};
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw on-chain amount together with its token's decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    pub raw: U256,
    pub decimals: u8,
}

impl Amount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Converts a human amount ("12.5") into raw units, flooring extra precision.
    pub fn from_decimal(d: Decimal, decimals: u8) -> Result<Self, MathError> {
        if d.is_sign_negative() && !d.is_zero() {
            return Err(MathError::Underflow);
        }
        let mantissa = U256::from(d.mantissa().unsigned_abs());
        let scale = u8::try_from(d.scale()).map_err(|_| MathError::Overflow)?;
        let raw = normalize(mantissa, scale, decimals)?;
        Ok(Self::new(raw, decimals))
    }

    /// Human-readable value. Fails when the raw amount exceeds `Decimal`'s range.
    pub fn to_decimal(&self) -> Result<Decimal, MathError> {
        if self.raw.bits() > 96 {
            return Err(MathError::Overflow);
        }
        let raw = i128::try_from(self.raw.low_u128()).map_err(|_| MathError::Overflow)?;
        Decimal::try_from_i128_with_scale(raw, u32::from(self.decimals))
            .map_err(|_| MathError::Overflow)
    }

    /// Rescales to another decimal base.
    pub fn rescale(&self, decimals: u8) -> Result<Self, MathError> {
        Ok(Self::new(normalize(self.raw, self.decimals, decimals)?, decimals))
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(unit) = pow10(u32::from(self.decimals)) else {
            return write!(f, "{}", self.raw);
        };
        let whole = self.raw / unit;
        let frac = self.raw % unit;
        if self.decimals == 0 || frac.is_zero() {
            return write!(f, "{whole}");
        }
        let frac = format!("{:0>width$}", frac.to_string(), width = usize::from(self.decimals));
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_decimal() {
        let a = Amount::from_decimal(dec!(1.5), 6).unwrap();
        assert_eq!(a.raw, U256::from(1_500_000u64));

        // extra precision floors
        let b = Amount::from_decimal(dec!(0.1234567), 6).unwrap();
        assert_eq!(b.raw, U256::from(123_456u64));

        assert!(Amount::from_decimal(dec!(-1), 6).is_err());
    }

    #[test]
    fn test_to_decimal_and_display() {
        let a = Amount::new(U256::from(998_600u64), 6);
        assert_eq!(a.to_decimal().unwrap(), dec!(0.998600));
        assert_eq!(a.to_string(), "0.9986");

        let whole = Amount::new(U256::exp10(18) * U256::from(3u8), 18);
        assert_eq!(whole.to_string(), "3");
    }

    #[test]
    fn test_rescale() {
        let a = Amount::new(U256::from(1_000_000u64), 6);
        let r = a.rescale(18).unwrap();
        assert_eq!(r.raw, U256::exp10(18));
        assert_eq!(r.rescale(6).unwrap(), a);
    }
}
