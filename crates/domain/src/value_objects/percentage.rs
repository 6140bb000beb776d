use crate::error::MathError;
use crate::math::{SLIPPAGE_PRECISION, normalize};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fraction expressed as an integer numerator over an explicit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percentage {
    pub value: U256,
    pub precision: U256,
}

impl Percentage {
    pub fn new(value: U256, precision: U256) -> Self {
        Self { value, precision }
    }

    pub fn from_bps(bps: u32) -> Self {
        Self::new(U256::from(bps), U256::from(10_000u16))
    }

    /// Parses a percent value ("0.5" meaning 0.5%) into a slippage numerator
    /// over `SLIPPAGE_PRECISION`.
    pub fn slippage_from_percent(percent: Decimal) -> Result<U256, MathError> {
        if percent.is_sign_negative() && !percent.is_zero() {
            return Err(MathError::Underflow);
        }
        // 1% == 10_000 over 1e6, i.e. four implied decimals
        let mantissa = U256::from(percent.mantissa().unsigned_abs());
        let scale = u8::try_from(percent.scale()).map_err(|_| MathError::Overflow)?;
        let value = normalize(mantissa, scale, 4)?;
        if value > SLIPPAGE_PRECISION {
            return Err(MathError::Overflow);
        }
        Ok(value)
    }

    /// The fraction as a decimal (0.01 == 1%).
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.precision.is_zero() || self.value.bits() > 96 || self.precision.bits() > 96 {
            return None;
        }
        let value = Decimal::try_from_i128_with_scale(self.value.low_u128().to_i128()?, 0).ok()?;
        let precision =
            Decimal::try_from_i128_with_scale(self.precision.low_u128().to_i128()?, 0).ok()?;
        value.checked_div(precision)
    }

    /// The fraction in percent (1.0 == 1%).
    pub fn to_percent(&self) -> Option<Decimal> {
        self.to_decimal().map(|d| d * Decimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_percent() {
            Some(p) => write!(f, "{:.4}%", p),
            None => write!(f, "{}/{}", self.value, self.precision),
        }
    }
}
