use crate::error::MathError;
use primitive_types::U256;

/// Denominator for slippage tolerance (1e6 = 100%).
pub const SLIPPAGE_PRECISION: U256 = U256([1_000_000, 0, 0, 0]);

/// Denominator for impact and bonus fractions (1e10 = 100%).
pub const PRECISION: U256 = U256([10_000_000_000, 0, 0, 0]);

/// Denominator for pool trading and admin fees (1e10 = 100%).
pub const FEE_PRECISION: U256 = U256([10_000_000_000, 0, 0, 0]);

/// Scale of virtual prices and normalized values (1e18 = 1.0).
pub const PRICE_PRECISION: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Denominator for pool share (1e6 = 100%).
pub const POOL_SHARE_PRECISION: U256 = U256([1_000_000, 0, 0, 0]);

/// A 1:1 exchange rate at [`PRICE_DECIMALS`].
pub const PEG_PRICE: U256 = U256([1_000_000, 0, 0, 0]);

/// Implied decimals of swap unit prices.
pub const PRICE_DECIMALS: u8 = 6;

/// Decimals every asset is normalized to before summing values.
pub const VALUE_DECIMALS: u8 = 18;

/// Impact above 2% (over [`PRECISION`]) is considered high.
pub const HIGH_IMPACT_THRESHOLD: U256 = U256([200_000_000, 0, 0, 0]);

/// Returns `10^exp`.
pub fn pow10(exp: u32) -> Result<U256, MathError> {
    U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or(MathError::Overflow)
}

/// Rescales `amount` from `from_decimals` to `to_decimals`.
///
/// Up-scaling multiplies by `10^Δ` and is lossless. Down-scaling divides by
/// `10^Δ` and floors.
pub fn normalize(amount: U256, from_decimals: u8, to_decimals: u8) -> Result<U256, MathError> {
    match from_decimals.cmp(&to_decimals) {
        std::cmp::Ordering::Equal => Ok(amount),
        std::cmp::Ordering::Less => {
            let factor = pow10(u32::from(to_decimals - from_decimals))?;
            amount.checked_mul(factor).ok_or(MathError::Overflow)
        }
        std::cmp::Ordering::Greater => {
            let factor = pow10(u32::from(from_decimals - to_decimals))?;
            Ok(amount / factor)
        }
    }
}

/// Normalizes a raw amount to [`VALUE_DECIMALS`] under the 1:1 peg assumption.
pub fn to_value(amount: U256, decimals: u8) -> Result<U256, MathError> {
    normalize(amount, decimals, VALUE_DECIMALS)
}

/// Computes `amount * numerator / denominator`, multiplying first.
pub fn mul_div(amount: U256, numerator: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = amount.checked_mul(numerator).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

/// Computes `amount * numerator / precision`.
pub fn percentage_of(amount: U256, numerator: U256, precision: U256) -> Result<U256, MathError> {
    mul_div(amount, numerator, precision)
}

/// Checked subtraction.
pub fn checked_sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

/// Removes the trading fee from a gross output.
///
/// formula: gross * (FEE_PRECISION - fee) / FEE_PRECISION
pub fn apply_fee(gross: U256, fee: U256) -> Result<U256, MathError> {
    let keep = checked_sub(FEE_PRECISION, fee)?;
    mul_div(gross, keep, FEE_PRECISION)
}

/// Minimum acceptable amount under a slippage tolerance.
///
/// formula: amount * (SLIPPAGE_PRECISION - slippage) / SLIPPAGE_PRECISION
pub fn apply_slippage(amount: U256, slippage: U256) -> Result<U256, MathError> {
    let keep = checked_sub(SLIPPAGE_PRECISION, slippage)?;
    mul_div(amount, keep, SLIPPAGE_PRECISION)
}

/// Relative difference `(larger - smaller) * PRECISION / base`.
pub fn relative_delta(larger: U256, smaller: U256, base: U256) -> Result<U256, MathError> {
    mul_div(checked_sub(larger, smaller)?, PRECISION, base)
}

/// Sums a slice of amounts.
pub fn checked_sum(amounts: &[U256]) -> Result<U256, MathError> {
    amounts.iter().try_fold(U256::zero(), |acc, x| {
        acc.checked_add(*x).ok_or(MathError::Overflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_up_and_down() {
        // 1.5 USDC (6 dec) -> 18 dec
        let up = normalize(U256::from(1_500_000u64), 6, 18).unwrap();
        assert_eq!(up, U256::from(1_500_000_000_000_000_000u128));

        // 1.2345678 at 18 dec -> 6 dec floors
        let down = normalize(U256::from(1_234_567_890_000_000_000u128), 18, 6).unwrap();
        assert_eq!(down, U256::from(1_234_567u64));

        assert_eq!(normalize(U256::from(7u8), 6, 6).unwrap(), U256::from(7u8));
    }

    #[test]
    fn test_normalize_overflow() {
        assert_eq!(normalize(U256::MAX, 0, 18), Err(MathError::Overflow));
    }

    #[test]
    fn test_percentage_of_multiplies_first() {
        // 3 * 1 / 2 = 1 (dividing first would give 0)
        assert_eq!(
            percentage_of(U256::from(3u8), U256::one(), U256::from(2u8)).unwrap(),
            U256::one()
        );
        assert_eq!(
            percentage_of(U256::from(3u8), U256::one(), U256::zero()),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_fee_then_slippage() {
        // 999_000 * (1e10 - 4e6) / 1e10 = 998_600.4 -> 998_600
        let after_fee = apply_fee(U256::from(999_000u64), U256::from(4_000_000u64)).unwrap();
        assert_eq!(after_fee, U256::from(998_600u64));

        // 0.5% slippage: 998_600 * 995_000 / 1e6 = 993_607
        let min = apply_slippage(after_fee, U256::from(5_000u64)).unwrap();
        assert_eq!(min, U256::from(993_607u64));
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [U256::from(1u8), U256::from(2u8), U256::from(3u8)];
        assert_eq!(checked_sum(&amounts), Ok(U256::from(6u8)));
        assert_eq!(checked_sum(&[]), Ok(U256::zero()));
        assert_eq!(checked_sum(&[U256::MAX, U256::one()]), Err(MathError::Overflow));
    }

    #[test]
    fn test_slippage_above_precision_is_undefined() {
        assert_eq!(
            apply_slippage(U256::from(10u8), U256::from(2_000_000u64)),
            Err(MathError::Underflow)
        );
    }

    #[test]
    fn test_relative_delta() {
        // (101 - 100) * 1e10 / 100 = 1e8 (1%)
        let d = relative_delta(U256::from(101u8), U256::from(100u8), U256::from(100u8)).unwrap();
        assert_eq!(d, U256::from(100_000_000u64));
    }

    proptest! {
        #[test]
        fn prop_decimal_round_trip(x in any::<u128>()) {
            let x = U256::from(x);
            let up = normalize(x, 6, 18).unwrap();
            prop_assert_eq!(normalize(up, 18, 6).unwrap(), x);
        }

        #[test]
        fn prop_slippage_monotonic(output in 1_000_000u128..u128::MAX / 2, s in 0u64..999_999) {
            let output = U256::from(output);
            let lower = apply_slippage(output, U256::from(s)).unwrap();
            let higher = apply_slippage(output, U256::from(s + 1)).unwrap();
            prop_assert!(higher < lower);
            prop_assert_eq!(apply_slippage(output, U256::zero()).unwrap(), output);
        }
    }
}
