use crate::error::MathError;
use primitive_types::U256;

/// Max Newton iterations before giving up on convergence.
pub const MAX_ITERATIONS: usize = 255;

fn n_pow_n(n: usize) -> Result<U256, MathError> {
    let n = U256::from(n);
    n.checked_pow(n).ok_or(MathError::Overflow)
}

fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

fn add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

fn div(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

fn converged(a: U256, b: U256) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= U256::one()
}

/// Computes the stable-swap invariant D for balances normalized to a common
/// decimal base.
///
/// formula: A * n^n * S + D = A * D * n^n + D^(n+1) / (n^n * prod(x_i))
pub fn compute_d(xp: &[U256], amp: U256) -> Result<U256, MathError> {
    let n = xp.len();
    let sum = xp
        .iter()
        .try_fold(U256::zero(), |acc, x| add(acc, *x))?;
    if sum.is_zero() {
        return Ok(U256::zero());
    }

    let n_u = U256::from(n);
    let ann = mul(amp, n_pow_n(n)?)?;
    let ann_sub_one = ann.checked_sub(U256::one()).ok_or(MathError::Underflow)?;

    let mut d = sum;
    for _ in 0..MAX_ITERATIONS {
        let mut d_p = d;
        for x in xp {
            d_p = div(mul(d_p, d)?, mul(*x, n_u)?)?;
        }
        let prev = d;
        // (Ann * S + D_P * n) * D / ((Ann - 1) * D + (n + 1) * D_P)
        let numerator = mul(add(mul(ann, sum)?, mul(d_p, n_u)?)?, d)?;
        let denominator = add(mul(ann_sub_one, d)?, mul(add(n_u, U256::one())?, d_p)?)?;
        d = div(numerator, denominator)?;
        if converged(d, prev) {
            return Ok(d);
        }
    }
    Ok(d)
}

/// Solves for the balance of `j` given that `i` moves to `x`, keeping D fixed.
pub fn compute_y(
    i: usize,
    j: usize,
    x: U256,
    xp: &[U256],
    amp: U256,
) -> Result<U256, MathError> {
    let d = compute_d(xp, amp)?;
    let others = xp
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != j)
        .map(|(k, v)| if k == i { x } else { *v });
    solve_y(others, xp.len(), d, amp)
}

/// Solves for the balance of `i` such that the pool invariant equals `d`.
pub fn compute_y_d(i: usize, xp: &[U256], d: U256, amp: U256) -> Result<U256, MathError> {
    let others = xp
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != i)
        .map(|(_, v)| *v);
    solve_y(others, xp.len(), d, amp)
}

fn solve_y(
    others: impl Iterator<Item = U256>,
    n: usize,
    d: U256,
    amp: U256,
) -> Result<U256, MathError> {
    let n_u = U256::from(n);
    let ann = mul(amp, n_pow_n(n)?)?;

    let mut c = d;
    let mut s = U256::zero();
    for x in others {
        s = add(s, x)?;
        c = div(mul(c, d)?, mul(x, n_u)?)?;
    }
    c = div(mul(c, d)?, mul(ann, n_u)?)?;
    let b = add(s, div(d, ann)?)?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let prev = y;
        // y = (y^2 + c) / (2y + b - D)
        let numerator = add(mul(y, y)?, c)?;
        let denominator = add(mul(y, U256::from(2u8))?, b)?
            .checked_sub(d)
            .ok_or(MathError::Underflow)?;
        y = div(numerator, denominator)?;
        if converged(y, prev) {
            return Ok(y);
        }
    }
    Ok(y)
}
