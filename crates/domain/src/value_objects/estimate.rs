//! Results returned by the estimators.
//!
//! Estimates are recomputed on every input or pool change and never persisted.

use crate::error::MathError;
use crate::math::{
    HIGH_IMPACT_THRESHOLD, PEG_PRICE, POOL_SHARE_PRECISION, PRECISION, relative_delta,
};
use crate::value_objects::percentage::Percentage;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Difference between the value put in and the value taken out of a pool.
///
/// Impact and bonus are fractions over `PRECISION` relative to the value put
/// in. Being a single enum, an estimate can never carry both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueDelta {
    /// No penalty or reward: values match, or the pool is being bootstrapped.
    Neutral,
    /// Value lost to pool imbalance.
    Impact(U256),
    /// Value gained by correcting pool imbalance.
    Bonus(U256),
}

impl ValueDelta {
    /// Classifies `value_out` against `value_in`.
    pub fn classify(value_in: U256, value_out: U256) -> Result<Self, MathError> {
        if value_in > value_out {
            Ok(Self::Impact(relative_delta(value_in, value_out, value_in)?))
        } else if value_out > value_in {
            Ok(Self::Bonus(relative_delta(value_out, value_in, value_in)?))
        } else {
            Ok(Self::Neutral)
        }
    }

    pub fn impact(&self) -> Option<U256> {
        match self {
            Self::Impact(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bonus(&self) -> Option<U256> {
        match self {
            Self::Bonus(v) => Some(*v),
            _ => None,
        }
    }

    /// Size of the delta; zero for `Neutral`.
    pub fn magnitude(&self) -> U256 {
        match self {
            Self::Neutral => U256::zero(),
            Self::Impact(v) | Self::Bonus(v) => *v,
        }
    }

    pub fn is_high_impact(&self) -> bool {
        matches!(self, Self::Impact(v) if *v > HIGH_IMPACT_THRESHOLD)
    }

    pub fn as_percentage(&self) -> Percentage {
        Percentage::new(self.magnitude(), PRECISION)
    }
}

/// Quote for a token swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEstimate {
    /// Raw amount entered, in input-token decimals.
    pub input: U256,
    /// Output quoted by the pool or router, in output-token decimals.
    pub quote: U256,
    /// Quote with the trading fee removed.
    pub output: U256,
    /// `output` reduced by the slippage tolerance; the on-chain guard.
    pub min_output: U256,
    /// Output per one unit of input, at `PRICE_DECIMALS`.
    pub output_per_input: U256,
    /// Input per one unit of output, at `PRICE_DECIMALS`.
    pub input_per_output: U256,
    /// Shortfall of `output_per_input` below the 1:1 peg, over `PEG_PRICE`.
    /// `None` when the price is at or above peg.
    pub impact: Option<U256>,
}

impl SwapEstimate {
    pub fn impact_percentage(&self) -> Option<Percentage> {
        self.impact.map(|v| Percentage::new(v, PEG_PRICE))
    }
}

/// Estimate for adding liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEstimate {
    /// LP amount quoted by the pool or router.
    pub lp_quote: U256,
    /// Quote reduced by slippage; used as the on-chain minimum.
    pub min_lp_amount: U256,
    /// Total LP supply after the deposit.
    pub new_total_supply: U256,
    /// Depositor's share of the pool, over `POOL_SHARE_PRECISION`.
    pub pool_share: U256,
    /// Sum of inputs normalized to 18 decimals.
    pub value_in: U256,
    /// LP quote valued at the current virtual price.
    pub value_out: U256,
    /// Bonus or impact of the deposit. A first deposit into an empty pool is
    /// `Neutral`, so its impact and bonus are both zero (`magnitude() == 0`).
    pub delta: ValueDelta,
}

impl DepositEstimate {
    pub fn pool_share_percentage(&self) -> Percentage {
        Percentage::new(self.pool_share, POOL_SHARE_PRECISION)
    }
}

/// Estimate for removing liquidity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawEstimate {
    /// LP amount redeemed.
    pub lp_amount: U256,
    /// Output per asset, aligned with the requested asset list. `None` marks
    /// an asset that was not requested.
    pub amounts: Vec<Option<U256>>,
    /// `amounts` reduced by slippage.
    pub min_amounts: Vec<Option<U256>>,
    /// Sum of outputs normalized to 18 decimals.
    pub value_out: U256,
    /// Virtual price after the withdrawal.
    pub new_virtual_price: U256,
    /// Redeemed LP valued at `new_virtual_price`.
    pub value_in: U256,
    pub delta: ValueDelta,
}
