//! Stable-swap pool state and its view functions.
//!
//! Balances are normalized to 18 decimals before any invariant math. A meta
//! pool values its base LP token at the base pool's virtual price.

use crate::error::QueryError;
use primitive_types::U256;
use stable_lp_domain::entities::{PoolParameters, PoolReserves, PoolSnapshot};
use stable_lp_domain::error::MathError;
use stable_lp_domain::math::stable_swap::{compute_d, compute_y, compute_y_d};
use stable_lp_domain::math::{PRICE_PRECISION, VALUE_DECIMALS, checked_sub, mul_div, normalize};

/// In-memory state of one simulated pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedPool {
    pub address: String,
    /// Decimals per asset, aligned with `balances`.
    pub decimals: Vec<u8>,
    pub balances: Vec<U256>,
    pub total_supply: U256,
    pub parameters: PoolParameters,
    /// Address of the base pool when this is a meta pool.
    pub base_pool: Option<String>,
    /// Index of the base LP token within `balances`.
    pub base_lp_index: Option<usize>,
}

impl SimulatedPool {
    pub fn new(
        address: impl Into<String>,
        decimals: Vec<u8>,
        balances: Vec<U256>,
        total_supply: U256,
        parameters: PoolParameters,
    ) -> Self {
        Self {
            address: address.into(),
            decimals,
            balances,
            total_supply,
            parameters,
            base_pool: None,
            base_lp_index: None,
        }
    }

    #[must_use]
    pub fn with_base_pool(mut self, base_pool: impl Into<String>, base_lp_index: usize) -> Self {
        self.base_pool = Some(base_pool.into());
        self.base_lp_index = Some(base_lp_index);
        self
    }

    pub fn n_coins(&self) -> usize {
        self.balances.len()
    }

    fn check_index(&self, index: usize) -> Result<(), QueryError> {
        if index >= self.n_coins() {
            return Err(QueryError::InvalidIndex {
                pool: self.address.clone(),
                index,
            });
        }
        Ok(())
    }

    fn check_supply(&self, lp_amount: U256) -> Result<(), QueryError> {
        if lp_amount > self.total_supply {
            return Err(QueryError::Reverted(format!(
                "{} exceeds LP supply {}",
                lp_amount, self.total_supply
            )));
        }
        Ok(())
    }

    /// Raw amount of asset `i` to 18-decimal value units.
    fn scale_in(&self, i: usize, amount: U256, base_vp: U256) -> Result<U256, MathError> {
        let x = normalize(amount, self.decimals[i], VALUE_DECIMALS)?;
        if self.base_lp_index == Some(i) {
            return mul_div(x, base_vp, PRICE_PRECISION);
        }
        Ok(x)
    }

    /// 18-decimal value units back to a raw amount of asset `j`.
    fn scale_out(&self, j: usize, value: U256, base_vp: U256) -> Result<U256, MathError> {
        let x = if self.base_lp_index == Some(j) {
            mul_div(value, PRICE_PRECISION, base_vp)?
        } else {
            value
        };
        normalize(x, VALUE_DECIMALS, self.decimals[j])
    }

    fn xp_of(&self, balances: &[U256], base_vp: U256) -> Result<Vec<U256>, MathError> {
        balances
            .iter()
            .enumerate()
            .map(|(i, b)| self.scale_in(i, *b, base_vp))
            .collect()
    }

    pub fn invariant(&self, base_vp: U256) -> Result<U256, MathError> {
        compute_d(&self.xp_of(&self.balances, base_vp)?, self.parameters.a)
    }

    /// `D * 1e18 / total_supply`; 1.0 for an empty pool.
    pub fn virtual_price(&self, base_vp: U256) -> Result<U256, MathError> {
        if self.total_supply.is_zero() {
            return Ok(PRICE_PRECISION);
        }
        mul_div(self.invariant(base_vp)?, PRICE_PRECISION, self.total_supply)
    }

    /// Output of `j` for `dx` of `i`, before fees.
    pub fn swap(&self, i: usize, j: usize, dx: U256, base_vp: U256) -> Result<U256, QueryError> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(QueryError::Reverted("cannot swap a token for itself".into()));
        }
        let xp = self.xp_of(&self.balances, base_vp)?;
        let x = xp[i]
            .checked_add(self.scale_in(i, dx, base_vp)?)
            .ok_or(MathError::Overflow)?;
        let y = compute_y(i, j, x, &xp, self.parameters.a)?;
        // one unit kept back against rounding in the pool's favour
        let dy = xp[j].saturating_sub(y).saturating_sub(U256::one());
        Ok(self.scale_out(j, dy, base_vp)?)
    }

    /// LP minted or burned for a full amount vector.
    pub fn token_amount(
        &self,
        amounts: &[U256],
        is_deposit: bool,
        base_vp: U256,
    ) -> Result<U256, QueryError> {
        if amounts.len() != self.n_coins() {
            return Err(QueryError::Reverted(format!(
                "expected {} amounts, got {}",
                self.n_coins(),
                amounts.len()
            )));
        }
        let balances = self
            .balances
            .iter()
            .zip(amounts)
            .map(|(b, a)| {
                if is_deposit {
                    b.checked_add(*a).ok_or(MathError::Overflow)
                } else {
                    checked_sub(*b, *a)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let d1 = compute_d(&self.xp_of(&balances, base_vp)?, self.parameters.a)?;
        if self.total_supply.is_zero() {
            if !is_deposit {
                return Err(QueryError::Reverted("pool is empty".into()));
            }
            return Ok(d1);
        }
        let d0 = self.invariant(base_vp)?;
        let diff = if is_deposit {
            checked_sub(d1, d0)?
        } else {
            checked_sub(d0, d1)?
        };
        Ok(mul_div(diff, self.total_supply, d0)?)
    }

    /// Pro-rata share of every balance.
    pub fn remove_liquidity(&self, lp_amount: U256) -> Result<Vec<U256>, QueryError> {
        self.check_supply(lp_amount)?;
        self.balances
            .iter()
            .map(|b| mul_div(*b, lp_amount, self.total_supply).map_err(QueryError::from))
            .collect()
    }

    /// Output of asset `i` for burning `lp_amount`, before fees.
    pub fn remove_one(&self, lp_amount: U256, i: usize, base_vp: U256) -> Result<U256, QueryError> {
        self.check_index(i)?;
        self.check_supply(lp_amount)?;
        let xp = self.xp_of(&self.balances, base_vp)?;
        let d0 = compute_d(&xp, self.parameters.a)?;
        let d1 = checked_sub(d0, mul_div(lp_amount, d0, self.total_supply)?)?;
        let y = compute_y_d(i, &xp, d1, self.parameters.a)?;
        let dy = xp[i].saturating_sub(y);
        Ok(self.scale_out(i, dy, base_vp)?)
    }

    pub fn snapshot(&self, base_vp: U256) -> Result<PoolSnapshot, MathError> {
        Ok(PoolSnapshot {
            parameters: self.parameters,
            reserves: PoolReserves {
                balances: self.balances.clone(),
                total_supply: self.total_supply,
                virtual_price: self.virtual_price(base_vp)?,
            },
        })
    }
}
