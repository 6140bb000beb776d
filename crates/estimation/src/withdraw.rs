//! Output estimation for removing liquidity.
//!
//! Four read paths, chosen from the pool topology and the requested output:
//!
//! | output     | plain pool or base-LP toggle | meta pool                             |
//! |------------|------------------------------|---------------------------------------|
//! | all assets | pool `remove_liquidity`      | router `remove_liquidity`, merged     |
//! | one asset  | pool `remove_one`            | meta-local asset: pool `remove_one`   |
//! |            |                              | base asset: router `remove_base_one`  |
//!
//! Impact is judged against the virtual price the pool would have after the
//! withdrawal, so redeeming the whole supply has no estimate.

use crate::clients::{QueryClients, upstream};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use stable_lp_domain::error::{EstimateError, MathError};
use stable_lp_domain::math::{PRICE_PRECISION, apply_slippage, checked_sub, mul_div, to_value};
use stable_lp_domain::registry::Registry;
use stable_lp_domain::value_objects::{ValueDelta, WithdrawEstimate};
use std::collections::HashMap;
use tracing::debug;

/// Which assets the LP is redeemed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawMode {
    /// Pro-rata across every effective asset.
    AllAssets,
    /// A single asset, by index into the effective asset list.
    SingleAsset(usize),
}

/// A withdrawal the user is considering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub pool: String,
    pub lp_amount: U256,
    pub mode: WithdrawMode,
    /// Receive the base pool's LP token instead of its underlying assets.
    #[serde(default)]
    pub use_base_pool_token: bool,
    pub slippage: U256,
}

impl WithdrawRequest {
    pub fn new(
        pool: impl Into<String>,
        lp_amount: U256,
        mode: WithdrawMode,
        slippage: U256,
    ) -> Self {
        Self {
            pool: pool.into(),
            lp_amount,
            mode,
            use_base_pool_token: false,
            slippage,
        }
    }

    #[must_use]
    pub fn with_base_pool_token(mut self, use_base_pool_token: bool) -> Self {
        self.use_base_pool_token = use_base_pool_token;
        self
    }
}

/// The read a withdrawal is quoted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawCall {
    PoolAll,
    PoolOne { index: usize },
    RouterAll { base_pool: String },
    RouterBaseOne { base_pool: String, base_index: usize },
}

/// Everything the quote step needs, copied out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawPlan {
    pub call: WithdrawCall,
    /// Address of the pool the LP token belongs to.
    pub pool: String,
    pub lp_amount: U256,
    /// Effective asset symbols and decimals, in output order.
    pub assets: Vec<(String, u8)>,
    /// The pool's own asset symbols, in on-chain order.
    pub pool_assets: Vec<String>,
    /// The base pool's asset symbols when the router is involved.
    pub base_assets: Vec<String>,
    pub total_supply: U256,
    pub virtual_price: U256,
    pub slippage: U256,
}

impl WithdrawPlan {
    /// # Errors
    /// - `EmptyInput` for a zero LP amount
    /// - `InvalidRequest` for an unknown pool or an output index out of range
    /// - `NotLoaded` when the pool reserves have not been fetched
    /// - `Undefined` when the amount redeems the whole supply or more; no
    ///   read is attempted
    pub fn prepare(registry: &Registry, request: &WithdrawRequest) -> Result<Self, EstimateError> {
        if request.lp_amount.is_zero() {
            return Err(EstimateError::EmptyInput);
        }
        let pool = registry
            .pool(&request.pool)
            .ok_or_else(|| {
                EstimateError::InvalidRequest(format!("unknown pool {}", request.pool))
            })?;
        let reserves = pool
            .reserves
            .as_ref()
            .ok_or_else(|| EstimateError::NotLoaded(pool.id.clone()))?;
        if request.lp_amount >= reserves.total_supply {
            debug!(
                pool = %pool.id,
                lp_amount = %request.lp_amount,
                total_supply = %reserves.total_supply,
                "Withdrawal redeems the whole supply"
            );
            return Err(MathError::DivisionByZero.into());
        }

        let assets: Vec<(String, u8)> = registry
            .effective_assets(&pool.id, request.use_base_pool_token)
            .map_err(|e| EstimateError::InvalidRequest(e.to_string()))?
            .into_iter()
            .map(|t| (t.symbol.clone(), t.decimals))
            .collect();

        let base = if request.use_base_pool_token {
            None
        } else {
            registry.base_pool_of(pool)
        };

        let call = match (request.mode, base) {
            (WithdrawMode::AllAssets, None) => WithdrawCall::PoolAll,
            (WithdrawMode::AllAssets, Some(base)) => WithdrawCall::RouterAll {
                base_pool: base.address.clone(),
            },
            (WithdrawMode::SingleAsset(i), base) => {
                let (symbol, _) = assets.get(i).ok_or_else(|| {
                    EstimateError::InvalidRequest(format!(
                        "pool {} has {} assets, index {i} requested",
                        pool.id,
                        assets.len()
                    ))
                })?;
                match (pool.index_of(symbol), base) {
                    (Some(index), _) => WithdrawCall::PoolOne { index },
                    (None, Some(base)) => WithdrawCall::RouterBaseOne {
                        base_pool: base.address.clone(),
                        base_index: base.index_of(symbol).ok_or_else(|| {
                            EstimateError::InvalidRequest(format!("{symbol} not in {}", base.id))
                        })?,
                    },
                    (None, None) => {
                        return Err(EstimateError::InvalidRequest(format!(
                            "{symbol} not in {}",
                            pool.id
                        )));
                    }
                }
            }
        };

        Ok(Self {
            call,
            pool: pool.address.clone(),
            lp_amount: request.lp_amount,
            assets,
            pool_assets: pool.assets.clone(),
            base_assets: base.map(|b| b.assets.clone()).unwrap_or_default(),
            total_supply: reserves.total_supply,
            virtual_price: reserves.virtual_price,
            slippage: request.slippage,
        })
    }

    /// True when the withdrawal is executed by the router.
    pub fn uses_router(&self) -> bool {
        matches!(
            self.call,
            WithdrawCall::RouterAll { .. } | WithdrawCall::RouterBaseOne { .. }
        )
    }

    /// Contract the LP token must be approved for before withdrawing.
    pub fn spender<'a>(&'a self, router: &'a str) -> &'a str {
        if self.uses_router() {
            router
        } else {
            &self.pool
        }
    }

    fn slot_of(&self, symbol: &str) -> Option<usize> {
        self.assets.iter().position(|(s, _)| s == symbol)
    }

    /// Places `amounts` reported for `symbols` into effective order.
    fn merge(&self, sources: &[(&[String], &[U256])]) -> Vec<Option<U256>> {
        let mut by_symbol: HashMap<&str, U256> = HashMap::new();
        for (symbols, amounts) in sources {
            for (symbol, amount) in symbols.iter().zip(amounts.iter()) {
                by_symbol.insert(symbol.as_str(), *amount);
            }
        }
        self.assets
            .iter()
            .map(|(symbol, _)| by_symbol.get(symbol.as_str()).copied())
            .collect()
    }

    fn single(&self, symbol: &str, amount: U256) -> Vec<Option<U256>> {
        let slot = self.slot_of(symbol);
        (0..self.assets.len())
            .map(|i| (Some(i) == slot).then_some(amount))
            .collect()
    }

    fn decimals(&self) -> Vec<u8> {
        self.assets.iter().map(|(_, d)| *d).collect()
    }
}

/// Quotes the outputs of a withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawEstimator {
    clients: QueryClients,
}

impl WithdrawEstimator {
    pub fn new(clients: QueryClients) -> Self {
        Self { clients }
    }

    pub async fn estimate(
        &self,
        registry: &Registry,
        request: &WithdrawRequest,
    ) -> Result<WithdrawEstimate, EstimateError> {
        let plan = WithdrawPlan::prepare(registry, request)?;
        self.quote(&plan).await
    }

    pub async fn quote(&self, plan: &WithdrawPlan) -> Result<WithdrawEstimate, EstimateError> {
        let pool = plan.pool.as_str();
        let amounts = match &plan.call {
            WithdrawCall::PoolAll => {
                let out = self
                    .clients
                    .pool
                    .calculate_remove_liquidity(pool, plan.lp_amount)
                    .await
                    .map_err(upstream("calculate_remove_liquidity", pool))?;
                plan.merge(&[(plan.pool_assets.as_slice(), out.as_slice())])
            }
            WithdrawCall::PoolOne { index } => {
                let out = self
                    .clients
                    .pool
                    .calculate_remove_liquidity_one_token(pool, plan.lp_amount, *index)
                    .await
                    .map_err(upstream("calculate_remove_liquidity_one_token", pool))?;
                plan.single(&plan.pool_assets[*index], out)
            }
            WithdrawCall::RouterAll { base_pool } => {
                let (meta, base) = self
                    .clients
                    .router
                    .calculate_remove_liquidity(pool, base_pool, plan.lp_amount)
                    .await
                    .map_err(upstream("router_calculate_remove_liquidity", pool))?;
                // meta-local symbols win over base symbols
                plan.merge(&[
                    (plan.base_assets.as_slice(), base.as_slice()),
                    (plan.pool_assets.as_slice(), meta.as_slice()),
                ])
            }
            WithdrawCall::RouterBaseOne {
                base_pool,
                base_index,
            } => {
                let out = self
                    .clients
                    .router
                    .calculate_remove_base_liquidity_one_token(
                        pool,
                        base_pool,
                        plan.lp_amount,
                        *base_index,
                    )
                    .await
                    .map_err(upstream("router_calculate_remove_base_liquidity_one_token", pool))?;
                plan.single(&plan.base_assets[*base_index], out)
            }
        };

        let estimate = classify_withdraw(
            plan.lp_amount,
            amounts,
            &plan.decimals(),
            plan.total_supply,
            plan.virtual_price,
            plan.slippage,
        )?;
        debug!(
            pool = %plan.pool,
            lp_amount = %plan.lp_amount,
            value_out = %estimate.value_out,
            new_virtual_price = %estimate.new_virtual_price,
            delta = ?estimate.delta,
            "Withdraw estimated"
        );
        Ok(estimate)
    }
}

/// Derives the withdraw estimate from the quoted outputs.
///
/// formula: new_vp = (vp * supply - value_out * 1e18) / (supply - lp_amount)
///
/// Both a zero remaining supply and a value out exceeding the pool's value
/// are undefined. A tiny positive remaining supply is computed as is, with
/// correspondingly large rounding error.
pub fn classify_withdraw(
    lp_amount: U256,
    amounts: Vec<Option<U256>>,
    decimals: &[u8],
    total_supply: U256,
    virtual_price: U256,
    slippage: U256,
) -> Result<WithdrawEstimate, EstimateError> {
    let remaining = checked_sub(total_supply, lp_amount)?;
    if remaining.is_zero() {
        return Err(MathError::DivisionByZero.into());
    }

    let value_out = amounts
        .iter()
        .zip(decimals)
        .filter_map(|(amount, d)| amount.map(|a| (a, *d)))
        .try_fold(U256::zero(), |acc, (amount, d)| {
            acc.checked_add(to_value(amount, d)?)
                .ok_or(MathError::Overflow)
        })?;

    let pool_value = virtual_price
        .checked_mul(total_supply)
        .ok_or(MathError::Overflow)?;
    let value_removed = value_out
        .checked_mul(PRICE_PRECISION)
        .ok_or(MathError::Overflow)?;
    let new_virtual_price = checked_sub(pool_value, value_removed)? / remaining;
    let value_in = mul_div(new_virtual_price, lp_amount, PRICE_PRECISION)?;
    let delta = ValueDelta::classify(value_in, value_out)?;

    let min_amounts = amounts
        .iter()
        .map(|a| a.map(|v| apply_slippage(v, slippage)).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WithdrawEstimate {
        lp_amount,
        amounts,
        min_amounts,
        value_out,
        new_virtual_price,
        value_in,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, e18, registry};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn estimator(backend: MockBackend) -> (WithdrawEstimator, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            WithdrawEstimator::new(QueryClients::from_backend(backend.clone())),
            backend,
        )
    }

    fn usd(v: u64) -> U256 {
        U256::from(v) * U256::exp10(6)
    }

    #[tokio::test]
    async fn test_pro_rata_plain_pool() {
        let (estimator, backend) = estimator(MockBackend {
            remove: vec![usd(49), usd(49)],
            ..Default::default()
        });
        let request =
            WithdrawRequest::new("usd", e18(100), WithdrawMode::AllAssets, U256::from(5_000u64));
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.amounts, vec![Some(usd(49)), Some(usd(49))]);
        assert_eq!(
            estimate.min_amounts,
            vec![Some(U256::from(48_755_000u64)); 2]
        );
        assert_eq!(estimate.value_out, e18(98));
        // (2000 - 98) / 1900
        assert_eq!(
            estimate.new_virtual_price,
            U256::from(1_001_052_631_578_947_368u64)
        );
        assert_eq!(estimate.delta, ValueDelta::Impact(U256::from(210_304_942u64)));
        assert!(estimate.delta.is_high_impact());
        assert_eq!(backend.calls(), vec!["pool.remove 0xUsd"]);
    }

    #[tokio::test]
    async fn test_balanced_withdraw_is_neutral() {
        let (estimator, _) = estimator(MockBackend {
            remove: vec![usd(50), usd(50)],
            ..Default::default()
        });
        let request = WithdrawRequest::new("usd", e18(100), WithdrawMode::AllAssets, U256::zero());
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.new_virtual_price, PRICE_PRECISION);
        assert_eq!(estimate.delta, ValueDelta::Neutral);
    }

    #[tokio::test]
    async fn test_single_asset_leaves_other_slots_empty() {
        let (estimator, backend) = estimator(MockBackend {
            remove_one: usd(99),
            ..Default::default()
        });
        let request =
            WithdrawRequest::new("usd", e18(100), WithdrawMode::SingleAsset(1), U256::zero());
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.amounts, vec![None, Some(usd(99))]);
        assert_eq!(estimate.min_amounts, vec![None, Some(usd(99))]);
        assert_eq!(backend.calls(), vec!["pool.remove_one 0xUsd 1"]);
    }

    #[tokio::test]
    async fn test_meta_pool_pro_rata_merges_by_symbol() {
        let (estimator, backend) = estimator(MockBackend {
            router_remove: (
                vec![e18(10), U256::zero()],
                vec![e18(3), usd(4), usd(5)],
            ),
            ..Default::default()
        });
        let request = WithdrawRequest::new("frax", e18(20), WithdrawMode::AllAssets, U256::zero());
        let r = registry();
        let plan = WithdrawPlan::prepare(&r, &request).unwrap();
        let estimate = estimator.quote(&plan).await.unwrap();

        // FRAX, DAI, USDC3, USDT3
        assert_eq!(
            estimate.amounts,
            vec![Some(e18(10)), Some(e18(3)), Some(usd(4)), Some(usd(5))]
        );
        assert_eq!(estimate.value_out, e18(22));
        assert_eq!(plan.spender("0xRouter"), "0xRouter");
        assert_eq!(backend.calls(), vec!["router.remove 0xMeta 0xBase"]);
    }

    #[tokio::test]
    async fn test_meta_pool_single_base_asset_uses_router() {
        let (estimator, backend) = estimator(MockBackend {
            remove_one: usd(19),
            ..Default::default()
        });
        // USDC3 is effective index 2, base index 1
        let request =
            WithdrawRequest::new("frax", e18(20), WithdrawMode::SingleAsset(2), U256::zero());
        let r = registry();
        let plan = WithdrawPlan::prepare(&r, &request).unwrap();
        let estimate = estimator.quote(&plan).await.unwrap();

        assert_eq!(estimate.amounts, vec![None, None, Some(usd(19)), None]);
        assert_eq!(plan.spender("0xRouter"), "0xRouter");
        assert_eq!(backend.calls(), vec!["router.remove_base_one 0xMeta 0xBase 1"]);
    }

    #[tokio::test]
    async fn test_meta_pool_single_local_asset_uses_pool() {
        let (estimator, backend) = estimator(MockBackend {
            remove_one: e18(19),
            ..Default::default()
        });
        let request =
            WithdrawRequest::new("frax", e18(20), WithdrawMode::SingleAsset(0), U256::zero());
        let r = registry();
        let plan = WithdrawPlan::prepare(&r, &request).unwrap();
        let estimate = estimator.quote(&plan).await.unwrap();

        assert_eq!(estimate.amounts, vec![Some(e18(19)), None, None, None]);
        assert_eq!(plan.spender("0xRouter"), "0xMeta");
        assert_eq!(backend.calls(), vec!["pool.remove_one 0xMeta 0"]);
    }

    #[tokio::test]
    async fn test_base_pool_token_toggle_addresses_meta_pool() {
        let (estimator, backend) = estimator(MockBackend {
            remove: vec![e18(10), e18(10)],
            ..Default::default()
        });
        let request = WithdrawRequest::new("frax", e18(20), WithdrawMode::AllAssets, U256::zero())
            .with_base_pool_token(true);
        let r = registry();
        let plan = WithdrawPlan::prepare(&r, &request).unwrap();
        let estimate = estimator.quote(&plan).await.unwrap();

        // FRAX, 3LP
        assert_eq!(estimate.amounts, vec![Some(e18(10)), Some(e18(10))]);
        assert_eq!(plan.spender("0xRouter"), "0xMeta");
        assert_eq!(backend.calls(), vec!["pool.remove 0xMeta"]);
    }

    #[tokio::test]
    async fn test_full_withdrawal_is_undefined_without_reads() {
        let (estimator, backend) = estimator(MockBackend::default());
        let r = registry();
        for lp in [e18(2_000), e18(2_001)] {
            let request = WithdrawRequest::new("usd", lp, WithdrawMode::AllAssets, U256::zero());
            assert_eq!(
                estimator.estimate(&r, &request).await,
                Err(EstimateError::Undefined(MathError::DivisionByZero))
            );
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_index_is_invalid() {
        let (estimator, backend) = estimator(MockBackend::default());
        let request =
            WithdrawRequest::new("usd", e18(1), WithdrawMode::SingleAsset(2), U256::zero());
        assert!(matches!(
            estimator.estimate(&registry(), &request).await,
            Err(EstimateError::InvalidRequest(_))
        ));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_value_out_above_pool_value_is_undefined() {
        let e = classify_withdraw(
            e18(1),
            vec![Some(e18(20))],
            &[18],
            e18(10),
            PRICE_PRECISION,
            U256::zero(),
        );
        assert_eq!(e, Err(EstimateError::Undefined(MathError::Underflow)));
    }

    proptest! {
        #[test]
        fn prop_withdraw_delta_exclusive(
            lp in 1u64..1_000_000,
            out in 0u64..1_000_000,
            extra in 1u64..1_000_000,
        ) {
            let total_supply = e18(lp) + e18(extra);
            let result = classify_withdraw(
                e18(lp),
                vec![Some(e18(out))],
                &[18],
                total_supply,
                PRICE_PRECISION,
                U256::zero(),
            );
            if let Ok(e) = result {
                prop_assert!(!(e.delta.impact().is_some() && e.delta.bonus().is_some()));
            }
        }
    }
}
