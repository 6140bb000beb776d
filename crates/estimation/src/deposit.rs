//! LP estimation for adding liquidity.
//!
//! Amounts are entered against the pool's effective asset list. A meta pool
//! with its base-LP toggle off is quoted through the router, which takes the
//! meta-pool and base-pool amounts separately; every other deposit goes to
//! the pool itself with the full asset vector.

use crate::clients::{QueryClients, upstream};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use stable_lp_domain::error::{EstimateError, MathError};
use stable_lp_domain::math::{
    POOL_SHARE_PRECISION, PRICE_PRECISION, apply_slippage, checked_sum, mul_div, to_value,
};
use stable_lp_domain::registry::Registry;
use stable_lp_domain::value_objects::{DepositEstimate, ValueDelta};
use tracing::debug;

/// A deposit the user is considering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub pool: String,
    /// Raw amounts aligned with `Registry::effective_assets`; missing
    /// trailing entries count as zero.
    pub amounts: Vec<U256>,
    /// Deposit the base pool's LP token instead of its underlying assets.
    #[serde(default)]
    pub use_base_pool_token: bool,
    pub slippage: U256,
}

impl DepositRequest {
    pub fn new(pool: impl Into<String>, amounts: Vec<U256>, slippage: U256) -> Self {
        Self {
            pool: pool.into(),
            amounts,
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

/// Which contract quotes the LP amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositCall {
    Pool {
        pool: String,
        amounts: Vec<U256>,
    },
    Router {
        pool: String,
        base_pool: String,
        meta_amounts: Vec<U256>,
        base_amounts: Vec<U256>,
    },
}

/// Everything the quote step needs, copied out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPlan {
    pub call: DepositCall,
    pub total_supply: U256,
    pub virtual_price: U256,
    /// Sum of inputs at 18 decimals.
    pub value_in: U256,
    pub slippage: U256,
}

impl DepositPlan {
    /// # Errors
    /// - `InvalidRequest` for an unknown pool or more amounts than assets
    /// - `EmptyInput` when every amount is zero
    /// - `NotLoaded` when the pool reserves have not been fetched
    pub fn prepare(registry: &Registry, request: &DepositRequest) -> Result<Self, EstimateError> {
        let pool = registry
            .pool(&request.pool)
            .ok_or_else(|| {
                EstimateError::InvalidRequest(format!("unknown pool {}", request.pool))
            })?;
        let assets = registry
            .effective_assets(&pool.id, request.use_base_pool_token)
            .map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;

        if request.amounts.len() > assets.len() {
            return Err(EstimateError::InvalidRequest(format!(
                "pool {} takes {} amounts, got {}",
                pool.id,
                assets.len(),
                request.amounts.len()
            )));
        }
        if request.amounts.iter().all(U256::is_zero) {
            return Err(EstimateError::EmptyInput);
        }

        let reserves = pool
            .reserves
            .as_ref()
            .ok_or_else(|| EstimateError::NotLoaded(pool.id.clone()))?;

        let amount_of = |symbol: &str| {
            assets
                .iter()
                .position(|t| t.symbol == symbol)
                .and_then(|i| request.amounts.get(i).copied())
                .unwrap_or_default()
        };

        let base = if request.use_base_pool_token {
            None
        } else {
            registry.base_pool_of(pool)
        };
        let call = match base {
            Some(base) => DepositCall::Router {
                pool: pool.address.clone(),
                base_pool: base.address.clone(),
                meta_amounts: pool.assets.iter().map(|s| amount_of(s)).collect(),
                base_amounts: base.assets.iter().map(|s| amount_of(s)).collect(),
            },
            None => DepositCall::Pool {
                pool: pool.address.clone(),
                amounts: pool.assets.iter().map(|s| amount_of(s)).collect(),
            },
        };

        let values = assets
            .iter()
            .zip(&request.amounts)
            .map(|(token, amount)| to_value(*amount, token.decimals))
            .collect::<Result<Vec<_>, _>>()?;
        let value_in = checked_sum(&values)?;

        Ok(Self {
            call,
            total_supply: reserves.total_supply,
            virtual_price: reserves.virtual_price,
            value_in,
            slippage: request.slippage,
        })
    }
}

/// Quotes LP minted for a deposit.
#[derive(Debug, Clone)]
pub struct DepositEstimator {
    clients: QueryClients,
}

impl DepositEstimator {
    pub fn new(clients: QueryClients) -> Self {
        Self { clients }
    }

    pub async fn estimate(
        &self,
        registry: &Registry,
        request: &DepositRequest,
    ) -> Result<DepositEstimate, EstimateError> {
        let plan = DepositPlan::prepare(registry, request)?;
        self.quote(&plan).await
    }

    pub async fn quote(&self, plan: &DepositPlan) -> Result<DepositEstimate, EstimateError> {
        let lp_quote = match &plan.call {
            DepositCall::Pool { pool, amounts } => self
                .clients
                .pool
                .calculate_token_amount(pool, amounts, true)
                .await
                .map_err(upstream("calculate_token_amount", pool))?,
            DepositCall::Router {
                pool,
                base_pool,
                meta_amounts,
                base_amounts,
            } => self
                .clients
                .router
                .calculate_token_amount(pool, base_pool, meta_amounts, base_amounts, true)
                .await
                .map_err(upstream("router_calculate_token_amount", pool))?,
        };

        let estimate = classify_deposit(
            lp_quote,
            plan.slippage,
            plan.total_supply,
            plan.virtual_price,
            plan.value_in,
        )?;
        debug!(
            lp_quote = %lp_quote,
            min_lp = %estimate.min_lp_amount,
            pool_share = %estimate.pool_share,
            delta = ?estimate.delta,
            "Deposit estimated"
        );
        Ok(estimate)
    }
}

/// Derives the deposit estimate from a raw LP quote.
///
/// The pool share is taken on the slippage-adjusted LP amount, the one the
/// deposit is submitted with. A pool with no supply yet has nothing to
/// compare against, so its delta is `Neutral`.
pub fn classify_deposit(
    lp_quote: U256,
    slippage: U256,
    total_supply: U256,
    virtual_price: U256,
    value_in: U256,
) -> Result<DepositEstimate, EstimateError> {
    let min_lp_amount = apply_slippage(lp_quote, slippage)?;
    let new_total_supply = total_supply
        .checked_add(min_lp_amount)
        .ok_or(MathError::Overflow)?;
    let pool_share = mul_div(min_lp_amount, POOL_SHARE_PRECISION, new_total_supply)?;
    let value_out = mul_div(lp_quote, virtual_price, PRICE_PRECISION)?;

    let delta = if total_supply.is_zero() {
        ValueDelta::Neutral
    } else {
        ValueDelta::classify(value_in, value_out)?
    };

    Ok(DepositEstimate {
        lp_quote,
        min_lp_amount,
        new_total_supply,
        pool_share,
        value_in,
        value_out,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, e18, registry};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn estimator(backend: MockBackend) -> (DepositEstimator, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            DepositEstimator::new(QueryClients::from_backend(backend.clone())),
            backend,
        )
    }

    fn usd(v: u64) -> U256 {
        U256::from(v) * U256::exp10(6)
    }

    #[tokio::test]
    async fn test_plain_pool_deposit_with_impact() {
        let (estimator, backend) = estimator(MockBackend {
            token_amount: e18(199),
            ..Default::default()
        });
        let request = DepositRequest::new("usd", vec![usd(100), usd(100)], U256::from(5_000u64));
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.value_in, e18(200));
        assert_eq!(estimate.value_out, e18(199));
        assert_eq!(estimate.min_lp_amount, U256::from(198_005u64) * U256::exp10(15));
        assert_eq!(estimate.pool_share, U256::from(90_083u64));
        // (200 - 199) / 200 over 1e10
        assert_eq!(estimate.delta, ValueDelta::Impact(U256::from(50_000_000u64)));
        assert_eq!(backend.calls(), vec!["pool.token_amount 0xUsd 2 true"]);
    }

    #[tokio::test]
    async fn test_short_amounts_are_padded() {
        let (estimator, backend) = estimator(MockBackend {
            token_amount: e18(6),
            ..Default::default()
        });
        let request = DepositRequest::new("usd", vec![usd(5)], U256::zero());
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.value_in, e18(5));
        assert_eq!(estimate.delta.bonus(), Some(U256::from(2_000_000_000u64)));
        assert_eq!(backend.calls(), vec!["pool.token_amount 0xUsd 2 true"]);
    }

    #[tokio::test]
    async fn test_meta_pool_deposit_goes_through_router() {
        let (estimator, backend) = estimator(MockBackend {
            token_amount: e18(3),
            ..Default::default()
        });
        // effective order: FRAX, DAI, USDC3, USDT3
        let request = DepositRequest::new(
            "frax",
            vec![e18(1), U256::zero(), usd(2)],
            U256::zero(),
        );
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        let meta = vec![e18(1), U256::zero()];
        let base = vec![U256::zero(), usd(2), U256::zero()];
        assert_eq!(
            backend.calls(),
            vec![format!("router.token_amount 0xMeta 0xBase {meta:?} {base:?}")]
        );
        assert_eq!(estimate.delta, ValueDelta::Neutral);
    }

    #[tokio::test]
    async fn test_base_pool_token_toggle_uses_meta_pool() {
        let (estimator, backend) = estimator(MockBackend {
            token_amount: e18(1),
            ..Default::default()
        });
        // effective order: FRAX, 3LP
        let request = DepositRequest::new("frax", vec![U256::zero(), e18(1)], U256::zero())
            .with_base_pool_token(true);
        estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(backend.calls(), vec!["pool.token_amount 0xMeta 2 true"]);
    }

    #[tokio::test]
    async fn test_rejected_requests_make_no_calls() {
        let (estimator, backend) = estimator(MockBackend::default());
        let r = registry();

        let zeros = DepositRequest::new("usd", vec![U256::zero(); 2], U256::zero());
        assert_eq!(estimator.estimate(&r, &zeros).await, Err(EstimateError::EmptyInput));

        let too_many = DepositRequest::new("usd", vec![U256::one(); 3], U256::zero());
        assert!(matches!(
            estimator.estimate(&r, &too_many).await,
            Err(EstimateError::InvalidRequest(_))
        ));

        let unknown = DepositRequest::new("nope", vec![U256::one()], U256::zero());
        assert!(matches!(
            estimator.estimate(&r, &unknown).await,
            Err(EstimateError::InvalidRequest(_))
        ));

        let unloaded = DepositRequest::new("xy", vec![U256::one()], U256::zero());
        assert_eq!(
            estimator.estimate(&r, &unloaded).await,
            Err(EstimateError::NotLoaded("xy".into()))
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_bootstrap_takes_whole_pool() {
        let e = classify_deposit(e18(10), U256::zero(), U256::zero(), PRICE_PRECISION, e18(12))
            .unwrap();
        assert_eq!(e.pool_share, POOL_SHARE_PRECISION);
        assert_eq!(e.delta, ValueDelta::Neutral);
        assert_eq!(e.delta.magnitude(), U256::zero());
        assert_eq!(e.delta.impact(), None);
        assert_eq!(e.delta.bonus(), None);
    }

    proptest! {
        #[test]
        fn prop_bootstrap_is_neutral(
            lp in 1u128..u128::MAX / 2,
            value_in in 1u128..,
            slippage in 0u64..1_000_000,
        ) {
            let e = classify_deposit(
                U256::from(lp),
                U256::from(slippage),
                U256::zero(),
                PRICE_PRECISION,
                U256::from(value_in),
            );
            // a quote rounded down to zero LP has no share to report
            if let Ok(e) = e {
                prop_assert_eq!(e.delta, ValueDelta::Neutral);
                prop_assert_eq!(e.delta.magnitude(), U256::zero());
            }
        }

        #[test]
        fn prop_deposit_delta_exclusive(
            lp in 0u128..,
            value_in in 1u128..,
            total_supply in 1u128..,
        ) {
            let e = classify_deposit(
                U256::from(lp),
                U256::zero(),
                U256::from(total_supply),
                PRICE_PRECISION,
                U256::from(value_in),
            )
            .unwrap();
            prop_assert!(!(e.delta.impact().is_some() && e.delta.bonus().is_some()));
        }
    }
}
