//! Swap output estimation.
//!
//! The route is resolved and the fee looked up synchronously from the
//! registry ([`SwapPlan::prepare`]); only the quote read is asynchronous.

use crate::clients::{QueryClients, upstream};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use stable_lp_domain::error::{EstimateError, MathError};
use stable_lp_domain::math::{PEG_PRICE, PRICE_DECIMALS, apply_fee, apply_slippage, mul_div, pow10};
use stable_lp_domain::registry::Registry;
use stable_lp_domain::route::{Route, SwapDirection, resolve_route};
use stable_lp_domain::value_objects::SwapEstimate;
use tracing::debug;

/// A swap the user is considering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub from: String,
    pub to: String,
    /// Raw input in `from` decimals.
    pub amount: U256,
    /// Tolerance over `SLIPPAGE_PRECISION`.
    pub slippage: U256,
}

impl SwapRequest {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: U256,
        slippage: U256,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            slippage,
        }
    }
}

/// Everything the quote step needs, copied out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub route: Route,
    pub amount: U256,
    pub from_decimals: u8,
    pub to_decimals: u8,
    /// Fee of the pool the output leaves through.
    pub fee: U256,
    pub slippage: U256,
}

impl SwapPlan {
    /// # Errors
    /// - `EmptyInput` for a zero amount
    /// - `NoRoute` when the pair is not connected
    /// - `NotLoaded` when the fee pool has not been refreshed yet
    pub fn prepare(registry: &Registry, request: &SwapRequest) -> Result<Self, EstimateError> {
        if request.amount.is_zero() {
            return Err(EstimateError::EmptyInput);
        }
        let no_route = || EstimateError::NoRoute {
            from: request.from.clone(),
            to: request.to.clone(),
        };
        let from = registry.token(&request.from).ok_or_else(no_route)?;
        let to = registry.token(&request.to).ok_or_else(no_route)?;
        let route = resolve_route(registry, &request.from, &request.to).ok_or_else(no_route)?;

        let fee_pool = registry.pool_by_address(route.fee_pool()).ok_or_else(|| {
            EstimateError::InvalidRequest(format!("route pool {} not registered", route.fee_pool()))
        })?;
        let fee = fee_pool
            .fee()
            .ok_or_else(|| EstimateError::NotLoaded(fee_pool.id.clone()))?;

        Ok(Self {
            route,
            amount: request.amount,
            from_decimals: from.decimals,
            to_decimals: to.decimals,
            fee,
            slippage: request.slippage,
        })
    }
}

/// Quotes swaps through a single pool or the router.
#[derive(Debug, Clone)]
pub struct SwapEstimator {
    clients: QueryClients,
}

impl SwapEstimator {
    pub fn new(clients: QueryClients) -> Self {
        Self { clients }
    }

    pub async fn estimate(
        &self,
        registry: &Registry,
        request: &SwapRequest,
    ) -> Result<SwapEstimate, EstimateError> {
        let plan = SwapPlan::prepare(registry, request)?;
        self.quote(&plan).await
    }

    /// Reads the quote for a prepared plan and derives the estimate.
    pub async fn quote(&self, plan: &SwapPlan) -> Result<SwapEstimate, EstimateError> {
        let quote = match &plan.route {
            Route::SamePool {
                pool,
                from_index,
                to_index,
            } => self
                .clients
                .pool
                .calculate_swap(pool, *from_index, *to_index, plan.amount)
                .await
                .map_err(upstream("calculate_swap", pool))?,
            Route::SwapToBase {
                pool,
                base_pool,
                from_index,
                to_index,
            } => {
                self.router_swap(
                    SwapDirection::ToBase,
                    pool,
                    base_pool,
                    *from_index,
                    *to_index,
                    plan.amount,
                )
                .await?
            }
            Route::SwapFromBase {
                pool,
                base_pool,
                from_index,
                to_index,
            } => {
                self.router_swap(
                    SwapDirection::FromBase,
                    pool,
                    base_pool,
                    *from_index,
                    *to_index,
                    plan.amount,
                )
                .await?
            }
        };

        let estimate = finalize_swap(
            plan.amount,
            quote,
            plan.from_decimals,
            plan.to_decimals,
            plan.fee,
            plan.slippage,
        )?;
        debug!(
            route = %plan.route,
            input = %plan.amount,
            quote = %quote,
            min_output = %estimate.min_output,
            "Swap estimated"
        );
        Ok(estimate)
    }

    async fn router_swap(
        &self,
        direction: SwapDirection,
        pool: &str,
        base_pool: &str,
        from_index: usize,
        to_index: usize,
        amount: U256,
    ) -> Result<U256, EstimateError> {
        self.clients
            .router
            .calculate_swap(direction, pool, base_pool, from_index, to_index, amount)
            .await
            .map_err(upstream("router_calculate_swap", pool))
    }
}

/// Derives a swap estimate from a raw quote.
///
/// Prices are computed at `max(from, to) + 6` decimals before scaling down
/// to [`PRICE_DECIMALS`]. A zero quote has no price and is undefined.
pub fn finalize_swap(
    input: U256,
    quote: U256,
    from_decimals: u8,
    to_decimals: u8,
    fee: U256,
    slippage: U256,
) -> Result<SwapEstimate, EstimateError> {
    if input.is_zero() {
        return Err(EstimateError::EmptyInput);
    }
    if quote.is_zero() {
        return Err(MathError::DivisionByZero.into());
    }

    let output = apply_fee(quote, fee)?;
    let min_output = apply_slippage(output, slippage)?;

    let common = u32::from(from_decimals.max(to_decimals)) + u32::from(PRICE_DECIMALS);
    let from_decimals = u32::from(from_decimals);
    let to_decimals = u32::from(to_decimals);
    let price_decimals = u32::from(PRICE_DECIMALS);

    let input_per_output = mul_div(input, pow10(common - from_decimals)?, quote)?
        / pow10(common - to_decimals - price_decimals)?;
    let output_per_input = mul_div(quote, pow10(common - to_decimals)?, input)?
        / pow10(common - from_decimals - price_decimals)?;

    let impact = (output_per_input < PEG_PRICE).then(|| PEG_PRICE - output_per_input);

    Ok(SwapEstimate {
        input,
        quote,
        output,
        min_output,
        output_per_input,
        input_per_output,
        impact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, e18, registry};
    use std::sync::Arc;

    fn estimator(backend: MockBackend) -> (SwapEstimator, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            SwapEstimator::new(QueryClients::from_backend(backend.clone())),
            backend,
        )
    }

    fn slippage() -> U256 {
        U256::from(5_000u64)
    }

    #[tokio::test]
    async fn test_same_pool_swap() {
        let (estimator, backend) = estimator(MockBackend {
            swap: U256::from(999_000u64),
            ..Default::default()
        });
        let request = SwapRequest::new("USDC", "USDT", U256::from(1_000_000u64), slippage());
        let estimate = estimator.estimate(&registry(), &request).await.unwrap();

        assert_eq!(estimate.quote, U256::from(999_000u64));
        assert_eq!(estimate.output, U256::from(998_600u64));
        assert_eq!(estimate.min_output, U256::from(993_607u64));
        assert_eq!(estimate.output_per_input, U256::from(999_000u64));
        // 1e6 * 1e6 / 999_000 = 1_001_001.001
        assert_eq!(estimate.input_per_output, U256::from(1_001_001u64));
        assert_eq!(estimate.impact, Some(U256::from(1_000u64)));
        assert_eq!(backend.calls(), vec!["pool.swap 0xUsd 0->1"]);
    }

    #[tokio::test]
    async fn test_no_route_short_circuits() {
        let (estimator, backend) = estimator(MockBackend::default());
        let request = SwapRequest::new("X", "USDC", e18(1), slippage());
        let err = estimator.estimate(&registry(), &request).await.unwrap_err();

        assert_eq!(err.to_string(), "cannot find route from X to USDC");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_input_is_empty() {
        let (estimator, backend) = estimator(MockBackend::default());
        let request = SwapRequest::new("USDC", "USDT", U256::zero(), slippage());
        assert_eq!(
            estimator.estimate(&registry(), &request).await,
            Err(EstimateError::EmptyInput)
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_router_swap_uses_base_fee_to_base() {
        let mut r = registry();
        let mut params = r.pool("3pool").unwrap().parameters.unwrap();
        params.fee = U256::from(1_000_000_000u64); // 10%
        r.update_parameters("3pool", params).unwrap();

        let (estimator, backend) = estimator(MockBackend {
            swap: U256::from(1_000_000u64),
            ..Default::default()
        });
        let request = SwapRequest::new("FRAX", "USDT3", e18(1), U256::zero());
        let estimate = estimator.estimate(&r, &request).await.unwrap();

        assert_eq!(estimate.output, U256::from(900_000u64));
        assert_eq!(estimate.impact, None);
        assert_eq!(
            backend.calls(),
            vec![format!("router.swap {} 0xMeta 0xBase 0->2", SwapDirection::ToBase)]
        );
    }

    #[tokio::test]
    async fn test_fee_pool_not_loaded() {
        let loaded = registry();
        let pools = loaded
            .pools()
            .cloned()
            .map(|mut p| {
                p.parameters = None;
                p
            })
            .collect();
        let r = Registry::new(loaded.tokens().cloned().collect::<Vec<_>>(), pools).unwrap();

        let (estimator, _) = estimator(MockBackend::default());
        let request = SwapRequest::new("USDC", "USDT", U256::one(), slippage());
        assert_eq!(
            estimator.estimate(&r, &request).await,
            Err(EstimateError::NotLoaded("usd".into()))
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let (estimator, _) = estimator(MockBackend {
            fail: true,
            ..Default::default()
        });
        let request = SwapRequest::new("USDC", "USDT", U256::one(), slippage());
        let err = estimator.estimate(&registry(), &request).await.unwrap_err();
        assert!(matches!(err, EstimateError::Upstream(_)));
        assert!(err.is_pending());
    }

    #[test]
    fn test_finalize_mixed_decimals() {
        // 1 DAI (18) -> 1.002 USDC (6): above peg, no impact
        let e = finalize_swap(e18(1), U256::from(1_002_000u64), 18, 6, U256::zero(), U256::zero())
            .unwrap();
        assert_eq!(e.output_per_input, U256::from(1_002_000u64));
        assert_eq!(e.input_per_output, U256::from(998_003u64));
        assert_eq!(e.impact, None);
    }

    #[test]
    fn test_finalize_zero_quote_is_undefined() {
        assert_eq!(
            finalize_swap(U256::one(), U256::zero(), 6, 6, U256::zero(), U256::zero()),
            Err(EstimateError::Undefined(MathError::DivisionByZero))
        );
    }
}
