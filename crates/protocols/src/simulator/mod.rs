//! In-process stable-swap backend.
//!
//! Implements [`PoolQuery`] and [`RouterQuery`] over pools held in memory so
//! the estimators can run without a chain connection. Quotes are computed with
//! the stable-swap invariant and exclude fees, like the contracts' views.

/// Simulator seed configuration.
pub mod config;
/// Simulated pool state and math.
pub mod pool;

pub use config::{SimulatedPoolConfig, SimulatorConfig};
pub use pool::SimulatedPool;

use crate::error::QueryError;
use crate::query::{PoolQuery, RouterQuery};
use async_trait::async_trait;
use primitive_types::U256;
use stable_lp_domain::entities::{PoolParameters, PoolSnapshot};
use stable_lp_domain::error::{DomainError, MathError};
use stable_lp_domain::math::PRICE_PRECISION;
use stable_lp_domain::registry::Registry;
use stable_lp_domain::route::SwapDirection;
use stable_lp_domain::value_objects::Amount;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

fn key(address: &str) -> String {
    address.to_lowercase()
}

/// Pool and router views backed by in-memory state.
#[derive(Debug)]
pub struct StableSwapSimulator {
    router: String,
    pools: RwLock<HashMap<String, SimulatedPool>>,
    unavailable: RwLock<HashSet<String>>,
    latency: Duration,
}

impl StableSwapSimulator {
    pub fn new(router: impl Into<String>, pools: Vec<SimulatedPool>) -> Self {
        Self {
            router: router.into(),
            pools: RwLock::new(pools.into_iter().map(|p| (key(&p.address), p)).collect()),
            unavailable: RwLock::new(HashSet::new()),
            latency: Duration::ZERO,
        }
    }

    /// Delays every read, to exercise slow upstream paths.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seeds one simulated pool per registry pool.
    ///
    /// # Errors
    /// Returns an error when a pool has no seed, a seed does not match the
    /// pool's assets, or a seed amount cannot be represented.
    pub fn from_registry(
        registry: &Registry,
        config: &SimulatorConfig,
        router: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let invalid = |e: MathError| DomainError::InvalidConfig(format!("simulation: {e}"));
        let mut pools: HashMap<String, SimulatedPool> = HashMap::new();

        // base pools first so meta pools can value the base LP token
        let ordered = registry
            .pools()
            .filter(|p| !p.is_meta())
            .chain(registry.pools().filter(|p| p.is_meta()));

        for pool in ordered {
            let seed = config.pools.get(&pool.id).ok_or_else(|| {
                DomainError::InvalidConfig(format!("no simulation seed for pool {}", pool.id))
            })?;
            if seed.balances.len() != pool.assets.len() {
                return Err(DomainError::BalanceCountMismatch {
                    pool: pool.id.clone(),
                    expected: pool.assets.len(),
                    actual: seed.balances.len(),
                });
            }

            let decimals = pool
                .assets
                .iter()
                .map(|symbol| {
                    registry
                        .token(symbol)
                        .map(|t| t.decimals)
                        .ok_or_else(|| DomainError::UnknownToken {
                            pool: pool.id.clone(),
                            token: symbol.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let balances = seed
                .balances
                .iter()
                .zip(&decimals)
                .map(|(b, d)| Amount::from_decimal(*b, *d).map(|a| a.raw))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;

            let parameters = PoolParameters {
                fee: U256::from(seed.fee),
                admin_fee: U256::from(seed.admin_fee),
                a: U256::from(seed.a),
            };
            let mut simulated = SimulatedPool::new(
                pool.address.clone(),
                decimals,
                balances,
                U256::zero(),
                parameters,
            );

            let mut base_vp = PRICE_PRECISION;
            if let (Some(base), Some(index)) = (registry.base_pool_of(pool), pool.base_pool_index) {
                let base_key = key(&base.address);
                base_vp = pools
                    .get(&base_key)
                    .ok_or_else(|| DomainError::UnknownBasePool {
                        pool: pool.id.clone(),
                        base_pool: base.id.clone(),
                    })?
                    .virtual_price(PRICE_PRECISION)
                    .map_err(invalid)?;
                simulated = simulated.with_base_pool(base_key, index);
            }

            simulated.total_supply = match seed.total_supply {
                Some(supply) => {
                    let lp_decimals = registry.token(&pool.lp_token).map_or(18, |t| t.decimals);
                    Amount::from_decimal(supply, lp_decimals).map_err(invalid)?.raw
                }
                None => simulated.invariant(base_vp).map_err(invalid)?,
            };

            debug!(
                pool = %pool.id,
                total_supply = %simulated.total_supply,
                "Seeded simulated pool"
            );
            pools.insert(key(&pool.address), simulated);
        }

        info!(pools = pools.len(), "Stable-swap simulator ready");
        Ok(Self::new(router, pools.into_values().collect())
            .with_latency(Duration::from_millis(config.latency_ms)))
    }

    /// Current state of a simulated pool.
    pub async fn pool(&self, pool: &str) -> Option<SimulatedPool> {
        self.pools.read().await.get(&key(pool)).cloned()
    }

    /// Overwrites balances, as trades by other users would.
    pub async fn set_balances(&self, pool: &str, balances: Vec<U256>) -> Result<(), QueryError> {
        let mut pools = self.pools.write().await;
        let p = pools
            .get_mut(&key(pool))
            .ok_or_else(|| QueryError::UnknownPool(pool.to_string()))?;
        if balances.len() != p.n_coins() {
            return Err(QueryError::Reverted(format!(
                "expected {} balances, got {}",
                p.n_coins(),
                balances.len()
            )));
        }
        p.balances = balances;
        Ok(())
    }

    /// Makes every read of `pool` fail with [`QueryError::Unavailable`].
    pub async fn set_available(&self, pool: &str, available: bool) {
        let mut unavailable = self.unavailable.write().await;
        if available {
            unavailable.remove(&key(pool));
        } else {
            unavailable.insert(key(pool));
        }
    }

    async fn ready(&self, addresses: &[&str]) -> Result<(), QueryError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let unavailable = self.unavailable.read().await;
        if let Some(down) = addresses.iter().find(|a| unavailable.contains(&key(a))) {
            warn!(pool = %down, "Simulated pool unavailable");
            return Err(QueryError::Unavailable(down.to_string()));
        }
        Ok(())
    }

    fn lookup<'a>(
        pools: &'a HashMap<String, SimulatedPool>,
        pool: &str,
    ) -> Result<&'a SimulatedPool, QueryError> {
        pools
            .get(&key(pool))
            .ok_or_else(|| QueryError::UnknownPool(pool.to_string()))
    }

    fn base_virtual_price(
        pools: &HashMap<String, SimulatedPool>,
        pool: &SimulatedPool,
    ) -> Result<U256, QueryError> {
        match &pool.base_pool {
            None => Ok(PRICE_PRECISION),
            Some(base) => Ok(Self::lookup(pools, base)?.virtual_price(PRICE_PRECISION)?),
        }
    }

    async fn with_pool<R>(
        &self,
        pool: &str,
        f: impl FnOnce(&SimulatedPool, U256) -> Result<R, QueryError>,
    ) -> Result<R, QueryError> {
        self.ready(&[pool]).await?;
        let pools = self.pools.read().await;
        let p = Self::lookup(&pools, pool)?;
        let base_vp = Self::base_virtual_price(&pools, p)?;
        f(p, base_vp)
    }

    /// Runs `f` with the meta pool, its base pool, the base virtual price and
    /// the index of the base LP token in the meta pool.
    async fn with_pair<R>(
        &self,
        pool: &str,
        base_pool: &str,
        f: impl FnOnce(&SimulatedPool, &SimulatedPool, U256, usize) -> Result<R, QueryError>,
    ) -> Result<R, QueryError> {
        self.ready(&[pool, base_pool]).await?;
        let pools = self.pools.read().await;
        let meta = Self::lookup(&pools, pool)?;
        let base = Self::lookup(&pools, base_pool)?;
        let lp_index = match (&meta.base_pool, meta.base_lp_index) {
            (Some(b), Some(index)) if *b == key(base_pool) => index,
            _ => {
                return Err(QueryError::Reverted(format!(
                    "{pool} is not a meta pool of {base_pool}"
                )));
            }
        };
        let base_vp = base.virtual_price(PRICE_PRECISION)?;
        f(meta, base, base_vp, lp_index)
    }
}

#[async_trait]
impl PoolQuery for StableSwapSimulator {
    async fn calculate_swap(
        &self,
        pool: &str,
        from_index: usize,
        to_index: usize,
        amount: U256,
    ) -> Result<U256, QueryError> {
        let output = self
            .with_pool(pool, |p, base_vp| p.swap(from_index, to_index, amount, base_vp))
            .await?;
        debug!(pool, from_index, to_index, %amount, %output, "Simulated swap");
        Ok(output)
    }

    async fn calculate_token_amount(
        &self,
        pool: &str,
        amounts: &[U256],
        is_deposit: bool,
    ) -> Result<U256, QueryError> {
        self.with_pool(pool, |p, base_vp| p.token_amount(amounts, is_deposit, base_vp))
            .await
    }

    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        lp_amount: U256,
    ) -> Result<Vec<U256>, QueryError> {
        self.with_pool(pool, |p, _| p.remove_liquidity(lp_amount))
            .await
    }

    async fn calculate_remove_liquidity_one_token(
        &self,
        pool: &str,
        lp_amount: U256,
        index: usize,
    ) -> Result<U256, QueryError> {
        self.with_pool(pool, |p, base_vp| p.remove_one(lp_amount, index, base_vp))
            .await
    }

    async fn get_pool_state(&self, pool: &str) -> Result<PoolSnapshot, QueryError> {
        self.with_pool(pool, |p, base_vp| Ok(p.snapshot(base_vp)?))
            .await
    }
}

#[async_trait]
impl RouterQuery for StableSwapSimulator {
    fn address(&self) -> &str {
        &self.router
    }

    async fn calculate_swap(
        &self,
        direction: SwapDirection,
        pool: &str,
        base_pool: &str,
        from_index: usize,
        to_index: usize,
        amount: U256,
    ) -> Result<U256, QueryError> {
        let output = self
            .with_pair(pool, base_pool, |meta, base, base_vp, lp_index| {
                match direction {
                    SwapDirection::ToBase => {
                        let lp = meta.swap(from_index, lp_index, amount, base_vp)?;
                        base.remove_one(lp, to_index, PRICE_PRECISION)
                    }
                    SwapDirection::FromBase => {
                        let mut amounts = vec![U256::zero(); base.n_coins()];
                        let slot = amounts.get_mut(from_index).ok_or_else(|| {
                            QueryError::InvalidIndex {
                                pool: base_pool.to_string(),
                                index: from_index,
                            }
                        })?;
                        *slot = amount;
                        let lp = base.token_amount(&amounts, true, PRICE_PRECISION)?;
                        meta.swap(lp_index, to_index, lp, base_vp)
                    }
                }
            })
            .await?;
        debug!(%direction, pool, base_pool, %amount, %output, "Simulated router swap");
        Ok(output)
    }

    async fn calculate_token_amount(
        &self,
        pool: &str,
        base_pool: &str,
        meta_amounts: &[U256],
        base_amounts: &[U256],
        is_deposit: bool,
    ) -> Result<U256, QueryError> {
        self.with_pair(pool, base_pool, |meta, base, base_vp, lp_index| {
            if meta_amounts.len() != meta.n_coins() {
                return Err(QueryError::Reverted(format!(
                    "expected {} meta amounts, got {}",
                    meta.n_coins(),
                    meta_amounts.len()
                )));
            }
            let base_lp = if base_amounts.iter().all(U256::is_zero) {
                U256::zero()
            } else {
                base.token_amount(base_amounts, is_deposit, PRICE_PRECISION)?
            };
            let mut amounts = meta_amounts.to_vec();
            amounts[lp_index] = amounts[lp_index]
                .checked_add(base_lp)
                .ok_or(MathError::Overflow)?;
            meta.token_amount(&amounts, is_deposit, base_vp)
        })
        .await
    }

    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        base_pool: &str,
        lp_amount: U256,
    ) -> Result<(Vec<U256>, Vec<U256>), QueryError> {
        self.with_pair(pool, base_pool, |meta, base, _, lp_index| {
            let mut meta_amounts = meta.remove_liquidity(lp_amount)?;
            let base_lp = std::mem::take(&mut meta_amounts[lp_index]);
            let base_amounts = base.remove_liquidity(base_lp)?;
            Ok((meta_amounts, base_amounts))
        })
        .await
    }

    async fn calculate_remove_base_liquidity_one_token(
        &self,
        pool: &str,
        base_pool: &str,
        lp_amount: U256,
        base_index: usize,
    ) -> Result<U256, QueryError> {
        self.with_pair(pool, base_pool, |meta, base, base_vp, lp_index| {
            let base_lp = meta.remove_one(lp_amount, lp_index, base_vp)?;
            base.remove_one(base_lp, base_index, PRICE_PRECISION)
        })
        .await
    }
}
