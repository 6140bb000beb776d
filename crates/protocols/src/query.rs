//! Read-only contract interfaces consumed by the estimators.
//!
//! Pools and routers are addressed by contract address. Every amount is a raw
//! integer in the token's own decimals.

use crate::error::QueryError;
use async_trait::async_trait;
use primitive_types::U256;
use stable_lp_domain::entities::PoolSnapshot;
use stable_lp_domain::route::SwapDirection;

/// View functions of a single stable-swap pool.
#[async_trait]
pub trait PoolQuery: Send + Sync {
    /// Output at `to_index` for `amount` in at `from_index`, before the trading fee.
    async fn calculate_swap(
        &self,
        pool: &str,
        from_index: usize,
        to_index: usize,
        amount: U256,
    ) -> Result<U256, QueryError>;

    /// LP minted (deposit) or burned (withdraw) for a full per-asset vector.
    async fn calculate_token_amount(
        &self,
        pool: &str,
        amounts: &[U256],
        is_deposit: bool,
    ) -> Result<U256, QueryError>;

    /// Pro-rata output per asset for redeeming `lp_amount`.
    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        lp_amount: U256,
    ) -> Result<Vec<U256>, QueryError>;

    /// Output of a single asset for redeeming `lp_amount`.
    async fn calculate_remove_liquidity_one_token(
        &self,
        pool: &str,
        lp_amount: U256,
        index: usize,
    ) -> Result<U256, QueryError>;

    /// Parameters and reserves in one read.
    async fn get_pool_state(&self, pool: &str) -> Result<PoolSnapshot, QueryError>;
}

/// View functions of the router that composes a meta pool with its base pool.
#[async_trait]
pub trait RouterQuery: Send + Sync {
    /// Router contract address; the approval target for routed withdrawals.
    fn address(&self) -> &str;

    /// Cross-pool swap quote. `from_index` and `to_index` index into the
    /// meta or base asset list according to `direction`.
    async fn calculate_swap(
        &self,
        direction: SwapDirection,
        pool: &str,
        base_pool: &str,
        from_index: usize,
        to_index: usize,
        amount: U256,
    ) -> Result<U256, QueryError>;

    /// LP of the meta pool for amounts given separately for meta and base assets.
    async fn calculate_token_amount(
        &self,
        pool: &str,
        base_pool: &str,
        meta_amounts: &[U256],
        base_amounts: &[U256],
        is_deposit: bool,
    ) -> Result<U256, QueryError>;

    /// Pro-rata withdrawal unwrapped into `(meta_amounts, base_amounts)`.
    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        base_pool: &str,
        lp_amount: U256,
    ) -> Result<(Vec<U256>, Vec<U256>), QueryError>;

    /// Single base-pool asset out of meta LP.
    async fn calculate_remove_base_liquidity_one_token(
        &self,
        pool: &str,
        base_pool: &str,
        lp_amount: U256,
        base_index: usize,
    ) -> Result<U256, QueryError>;
}
