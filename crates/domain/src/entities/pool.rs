use crate::math::{PRICE_PRECISION, mul_div};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Parameters read once when a pool is first watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParameters {
    /// Trading fee over `FEE_PRECISION`.
    pub fee: U256,
    /// Share of the trading fee kept by the protocol, over `FEE_PRECISION`.
    pub admin_fee: U256,
    /// Amplification coefficient.
    pub a: U256,
}

/// State refreshed on every polling tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    /// Raw balances aligned with `Pool::assets`.
    pub balances: Vec<U256>,
    /// Outstanding LP supply.
    pub total_supply: U256,
    /// LP value scaled to 1e18.
    pub virtual_price: U256,
}

/// Everything a single `get_pool_state` read returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub parameters: PoolParameters,
    pub reserves: PoolReserves,
}

/// A stable-swap pool: static configuration plus optionally loaded state.
///
/// `parameters` and `reserves` are `None` until the first refresh. Callers must
/// treat `None` as "not loaded", never as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub address: String,
    pub name: String,
    /// Asset symbols in on-chain index order.
    pub assets: Vec<String>,
    pub lp_token: String,
    /// Id of the base pool when this is a meta pool.
    pub base_pool: Option<String>,
    /// Index of the base pool's LP token within `assets`.
    pub base_pool_index: Option<usize>,

    pub parameters: Option<PoolParameters>,
    pub reserves: Option<PoolReserves>,
}

impl Pool {
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        assets: Vec<String>,
        lp_token: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            address: address.into(),
            assets,
            lp_token: lp_token.into(),
            base_pool: None,
            base_pool_index: None,
            parameters: None,
            reserves: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_base_pool(mut self, base_pool: impl Into<String>, index: usize) -> Self {
        self.base_pool = Some(base_pool.into());
        self.base_pool_index = Some(index);
        self
    }

    pub fn is_meta(&self) -> bool {
        self.base_pool.is_some()
    }

    /// Position of `symbol` within this pool's own assets.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == symbol)
    }

    pub fn fee(&self) -> Option<U256> {
        self.parameters.map(|p| p.fee)
    }

    pub fn total_supply(&self) -> Option<U256> {
        self.reserves.as_ref().map(|r| r.total_supply)
    }

    pub fn virtual_price(&self) -> Option<U256> {
        self.reserves.as_ref().map(|r| r.virtual_price)
    }

    /// Raw balance of one of this pool's own assets.
    pub fn balance_of(&self, symbol: &str) -> Option<U256> {
        let index = self.index_of(symbol)?;
        self.reserves.as_ref()?.balances.get(index).copied()
    }

    /// Pool value in 1e18 units: `total_supply * virtual_price / 1e18`.
    pub fn tvl(&self) -> Option<U256> {
        let reserves = self.reserves.as_ref()?;
        mul_div(reserves.total_supply, reserves.virtual_price, PRICE_PRECISION).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool::new(
            "3pool",
            "0xpool",
            vec!["USDC".into(), "USDT".into(), "DAI".into()],
            "3LP",
        )
    }

    #[test]
    fn test_unloaded_pool_has_no_state() {
        let p = pool();
        assert_eq!(p.fee(), None);
        assert_eq!(p.total_supply(), None);
        assert_eq!(p.balance_of("USDC"), None);
        assert_eq!(p.tvl(), None);
        assert!(!p.is_meta());
    }

    #[test]
    fn test_loaded_pool_accessors() {
        let mut p = pool();
        p.reserves = Some(PoolReserves {
            balances: vec![U256::from(10u8), U256::from(20u8), U256::from(30u8)],
            total_supply: U256::exp10(18) * U256::from(2u8),
            virtual_price: U256::exp10(18) + U256::exp10(16),
        });
        assert_eq!(p.balance_of("USDT"), Some(U256::from(20u8)));
        assert_eq!(p.balance_of("FRAX"), None);
        // 2 LP at 1.01 = 2.02
        assert_eq!(p.tvl(), Some(U256::exp10(16) * U256::from(202u16)));
        assert_eq!(p.index_of("DAI"), Some(2));
    }
}
