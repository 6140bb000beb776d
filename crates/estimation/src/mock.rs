//! Scripted query backend and registry fixtures for unit tests.

use async_trait::async_trait;
use primitive_types::U256;
use stable_lp_domain::entities::{Pool, PoolParameters, PoolReserves, PoolSnapshot, Token};
use stable_lp_domain::math::PRICE_PRECISION;
use stable_lp_domain::registry::Registry;
use stable_lp_domain::route::SwapDirection;
use stable_lp_protocols::{PoolQuery, QueryError, RouterQuery};
use std::sync::Mutex;

/// Returns fixed answers and records every call by name.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub swap: U256,
    pub token_amount: U256,
    pub remove: Vec<U256>,
    pub remove_one: U256,
    pub router_remove: (Vec<U256>, Vec<U256>),
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn record(&self, call: String) -> Result<(), QueryError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(QueryError::Reverted("scripted failure".into()));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PoolQuery for MockBackend {
    async fn calculate_swap(
        &self,
        pool: &str,
        from_index: usize,
        to_index: usize,
        _amount: U256,
    ) -> Result<U256, QueryError> {
        self.record(format!("pool.swap {pool} {from_index}->{to_index}"))?;
        Ok(self.swap)
    }

    async fn calculate_token_amount(
        &self,
        pool: &str,
        amounts: &[U256],
        is_deposit: bool,
    ) -> Result<U256, QueryError> {
        self.record(format!("pool.token_amount {pool} {} {is_deposit}", amounts.len()))?;
        Ok(self.token_amount)
    }

    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        _lp_amount: U256,
    ) -> Result<Vec<U256>, QueryError> {
        self.record(format!("pool.remove {pool}"))?;
        Ok(self.remove.clone())
    }

    async fn calculate_remove_liquidity_one_token(
        &self,
        pool: &str,
        _lp_amount: U256,
        index: usize,
    ) -> Result<U256, QueryError> {
        self.record(format!("pool.remove_one {pool} {index}"))?;
        Ok(self.remove_one)
    }

    async fn get_pool_state(&self, pool: &str) -> Result<PoolSnapshot, QueryError> {
        self.record(format!("pool.state {pool}"))?;
        Err(QueryError::UnknownPool(pool.to_string()))
    }
}

#[async_trait]
impl RouterQuery for MockBackend {
    fn address(&self) -> &str {
        "0xRouter"
    }

    async fn calculate_swap(
        &self,
        direction: SwapDirection,
        pool: &str,
        base_pool: &str,
        from_index: usize,
        to_index: usize,
        _amount: U256,
    ) -> Result<U256, QueryError> {
        self.record(format!(
            "router.swap {direction} {pool} {base_pool} {from_index}->{to_index}"
        ))?;
        Ok(self.swap)
    }

    async fn calculate_token_amount(
        &self,
        pool: &str,
        base_pool: &str,
        meta_amounts: &[U256],
        base_amounts: &[U256],
        _is_deposit: bool,
    ) -> Result<U256, QueryError> {
        self.record(format!(
            "router.token_amount {pool} {base_pool} {:?} {:?}",
            meta_amounts, base_amounts
        ))?;
        Ok(self.token_amount)
    }

    async fn calculate_remove_liquidity(
        &self,
        pool: &str,
        base_pool: &str,
        _lp_amount: U256,
    ) -> Result<(Vec<U256>, Vec<U256>), QueryError> {
        self.record(format!("router.remove {pool} {base_pool}"))?;
        Ok(self.router_remove.clone())
    }

    async fn calculate_remove_base_liquidity_one_token(
        &self,
        pool: &str,
        base_pool: &str,
        _lp_amount: U256,
        base_index: usize,
    ) -> Result<U256, QueryError> {
        self.record(format!("router.remove_base_one {pool} {base_pool} {base_index}"))?;
        Ok(self.remove_one)
    }
}

pub fn e18(v: u64) -> U256 {
    U256::from(v) * PRICE_PRECISION
}

fn loaded(
    balances: Vec<U256>,
    total_supply: U256,
    virtual_price: U256,
) -> (PoolParameters, PoolReserves) {
    (
        PoolParameters {
            fee: U256::from(4_000_000u64),
            admin_fee: U256::zero(),
            a: U256::from(100u8),
        },
        PoolReserves {
            balances,
            total_supply,
            virtual_price,
        },
    )
}

/// Pools:
/// - `usd` (0xUsd): USDC, USDT; plain pool
/// - `3pool` (0xBase): DAI, USDC3, USDT3; base pool
/// - `frax` (0xMeta): FRAX, 3LP; meta pool over `3pool`
/// - `xy` (0xXy): X, Y; unrelated to everything else
pub fn registry() -> Registry {
    let tokens = vec![
        Token::new("USDC", "0xusdc", 6),
        Token::new("USDT", "0xusdt", 6),
        Token::new("USDLP", "0xusdlp", 18),
        Token::new("DAI", "0xdai", 18),
        Token::new("USDC3", "0xusdc3", 6),
        Token::new("USDT3", "0xusdt3", 6),
        Token::new("3LP", "0x3lp", 18),
        Token::new("FRAX", "0xfrax", 18),
        Token::new("FRAXLP", "0xfraxlp", 18),
        Token::new("X", "0xx", 18),
        Token::new("Y", "0xy", 18),
        Token::new("XYLP", "0xxylp", 18),
    ];
    let pools = vec![
        Pool::new("usd", "0xUsd", vec!["USDC".into(), "USDT".into()], "USDLP"),
        Pool::new(
            "3pool",
            "0xBase",
            vec!["DAI".into(), "USDC3".into(), "USDT3".into()],
            "3LP",
        ),
        Pool::new("frax", "0xMeta", vec!["FRAX".into(), "3LP".into()], "FRAXLP")
            .with_base_pool("3pool", 1),
        Pool::new("xy", "0xXy", vec!["X".into(), "Y".into()], "XYLP"),
    ];
    let mut registry = Registry::new(tokens, pools).unwrap();

    let six = U256::exp10(6);
    let state = [
        ("usd", loaded(vec![U256::from(1_000u32) * six; 2], e18(2_000), PRICE_PRECISION)),
        (
            "3pool",
            loaded(
                vec![e18(1_000), U256::from(1_000u32) * six, U256::from(1_000u32) * six],
                e18(3_000),
                PRICE_PRECISION,
            ),
        ),
        ("frax", loaded(vec![e18(1_000), e18(1_000)], e18(2_000), PRICE_PRECISION)),
    ];
    for (id, (parameters, reserves)) in state {
        registry.update_parameters(id, parameters).unwrap();
        registry.update_reserves(id, reserves).unwrap();
    }
    registry
}
