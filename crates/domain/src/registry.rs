//! In-memory registry of tokens and pools.
//!
//! The registry is built once per chain connection from static configuration.
//! Only the pool-state updater writes to it afterwards; estimators read it.

use crate::entities::{Pool, PoolParameters, PoolReserves, PoolSnapshot, Token};
use crate::error::DomainError;
use crate::math::mul_div;
use primitive_types::U256;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where a token lives: its pool, its index in that pool, and the pool's base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocation {
    pub pool_id: String,
    pub pool_address: String,
    pub index: usize,
    pub base_pool: Option<String>,
}

/// Token and pool tables plus the derived token → pool index.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tokens: HashMap<String, Token>,
    pools: Vec<Pool>,
    pool_ids: HashMap<String, usize>,
    pool_addresses: HashMap<String, usize>,
    token_index: HashMap<String, TokenLocation>,
}

impl Registry {
    /// Builds and validates a registry.
    ///
    /// # Errors
    /// Returns an error when a pool references an unknown token or base pool,
    /// when a meta pool does not hold its base pool's LP token, or when pool
    /// ids collide.
    pub fn new(
        tokens: impl IntoIterator<Item = Token>,
        pools: Vec<Pool>,
    ) -> Result<Self, DomainError> {
        let tokens: HashMap<String, Token> =
            tokens.into_iter().map(|t| (t.symbol.clone(), t)).collect();

        let mut pool_ids = HashMap::new();
        let mut pool_addresses = HashMap::new();
        for (i, pool) in pools.iter().enumerate() {
            if pool_ids.insert(pool.id.clone(), i).is_some() {
                return Err(DomainError::DuplicatePool(pool.id.clone()));
            }
            pool_addresses.insert(pool.address.to_lowercase(), i);
            if let Some(missing) = pool.assets.iter().find(|a| !tokens.contains_key(*a)) {
                return Err(DomainError::UnknownToken {
                    pool: pool.id.clone(),
                    token: missing.clone(),
                });
            }
        }

        let mut pools = pools;
        for i in 0..pools.len() {
            let Some(base_id) = pools[i].base_pool.clone() else {
                continue;
            };
            let meta_id = pools[i].id.clone();
            let base = pool_ids
                .get(&base_id)
                .map(|&b| &pools[b])
                .ok_or_else(|| DomainError::UnknownBasePool {
                    pool: meta_id.clone(),
                    base_pool: base_id.clone(),
                })?;
            if base.base_pool.is_some() {
                return Err(DomainError::NestedBasePool {
                    pool: meta_id,
                    base_pool: base_id,
                });
            }
            let lp_token = base.lp_token.clone();
            let actual = pools[i].index_of(&lp_token).ok_or_else(|| {
                DomainError::MissingBaseLpToken {
                    pool: meta_id.clone(),
                    lp_token: lp_token.clone(),
                }
            })?;
            match pools[i].base_pool_index {
                Some(declared) if declared != actual => {
                    return Err(DomainError::BasePoolIndexMismatch {
                        pool: meta_id,
                        declared,
                        actual,
                    });
                }
                Some(_) => {}
                None => pools[i].base_pool_index = Some(actual),
            }
        }

        let token_index = Self::build_token_index(&pools);

        debug!(
            tokens = tokens.len(),
            pools = pools.len(),
            "Registry initialized"
        );

        Ok(Self {
            tokens,
            pools,
            pool_ids,
            pool_addresses,
            token_index,
        })
    }

    fn build_token_index(pools: &[Pool]) -> HashMap<String, TokenLocation> {
        let mut index = HashMap::new();
        for pool in pools {
            for (i, asset) in pool.assets.iter().enumerate() {
                let location = TokenLocation {
                    pool_id: pool.id.clone(),
                    pool_address: pool.address.clone(),
                    index: i,
                    base_pool: pool.base_pool.clone(),
                };
                if let Some(previous) = index.insert(asset.clone(), location) {
                    warn!(
                        token = %asset,
                        previous = %previous.pool_id,
                        pool = %pool.id,
                        "Token listed in several pools; routing uses the last one"
                    );
                }
            }
        }
        index
    }

    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.tokens.get(symbol)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn pool(&self, id: &str) -> Option<&Pool> {
        self.pool_ids.get(id).map(|&i| &self.pools[i])
    }

    /// Looks a pool up by contract address (case-insensitive).
    pub fn pool_by_address(&self, address: &str) -> Option<&Pool> {
        self.pool_addresses
            .get(&address.to_lowercase())
            .map(|&i| &self.pools[i])
    }

    /// Pools in configuration order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    pub fn base_pool_of(&self, pool: &Pool) -> Option<&Pool> {
        pool.base_pool.as_deref().and_then(|id| self.pool(id))
    }

    /// Pool membership of a token for O(1) route lookups.
    pub fn token_location(&self, symbol: &str) -> Option<&TokenLocation> {
        self.token_index.get(symbol)
    }

    /// Assets a user interacts with for `pool_id`.
    ///
    /// Own assets first, then base-pool assets, both in configuration order,
    /// with the base LP token removed. With `use_base_pool_token` only the
    /// pool's own assets are returned (base LP token included).
    pub fn effective_assets(
        &self,
        pool_id: &str,
        use_base_pool_token: bool,
    ) -> Result<Vec<&Token>, DomainError> {
        let pool = self
            .pool(pool_id)
            .ok_or_else(|| DomainError::UnknownPool(pool_id.to_string()))?;

        let base = if use_base_pool_token {
            None
        } else {
            self.base_pool_of(pool)
        };
        let base_lp = base.map(|b| b.lp_token.as_str());
        let base_assets = base.map(|b| b.assets.as_slice()).unwrap_or(&[]);

        pool.assets
            .iter()
            .chain(base_assets)
            .filter(|symbol| Some(symbol.as_str()) != base_lp)
            .map(|symbol| {
                self.token(symbol).ok_or_else(|| DomainError::UnknownToken {
                    pool: pool.id.clone(),
                    token: symbol.clone(),
                })
            })
            .collect()
    }

    /// Balance of `symbol` as seen from `pool_id`.
    ///
    /// Base-pool assets are scaled by the meta pool's share of the base LP:
    /// `base_balance * meta_balance[base_lp] / base_total_supply`.
    pub fn effective_balance(&self, pool_id: &str, symbol: &str) -> Option<U256> {
        let pool = self.pool(pool_id)?;
        if let Some(balance) = pool.balance_of(symbol) {
            return Some(balance);
        }
        let base = self.base_pool_of(pool)?;
        let base_balance = base.balance_of(symbol)?;
        let lp_held = pool.balance_of(&base.lp_token)?;
        mul_div(base_balance, lp_held, base.total_supply()?).ok()
    }

    /// Value of one pool at virtual price, 1e18 units. `None` until loaded.
    pub fn pool_tvl(&self, pool_id: &str) -> Option<U256> {
        self.pool(pool_id)?.tvl()
    }

    /// Sum of all loaded pools' value at virtual price, 1e18 units.
    pub fn total_tvl(&self) -> U256 {
        self.pools
            .iter()
            .filter_map(Pool::tvl)
            .fold(U256::zero(), |acc, v| acc.saturating_add(v))
    }

    /// Pool ids to keep fresh when `pool_id` is in use: itself and its base.
    pub fn watch_set(&self, pool_id: &str) -> Result<Vec<String>, DomainError> {
        let pool = self
            .pool(pool_id)
            .ok_or_else(|| DomainError::UnknownPool(pool_id.to_string()))?;
        let mut ids = vec![pool.id.clone()];
        ids.extend(pool.base_pool.clone());
        Ok(ids)
    }

    fn pool_mut(&mut self, id: &str) -> Result<&mut Pool, DomainError> {
        let &i = self
            .pool_ids
            .get(id)
            .ok_or_else(|| DomainError::UnknownPool(id.to_string()))?;
        Ok(&mut self.pools[i])
    }

    pub fn update_parameters(
        &mut self,
        id: &str,
        parameters: PoolParameters,
    ) -> Result<(), DomainError> {
        self.pool_mut(id)?.parameters = Some(parameters);
        Ok(())
    }

    /// # Errors
    /// Returns an error when the balance count does not match the pool's assets.
    pub fn update_reserves(&mut self, id: &str, reserves: PoolReserves) -> Result<(), DomainError> {
        let pool = self.pool_mut(id)?;
        if reserves.balances.len() != pool.assets.len() {
            return Err(DomainError::BalanceCountMismatch {
                pool: id.to_string(),
                expected: pool.assets.len(),
                actual: reserves.balances.len(),
            });
        }
        pool.reserves = Some(reserves);
        Ok(())
    }

    pub fn apply_snapshot(&mut self, id: &str, snapshot: PoolSnapshot) -> Result<(), DomainError> {
        self.update_reserves(id, snapshot.reserves)?;
        self.update_parameters(id, snapshot.parameters)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture() -> Registry {
        let tokens = vec![
            Token::new("USDC", "0xusdc", 6),
            Token::new("USDT", "0xusdt", 6),
            Token::new("DAI", "0xdai", 18),
            Token::new("3LP", "0x3lp", 18),
            Token::new("FRAX", "0xfrax", 18),
            Token::new("FRAXLP", "0xfraxlp", 18),
            Token::new("BUSD", "0xbusd", 18),
            Token::new("UST", "0xust", 6),
            Token::new("ULP", "0xulp", 18),
        ];
        let pools = vec![
            Pool::new(
                "3pool",
                "0xBase",
                vec!["USDC".into(), "USDT".into(), "DAI".into()],
                "3LP",
            ),
            Pool::new("frax", "0xMeta", vec!["FRAX".into(), "3LP".into()], "FRAXLP")
                .with_base_pool("3pool", 1),
            Pool::new("ust", "0xUst", vec!["UST".into(), "BUSD".into()], "ULP"),
        ];
        Registry::new(tokens, pools).unwrap()
    }

    #[test]
    fn test_token_index() {
        let r = fixture();
        let usdt = r.token_location("USDT").unwrap();
        assert_eq!(usdt.pool_id, "3pool");
        assert_eq!(usdt.index, 1);
        assert_eq!(usdt.base_pool, None);

        let frax = r.token_location("FRAX").unwrap();
        assert_eq!(frax.pool_id, "frax");
        assert_eq!(frax.base_pool.as_deref(), Some("3pool"));
        assert!(r.token_location("WETH").is_none());
    }

    #[test]
    fn test_effective_assets_order() {
        let r = fixture();
        let symbols: Vec<&str> = r
            .effective_assets("frax", false)
            .unwrap()
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["FRAX", "USDC", "USDT", "DAI"]);

        let own: Vec<&str> = r
            .effective_assets("frax", true)
            .unwrap()
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(own, vec!["FRAX", "3LP"]);
    }

    #[test]
    fn test_rejects_missing_base_lp() {
        let tokens = vec![Token::new("A", "0xa", 18), Token::new("B", "0xb", 18)];
        let pools = vec![
            Pool::new("base", "0x1", vec!["A".into()], "BLP"),
            Pool::new("meta", "0x2", vec!["B".into()], "MLP").with_base_pool("base", 0),
        ];
        let err = Registry::new(tokens, pools).unwrap_err();
        assert!(matches!(err, DomainError::MissingBaseLpToken { .. }));
    }

    #[test]
    fn test_rejects_unknown_base_pool() {
        let tokens = vec![Token::new("A", "0xa", 18)];
        let pools =
            vec![Pool::new("meta", "0x2", vec!["A".into()], "MLP").with_base_pool("nope", 0)];
        let err = Registry::new(tokens, pools).unwrap_err();
        assert!(matches!(err, DomainError::UnknownBasePool { .. }));
    }

    #[test]
    fn test_rejects_wrong_base_index() {
        let tokens = vec![
            Token::new("A", "0xa", 18),
            Token::new("B", "0xb", 18),
            Token::new("BLP", "0xblp", 18),
        ];
        let pools = vec![
            Pool::new("base", "0x1", vec!["A".into()], "BLP"),
            Pool::new("meta", "0x2", vec!["B".into(), "BLP".into()], "MLP")
                .with_base_pool("base", 0),
        ];
        let err = Registry::new(tokens, pools).unwrap_err();
        assert_eq!(
            err,
            DomainError::BasePoolIndexMismatch {
                pool: "meta".into(),
                declared: 0,
                actual: 1
            }
        );
    }

    #[test]
    fn test_update_reserves_checks_length() {
        let mut r = fixture();
        let err = r
            .update_reserves(
                "3pool",
                PoolReserves {
                    balances: vec![U256::one()],
                    total_supply: U256::one(),
                    virtual_price: U256::one(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::BalanceCountMismatch { .. }));
        assert!(r.pool("3pool").unwrap().reserves.is_none());
    }

    #[test]
    fn test_effective_balance_of_base_asset() {
        let mut r = fixture();
        r.update_reserves(
            "3pool",
            PoolReserves {
                balances: vec![U256::from(1_000u32); 3],
                total_supply: U256::from(3_000u32),
                virtual_price: U256::exp10(18),
            },
        )
        .unwrap();
        r.update_reserves(
            "frax",
            PoolReserves {
                balances: vec![U256::from(500u32), U256::from(300u32)],
                total_supply: U256::from(800u32),
                virtual_price: U256::exp10(18),
            },
        )
        .unwrap();

        // meta holds 300 / 3000 = 10% of the base pool
        assert_eq!(r.effective_balance("frax", "USDC"), Some(U256::from(100u32)));
        assert_eq!(r.effective_balance("frax", "FRAX"), Some(U256::from(500u32)));
        assert_eq!(r.effective_balance("ust", "UST"), None);
        assert_eq!(r.pool_tvl("ust"), None);
        assert_eq!(r.pool_tvl("frax"), Some(U256::from(800u32)));
        assert_eq!(r.total_tvl(), U256::from(3_800u32));
    }

    #[test]
    fn test_watch_set_includes_base() {
        let r = fixture();
        assert_eq!(r.watch_set("frax").unwrap(), vec!["frax", "3pool"]);
        assert_eq!(r.watch_set("ust").unwrap(), vec!["ust"]);
        assert!(r.pool_by_address("0xmeta").is_some());
    }
}
