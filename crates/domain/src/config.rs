//! Static chain configuration.
//!
//! Tokens, pools and base-pool links, plus the timing and slippage defaults
//! used by the estimators. Loaded from JSON and validated into a [`Registry`].

use crate::entities::{Pool, Token};
use crate::error::DomainError;
use crate::math::SLIPPAGE_PRECISION;
use crate::registry::Registry;
use crate::route::SwapPair;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default slippage tolerance: 0.5% over `SLIPPAGE_PRECISION`.
pub const DEFAULT_SLIPPAGE: u64 = 5_000;
/// Default pool-state polling interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;
/// Default input debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    pub assets: Vec<String>,
    pub lp_token: String,
    #[serde(default)]
    pub base_pool: Option<String>,
    #[serde(default)]
    pub base_pool_index: Option<usize>,
}

/// One chain's worth of configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub name: String,
    /// Address of the meta/base swap router.
    #[serde(default)]
    pub router: Option<String>,
    pub tokens: BTreeMap<String, TokenConfig>,
    /// Pools in display order.
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub default_swap: Option<SwapPair>,
    /// Slippage numerator over `SLIPPAGE_PRECISION`.
    #[serde(default = "default_slippage")]
    pub slippage: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Backend-specific seed state, interpreted by the query backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<serde_json::Value>,
}

fn default_slippage() -> u64 {
    DEFAULT_SLIPPAGE
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl ChainConfig {
    /// # Errors
    /// Returns `DomainError::InvalidConfig` when the JSON does not parse.
    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DomainError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `DomainError::InvalidConfig` when the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DomainError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            tokens = config.tokens.len(),
            pools = config.pools.len(),
            "Loaded chain configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if U256::from(self.slippage) > SLIPPAGE_PRECISION {
            return Err(DomainError::InvalidConfig(format!(
                "slippage {} exceeds {}",
                self.slippage, SLIPPAGE_PRECISION
            )));
        }
        if self.debounce_ms == 0 || self.refresh_interval_secs == 0 {
            return Err(DomainError::InvalidConfig(
                "debounce and refresh interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn slippage(&self) -> U256 {
        U256::from(self.slippage)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Builds the token and pool tables.
    ///
    /// # Errors
    /// Propagates registry validation failures.
    pub fn to_registry(&self) -> Result<Registry, DomainError> {
        let tokens = self.tokens.iter().map(|(symbol, t)| {
            let token = Token::new(symbol.clone(), t.address.clone(), t.decimals);
            match &t.name {
                Some(name) => token.with_name(name.clone()),
                None => token,
            }
        });

        let pools = self
            .pools
            .iter()
            .map(|p| {
                let mut pool = Pool::new(
                    p.id.clone(),
                    p.address.clone(),
                    p.assets.clone(),
                    p.lp_token.clone(),
                );
                if let Some(name) = &p.name {
                    pool = pool.with_name(name.clone());
                }
                pool.base_pool = p.base_pool.clone();
                pool.base_pool_index = p.base_pool_index;
                pool
            })
            .collect();

        Registry::new(tokens, pools)
    }

    /// Consumes the configuration into a registry.
    pub fn into_registry(self) -> Result<Registry, DomainError> {
        self.to_registry()
    }
}
