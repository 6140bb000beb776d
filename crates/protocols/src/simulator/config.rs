use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stable_lp_domain::error::DomainError;
use std::collections::BTreeMap;

/// Seed state for one pool, in human units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedPoolConfig {
    /// Balances aligned with the pool's configured assets.
    pub balances: Vec<Decimal>,
    /// LP supply; defaults to the pool invariant (virtual price 1.0).
    #[serde(default)]
    pub total_supply: Option<Decimal>,
    /// Amplification coefficient.
    pub a: u64,
    /// Trading fee over 1e10.
    pub fee: u64,
    /// Admin share of the fee over 1e10.
    #[serde(default)]
    pub admin_fee: u64,
}

/// Seed state for every simulated pool, keyed by pool id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub pools: BTreeMap<String, SimulatedPoolConfig>,
    /// Artificial delay added to every read.
    #[serde(default)]
    pub latency_ms: u64,
}

impl SimulatorConfig {
    /// Parses the `simulation` section of a chain configuration.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, DomainError> {
        serde_json::from_value(value.clone())
            .map_err(|e| DomainError::InvalidConfig(format!("simulation: {e}")))
    }
}
