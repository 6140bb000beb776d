//! Swap route resolution.
//!
//! A route connects two tokens through at most one base-pool hop. The `pool`
//! field of a route is always the contract that gets invoked: the pool itself
//! for same-pool swaps, the meta pool for router swaps.

use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Direction of a router swap relative to the base pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Meta-pool asset into a base-pool asset.
    ToBase,
    /// Base-pool asset into a meta-pool asset.
    FromBase,
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToBase => write!(f, "to-base"),
            Self::FromBase => write!(f, "from-base"),
        }
    }
}

/// How a swap between two tokens is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Both tokens live in `pool`.
    SamePool {
        pool: String,
        from_index: usize,
        to_index: usize,
    },
    /// Through the router, from a meta-pool asset into a base-pool asset.
    SwapToBase {
        pool: String,
        base_pool: String,
        from_index: usize,
        to_index: usize,
    },
    /// Through the router, from a base-pool asset into a meta-pool asset.
    SwapFromBase {
        pool: String,
        base_pool: String,
        from_index: usize,
        to_index: usize,
    },
}

impl Route {
    /// Address of the invoked pool.
    pub fn pool(&self) -> &str {
        match self {
            Self::SamePool { pool, .. }
            | Self::SwapToBase { pool, .. }
            | Self::SwapFromBase { pool, .. } => pool,
        }
    }

    pub fn base_pool(&self) -> Option<&str> {
        match self {
            Self::SamePool { .. } => None,
            Self::SwapToBase { base_pool, .. } | Self::SwapFromBase { base_pool, .. } => {
                Some(base_pool)
            }
        }
    }

    pub fn from_index(&self) -> usize {
        match self {
            Self::SamePool { from_index, .. }
            | Self::SwapToBase { from_index, .. }
            | Self::SwapFromBase { from_index, .. } => *from_index,
        }
    }

    pub fn to_index(&self) -> usize {
        match self {
            Self::SamePool { to_index, .. }
            | Self::SwapToBase { to_index, .. }
            | Self::SwapFromBase { to_index, .. } => *to_index,
        }
    }

    /// `None` for same-pool swaps.
    pub fn direction(&self) -> Option<SwapDirection> {
        match self {
            Self::SamePool { .. } => None,
            Self::SwapToBase { .. } => Some(SwapDirection::ToBase),
            Self::SwapFromBase { .. } => Some(SwapDirection::FromBase),
        }
    }

    /// Address of the pool whose trading fee applies to the output.
    ///
    /// The output of a to-base swap leaves through the base pool, so its fee
    /// is the base pool's.
    pub fn fee_pool(&self) -> &str {
        match self {
            Self::SwapToBase { base_pool, .. } => base_pool,
            Self::SamePool { pool, .. } | Self::SwapFromBase { pool, .. } => pool,
        }
    }

    /// The route for the opposite trade.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self.clone() {
            Self::SamePool {
                pool,
                from_index,
                to_index,
            } => Self::SamePool {
                pool,
                from_index: to_index,
                to_index: from_index,
            },
            Self::SwapToBase {
                pool,
                base_pool,
                from_index,
                to_index,
            } => Self::SwapFromBase {
                pool,
                base_pool,
                from_index: to_index,
                to_index: from_index,
            },
            Self::SwapFromBase {
                pool,
                base_pool,
                from_index,
                to_index,
            } => Self::SwapToBase {
                pool,
                base_pool,
                from_index: to_index,
                to_index: from_index,
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SamePool {
                pool,
                from_index,
                to_index,
            } => write!(f, "same-pool {pool} [{from_index} -> {to_index}]"),
            Self::SwapToBase {
                pool,
                base_pool,
                from_index,
                to_index,
            }
            | Self::SwapFromBase {
                pool,
                base_pool,
                from_index,
                to_index,
            } => write!(
                f,
                "router {} {pool} / {base_pool} [{from_index} -> {to_index}]",
                self.direction().map_or_else(String::new, |d| d.to_string())
            ),
        }
    }
}

/// Finds the route between two tokens.
///
/// Returns `None` when either token is unknown, when both are the same token,
/// or when the tokens are not connected through at most one base-pool hop.
pub fn resolve_route(registry: &Registry, from: &str, to: &str) -> Option<Route> {
    if from == to {
        return None;
    }
    let from_loc = registry.token_location(from)?;
    let to_loc = registry.token_location(to)?;

    let route = if from_loc.pool_id == to_loc.pool_id {
        Route::SamePool {
            pool: from_loc.pool_address.clone(),
            from_index: from_loc.index,
            to_index: to_loc.index,
        }
    } else if to_loc.base_pool.as_deref() == Some(from_loc.pool_id.as_str()) {
        Route::SwapFromBase {
            pool: to_loc.pool_address.clone(),
            base_pool: from_loc.pool_address.clone(),
            from_index: from_loc.index,
            to_index: to_loc.index,
        }
    } else if from_loc.base_pool.as_deref() == Some(to_loc.pool_id.as_str()) {
        Route::SwapToBase {
            pool: from_loc.pool_address.clone(),
            base_pool: to_loc.pool_address.clone(),
            from_index: from_loc.index,
            to_index: to_loc.index,
        }
    } else {
        debug!(from, to, "No route between tokens");
        return None;
    };

    debug!(from, to, route = %route, "Route resolved");
    Some(route)
}

/// The token pair selected for a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPair {
    pub from: String,
    pub to: String,
}

impl SwapPair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Sets the input token. Picking the current output token flips the pair.
    pub fn select_from(&mut self, symbol: &str) {
        if symbol == self.to {
            self.invert();
        } else {
            self.from = symbol.to_string();
        }
    }

    /// Sets the output token. Picking the current input token flips the pair.
    pub fn select_to(&mut self, symbol: &str) {
        if symbol == self.from {
            self.invert();
        } else {
            self.to = symbol.to_string();
        }
    }

    pub fn invert(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    pub fn resolve(&self, registry: &Registry) -> Option<Route> {
        resolve_route(registry, &self.from, &self.to)
    }
}
