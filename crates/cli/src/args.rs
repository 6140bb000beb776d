//! Conversions from command-line values to raw request amounts.

use anyhow::{Context, Result, anyhow, bail};
use primitive_types::U256;
use rust_decimal::Decimal;
use stable_lp_domain::registry::Registry;
use stable_lp_domain::value_objects::{Amount, Percentage};

/// Parses `SYMBOL=AMOUNT`.
pub fn parse_allocation(s: &str) -> Result<(String, Decimal), String> {
    let (symbol, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=AMOUNT, got `{s}`"))?;
    let amount = amount
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount `{amount}`: {e}"))?;
    Ok((symbol.trim().to_string(), amount))
}

/// Human amount of `symbol` to raw units.
pub fn raw_amount(registry: &Registry, symbol: &str, amount: Decimal) -> Result<U256> {
    let token = registry
        .token(symbol)
        .ok_or_else(|| anyhow!("unknown token {symbol}"))?;
    let amount = Amount::from_decimal(amount, token.decimals)
        .with_context(|| format!("amount {amount} {symbol} is not representable"))?;
    Ok(amount.raw)
}

/// Lays `allocations` out along the pool's effective assets.
pub fn deposit_amounts(
    registry: &Registry,
    pool: &str,
    use_base_pool_token: bool,
    allocations: &[(String, Decimal)],
) -> Result<Vec<U256>> {
    let assets = registry.effective_assets(pool, use_base_pool_token)?;
    let mut amounts = vec![U256::zero(); assets.len()];
    for (symbol, amount) in allocations {
        let Some(index) = assets.iter().position(|t| &t.symbol == symbol) else {
            let names: Vec<&str> = assets.iter().map(|t| t.symbol.as_str()).collect();
            bail!("{symbol} is not an asset of {pool} (assets: {})", names.join(", "));
        };
        amounts[index] = raw_amount(registry, symbol, *amount)?;
    }
    Ok(amounts)
}

/// Slippage in percent ("0.5") to its numerator over 1e6.
pub fn slippage(percent: Decimal) -> Result<U256> {
    Percentage::slippage_from_percent(percent)
        .with_context(|| format!("slippage {percent}% must be between 0 and 100"))
}
