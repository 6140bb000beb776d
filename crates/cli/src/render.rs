//! Terminal output for estimates and pools.

use primitive_types::U256;
use stable_lp_domain::error::EstimateError;
use stable_lp_domain::math::{
    FEE_PRECISION, HIGH_IMPACT_THRESHOLD, PEG_PRICE, PRECISION, PRICE_DECIMALS, VALUE_DECIMALS,
};
use stable_lp_domain::registry::Registry;
use stable_lp_domain::route::Route;
use stable_lp_domain::value_objects::{
    Amount, DepositEstimate, Percentage, SwapEstimate, ValueDelta, WithdrawEstimate,
};

const RULE: &str = "════════════════════════════════════════════";

fn amount(raw: U256, decimals: u8) -> String {
    Amount::new(raw, decimals).to_string()
}

fn value(raw: U256) -> String {
    format!("${}", amount(raw, VALUE_DECIMALS))
}

fn delta(delta: &ValueDelta) -> String {
    match delta {
        ValueDelta::Neutral => "-".to_string(),
        ValueDelta::Impact(_) => {
            let warn = if delta.is_high_impact() { " ⚠️" } else { "" };
            format!("impact {}{warn}", delta.as_percentage())
        }
        ValueDelta::Bonus(_) => format!("bonus {}", delta.as_percentage()),
    }
}

pub fn pools(registry: &Registry) {
    println!("\n🏊 Pools");
    println!("{RULE}");
    for pool in registry.pools() {
        let kind = match &pool.base_pool {
            Some(base) => format!("meta over {base}"),
            None => "plain".to_string(),
        };
        println!("{} ({}) [{kind}] {}", pool.name, pool.id, pool.address);

        match (&pool.parameters, &pool.reserves) {
            (Some(params), Some(reserves)) => {
                println!(
                    "  A: {}  fee: {}  virtual price: {}",
                    params.a,
                    Percentage::new(params.fee, FEE_PRECISION),
                    amount(reserves.virtual_price, VALUE_DECIMALS)
                );
                if let Some(tvl) = pool.tvl() {
                    println!("  TVL: {}", value(tvl));
                }
            }
            _ => println!("  state not loaded"),
        }

        let assets = registry.effective_assets(&pool.id, false).unwrap_or_default();
        for token in assets {
            let balance = registry
                .effective_balance(&pool.id, &token.symbol)
                .map_or_else(|| "-".to_string(), |b| amount(b, token.decimals));
            println!("  {:<8} {balance}", token.symbol);
        }
    }
    println!("{RULE}");
    println!("Total TVL: {}", value(registry.total_tvl()));
}

pub fn route(from: &str, to: &str, route: Option<&Route>) {
    match route {
        Some(route) => println!("🔀 {from} -> {to}: {route}"),
        None => println!("❌ No route from {from} to {to}"),
    }
}

pub fn swap(from: (&str, u8), to: (&str, u8), estimate: &SwapEstimate) {
    let (from, from_decimals) = from;
    let (to, to_decimals) = to;
    println!("\n🔁 Swap {from} -> {to}");
    println!("{RULE}");
    println!("Input:            {} {from}", amount(estimate.input, from_decimals));
    println!("Quote:            {} {to}", amount(estimate.quote, to_decimals));
    println!("Output after fee: {} {to}", amount(estimate.output, to_decimals));
    println!("Minimum received: {} {to}", amount(estimate.min_output, to_decimals));
    println!(
        "Rate:             1 {from} = {} {to}",
        amount(estimate.output_per_input, PRICE_DECIMALS)
    );
    println!(
        "Inverse rate:     1 {to} = {} {from}",
        amount(estimate.input_per_output, PRICE_DECIMALS)
    );
    let impact = match (estimate.impact, estimate.impact_percentage()) {
        (Some(v), Some(pct)) => {
            // swap impact is over the peg; the threshold is over PRECISION
            let high = v.saturating_mul(PRECISION / PEG_PRICE) > HIGH_IMPACT_THRESHOLD;
            let warn = if high { " ⚠️" } else { "" };
            format!("{pct}{warn}")
        }
        _ => "-".to_string(),
    };
    println!("Price impact:     {impact}");
    println!("{RULE}");
}

pub fn deposit(pool: &str, lp_decimals: u8, estimate: &DepositEstimate) {
    println!("\n📥 Deposit into {pool}");
    println!("{RULE}");
    println!("Value in:         {}", value(estimate.value_in));
    println!("LP quoted:        {}", amount(estimate.lp_quote, lp_decimals));
    println!("Minimum LP:       {}", amount(estimate.min_lp_amount, lp_decimals));
    println!("LP value:         {}", value(estimate.value_out));
    println!("Pool share:       {}", estimate.pool_share_percentage());
    println!("Bonus / impact:   {}", delta(&estimate.delta));
    println!("{RULE}");
}

pub fn withdraw(
    pool: &str,
    lp_decimals: u8,
    assets: &[(String, u8)],
    spender: &str,
    estimate: &WithdrawEstimate,
) {
    println!("\n📤 Withdraw from {pool}");
    println!("{RULE}");
    println!("LP redeemed:      {}", amount(estimate.lp_amount, lp_decimals));
    for (i, (symbol, decimals)) in assets.iter().enumerate() {
        let out = estimate.amounts.get(i).copied().flatten();
        let min = estimate.min_amounts.get(i).copied().flatten();
        if let (Some(out), Some(min)) = (out, min) {
            println!(
                "  {symbol:<8} {} (min {})",
                amount(out, *decimals),
                amount(min, *decimals)
            );
        }
    }
    println!("Value out:        {}", value(estimate.value_out));
    println!(
        "New virtual price: {}",
        amount(estimate.new_virtual_price, VALUE_DECIMALS)
    );
    println!("Bonus / impact:   {}", delta(&estimate.delta));
    println!("Approve LP for:   {spender}");
    println!("{RULE}");
}

pub fn unavailable(reason: &EstimateError) {
    if reason.is_no_route() {
        println!("❌ {reason}");
    } else {
        println!("⏳ No estimate: {reason}");
    }
}
