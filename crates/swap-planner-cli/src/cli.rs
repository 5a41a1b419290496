//! CLI arguments and output formatting.

use std::path::PathBuf;

use clap::Parser;
use swap_planner::config::CliConfig;
use swap_planner::engine::fee_cover::FeeCover;
use swap_planner::plan::{Preview, SwapPlan};
use swap_planner::utils::format::{format_slippage, format_token_amount};
use swap_planner::utils::scenario::Scenario;
use swap_planner::Token;

/// Plan the swaps converting one asset basket into another.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON scenario with token prices, venue pools and both baskets.
    #[arg(long)]
    pub scenario: PathBuf,
    /// Print the settlement arrays as JSON.
    #[arg(long)]
    pub json: bool,
    /// Also size the liquidation fee described in the scenario.
    #[arg(long)]
    pub cover_fee: bool,
    #[command(flatten)]
    pub config: CliConfig,
}

fn symbol(scenario: &Scenario, token: Token) -> String {
    scenario.symbol_decimals(token).0
}

fn amount(scenario: &Scenario, token: Token, raw: swap_planner::U256) -> String {
    let (symbol, decimals) = scenario.symbol_decimals(token);
    format!("{} {}", format_token_amount(raw, decimals), symbol)
}

pub fn print_plan(scenario: &Scenario, plan: &SwapPlan) {
    println!("\n--- Inputs ---");
    for input in &plan.inputs {
        println!("{:<28} value {}", amount(scenario, input.token, input.amount), input.value);
    }
    println!("\n--- Output targets ---");
    for output in &plan.outputs {
        println!(
            "{:<10} ratio {:<8} target value {} (floor value {})",
            symbol(scenario, output.token),
            output.ratio,
            output.target_value,
            output.floor_value
        );
    }

    println!("\n--- Swaps ({}) ---", plan.swaps.len());
    if plan.is_empty() {
        println!("No route could fill any output.");
        return;
    }
    for (index, swap) in plan.swaps.iter().enumerate() {
        println!(
            "{:>2}. {} -> {} [{}] slippage {}",
            index + 1,
            amount(scenario, swap.token_in, swap.amount_in),
            amount(scenario, swap.token_out, swap.amount_out),
            swap.kind,
            format_slippage(swap.slippage)
        );
        for (venue, path) in swap.legs() {
            let route = path.iter().map(|token| symbol(scenario, *token)).collect::<Vec<String>>().join(" -> ");
            println!("      via {}: {}", venue, route);
        }
    }
}

pub fn print_preview(scenario: &Scenario, preview: &Preview) {
    println!("\n--- Expected outputs ---");
    for ((token, raw), value) in preview.tokens.iter().zip(&preview.amounts).zip(&preview.values) {
        println!("{:<28} value {}", amount(scenario, *token, *raw), value);
    }
}

pub fn print_fee_cover(scenario: &Scenario, fee_asset: Token, cover: &FeeCover) {
    println!("\n--- Liquidation fee ---");
    println!("Gas used:      {}", cover.gas_used);
    println!("Gas price:     {} wei", cover.gas_price);
    println!("Estimated fee: {}", amount(scenario, fee_asset, cover.estimated_fee));
    println!("Actual fee:    {} (value {})", amount(scenario, fee_asset, cover.actual_fee), cover.fee_value);
}
