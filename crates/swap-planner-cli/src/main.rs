mod cli;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use swap_planner::config::FileConfig;
use swap_planner::utils::scenario::load_scenario;
use swap_planner::{PlannerConfig, SwapPlanner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{print_fee_cover, print_plan, print_preview, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let scenario = load_scenario(&cli.scenario)?;

    // The scenario's numeraire applies unless a flag, file or env var says otherwise.
    let mut config_args = cli.config.clone();
    let file_sets_numeraire = match config_args.config.as_deref() {
        Some(path) => FileConfig::read(path)?.numeraire_token.is_some(),
        None => false,
    };
    if config_args.numeraire_token.is_none() && !file_sets_numeraire && std::env::var("NUMERAIRE_TOKEN").is_err() {
        config_args.numeraire_token = Some(scenario.numeraire.to_string());
    }
    let config = PlannerConfig::load_with_cli(&config_args)?;
    info!(numeraire = %config.numeraire_token, venues = scenario.venues.len(), "Loaded scenario");

    let planner = SwapPlanner::new(Arc::new(scenario.oracle()?), scenario.venues(), config);

    let plan = planner.plan_swaps(&scenario.provided, &scenario.desired).await?;
    print_plan(&scenario, &plan);

    let preview = planner.preview_value(&scenario.provided, &scenario.desired, &plan).await?;
    print_preview(&scenario, &preview);
    if let Err(e) = preview.check_floors(&scenario.desired) {
        warn!(error = %e, "Plan does not meet minimum outputs");
        println!("WARNING: {}", e);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&plan.to_wire())?);
    }

    if cli.cover_fee {
        let liquidation = scenario
            .liquidation
            .as_ref()
            .ok_or_else(|| anyhow!("--cover-fee needs a \"liquidation\" section in the scenario"))?;
        let cover = planner
            .cover_fee(&liquidation.position, liquidation.fee_asset, liquidation.estimated_fee, &scenario.gas)
            .await?;
        print_fee_cover(&scenario, liquidation.fee_asset, &cover);
        print_plan(&scenario, &cover.plan);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&cover.plan.to_wire())?);
        }
    }

    Ok(())
}
