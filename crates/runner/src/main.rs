use log::info;
use std::sync::Arc;

use tilt_formula::Formula;
use tilt_runner::{
    MarketDataFile, StrategyConfig, construct_portfolio_concurrent, plan_data_requirements,
    prefetched,
};

fn print_help() {
    eprintln!(
        r#"Tilt - factor-tilt portfolio construction

USAGE:
    tilt --config <PATH> --data <PATH>

OPTIONS:
    --config <PATH>     Strategy configuration (formula, universe, date, policy)
    --data <PATH>       Market data file (prices and fundamentals)
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Build the sample portfolio
    tilt --config crates/runner/config/strategy.json --data crates/runner/config/market_data.json

    # Show every exclusion and tilt step
    RUST_LOG=debug tilt -c strategy.json -d market_data.json
"#
    );
}

fn require_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a path argument", flag);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut data_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                config_path = Some(require_value(&args, i, "--config"));
            }
            "--data" | "-d" => {
                i += 1;
                data_path = Some(require_value(&args, i, "--data"));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(config_path), Some(data_path)) = (config_path, data_path) else {
        eprintln!("Error: both --config and --data are required");
        print_help();
        std::process::exit(1);
    };

    info!("Loading strategy from: {}", config_path);
    let config = StrategyConfig::from_file(&config_path)?;
    config.validate()?;

    info!("Loading market data from: {}", data_path);
    let data = MarketDataFile::from_file(&data_path)?;
    data.validate()?;
    info!("Market data covers {} symbols", data.symbols().len());

    let formula = Formula::parse(&config.formula)?;
    info!("Formula {} ({})", formula.source(), formula.fingerprint());

    let plan = plan_data_requirements(&formula, &config.universe, &[config.date])?;
    let metrics = Arc::new(prefetched(data.into_metrics(), &plan)?);

    let mut report = construct_portfolio_concurrent(
        metrics.clone(),
        &config.universe,
        config.date,
        Arc::new(formula),
        &config.policy,
        config.max_concurrency,
    )
    .await?;

    if let Some(value) = config.portfolio_value {
        report = report.with_target(metrics.as_ref(), value)?;
    }
    info!(
        "Cache served {} hits, {} misses",
        metrics.hits(),
        metrics.misses()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
