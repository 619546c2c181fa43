#![deny(warnings)]

//! Headless CLI for the INDUS-RADAR market radar and strategy simulator.

mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use persistence::{Pool, ScanEntry};
use radar_core::{load_config, validate_product, PricingInput, RadarConfig};
use radar_market::{scan, SimulatedMarket};
use report::{advice, group_thousands, SimulationReport};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

/// Number of simulations listed as recent activity on the dashboard.
const RECENT_ACTIVITY: u32 = 5;

#[derive(Parser, Debug)]
#[command(name = "radar", version = VERSION, about = "INDUS-RADAR price scanning and strategy simulation")]
struct Cli {
    /// YAML config file (defaults to $RADAR_CONFIG, then ./radar.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Counters and recent activity.
    Dashboard,
    /// Scan marketplaces for competitor prices.
    Scan {
        #[arg(long)]
        product: String,
        /// Our target purchase price.
        #[arg(long)]
        target: Decimal,
        /// Number of marketplaces to query.
        #[arg(long)]
        sources: Option<usize>,
    },
    /// Evaluate a selling price and search for the most profitable one.
    Simulate {
        #[arg(long)]
        product: String,
        /// Market demand in units.
        #[arg(long, default_value_t = 1000)]
        demand: u64,
        #[arg(long)]
        competitor: f64,
        /// Our unit cost.
        #[arg(long)]
        cost: f64,
        #[arg(long)]
        elasticity: Option<f64>,
        /// Our selling price; defaults to the competitor's.
        #[arg(long)]
        price: Option<f64>,
        /// Write a plain-text report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Searched products and recent simulations.
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var_os("RADAR_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("radar.yaml"))
}

async fn dashboard(pool: &Pool, cfg: &RadarConfig) -> Result<()> {
    let stats = persistence::dashboard_stats(pool).await?;
    println!("INDUS-RADAR AI");
    println!(
        "SCANS: {} | OPPORTUNITIES: {} | SIMULATIONS: {}",
        stats.scans, stats.opportunities, stats.simulations
    );
    println!();
    println!("Recent Activity");
    let recent = persistence::recent_simulations(pool, RECENT_ACTIVITY).await?;
    if recent.is_empty() {
        println!("No recent activity. Start scanning!");
    }
    for sim in recent.iter().rev() {
        println!(
            "  Simulation: {} @ {:.2} {cur} -> Profit: {} {cur}",
            sim.product,
            sim.input.selling_price,
            group_thousands(sim.result.expected_profit),
            cur = cfg.currency
        );
    }
    Ok(())
}

async fn run_scan(
    pool: &Pool,
    cfg: &RadarConfig,
    product: &str,
    target: Decimal,
    sources: Option<usize>,
) -> Result<()> {
    validate_product(product)?;
    let market = SimulatedMarket::new(sources.unwrap_or(cfg.market_sources));
    let summary = scan(&market, product, target)?;
    persistence::record_scan(
        pool,
        &ScanEntry {
            product: product.to_string(),
            target_price: target,
            quotes: summary.lines.len(),
            opportunities: summary.opportunities(),
        },
    )
    .await?;

    let cur = &cfg.currency;
    let mut table = Table::new();
    table.set_header(vec!["Source", "Stock", "Price", "vs Target", "Authenticity"]);
    for line in &summary.lines {
        let stock = if line.quote.in_stock { "In Stock" } else { "Out of Stock" };
        let badge = if line.is_opportunity() {
            format!("+{} {cur}", line.savings.trunc())
        } else {
            "EXPENSIVE".to_string()
        };
        table.add_row(vec![
            line.quote.source.clone(),
            stock.to_string(),
            format!("{:.2} {cur}", line.quote.price),
            badge,
            format!("{}%", line.authenticity),
        ]);
    }
    println!("Results for '{}'", summary.product);
    println!("{table}");
    println!(
        "Best Price: {:.2} {cur} | Average: {:.2} {cur} | Target: {:.2} {cur}",
        summary.best, summary.average, summary.target
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn simulate(
    pool: &Pool,
    cfg: &RadarConfig,
    product: &str,
    demand: u64,
    competitor: f64,
    cost: f64,
    elasticity: Option<f64>,
    price: Option<f64>,
    report_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    validate_product(product)?;
    let elasticity = elasticity.unwrap_or(cfg.default_elasticity);
    let price = price.unwrap_or(competitor);
    let input = PricingInput::new(price, competitor, demand, cost).with_elasticity(elasticity);

    let result = radar_econ::evaluate(&input)?;
    let margin = radar_econ::margin_percent(price, cost)?;
    let optimization =
        radar_econ::find_optimal_price(competitor, cost, demand, elasticity, cfg.optimizer_samples)?;
    let recommendation = radar_econ::classify(price, optimization.optimal_price);
    let id = persistence::record_simulation(pool, product, &input, &result).await?;
    info!(id, product, price, profit = result.expected_profit, "simulation saved");

    let report = SimulationReport::new(
        product,
        &cfg.currency,
        input,
        result,
        margin,
        optimization,
        recommendation,
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "WIN PROB: {}% | SALES: {} | MARGIN: {:.1}% | PROFIT: {} {}",
            report.result.win_probability_percent,
            group_thousands(report.result.expected_sales_units),
            report.margin_percent,
            group_thousands(report.result.expected_profit),
            report.currency
        );
        println!(
            "Optimal price: {:.2} {} (profit {})",
            report.optimal_price,
            report.currency,
            group_thousands(report.optimal_profit)
        );
        println!(
            "{}",
            advice(&report.recommendation, report.optimal_price, &report.currency)
        );
    }
    if let Some(path) = report_path {
        std::fs::write(&path, report.to_string())
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

async fn history(pool: &Pool, cfg: &RadarConfig, limit: u32) -> Result<()> {
    let searched = persistence::search_history(pool).await?;
    println!("Searched products: {}", searched.len());
    for product in &searched {
        println!("  {product}");
    }
    let sims = persistence::recent_simulations(pool, limit).await?;
    let mut table = Table::new();
    table.set_header(vec!["When", "Product", "Price", "Competitor", "Win %", "Profit"]);
    for sim in &sims {
        table.add_row(vec![
            sim.created_at.format("%Y-%m-%d %H:%M").to_string(),
            sim.product.clone(),
            format!("{:.2} {}", sim.input.selling_price, cfg.currency),
            format!("{:.2} {}", sim.input.competitor_price, cfg.currency),
            sim.result.win_probability_percent.to_string(),
            group_thousands(sim.result.expected_profit),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(config_path(&cli))?;
    info!(command = ?cli.command, db = %cfg.database_url, "starting CLI");
    let pool = persistence::init_db(&cfg.database_url).await?;

    match cli.command {
        Command::Dashboard => dashboard(&pool, &cfg).await,
        Command::Scan {
            product,
            target,
            sources,
        } => run_scan(&pool, &cfg, &product, target, sources).await,
        Command::Simulate {
            product,
            demand,
            competitor,
            cost,
            elasticity,
            price,
            report,
            json,
        } => {
            simulate(
                &pool, &cfg, &product, demand, competitor, cost, elasticity, price, report, json,
            )
            .await
        }
        Command::History { limit } => history(&pool, &cfg, limit).await,
    }
}
