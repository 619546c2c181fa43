#![deny(warnings)]

//! Persistence layer: SQLite storage for simulation history, scanned
//! products and dashboard counters.
//!
//! The pricing model never touches this crate. Callers evaluate first and
//! then hand the inputs and results here to be stored verbatim.

use chrono::{DateTime, Utc};
use radar_core::{validate_product, PricingInput, PricingResult, SimulationRecord, ValidationError};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub use sqlx::sqlite::SqlitePool as Pool;

/// Errors returned by the persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("bad timestamp in row {id}: {source}")]
    Timestamp {
        id: i64,
        source: chrono::ParseError,
    },
    #[error("value out of range for column {0}")]
    OutOfRange(&'static str),
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/radar.db"
}

fn is_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create the parent directory of a file-backed SQLite URL.
pub fn ensure_parent_dir(url: &str) -> Result<(), PersistenceError> {
    if is_memory(url) {
        return Ok(());
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    if let Some(parent) = path.and_then(|p| Path::new(p).parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Open (creating if needed) the database at `url` and apply migrations.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistenceError> {
    ensure_parent_dir(url)?;
    let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = if is_memory(url) {
        // each in-memory connection is its own database; keep exactly one alive
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?
    };
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(url, "database ready");
    Ok(pool)
}

fn to_i64(v: u64, column: &'static str) -> Result<i64, PersistenceError> {
    i64::try_from(v).map_err(|_| PersistenceError::OutOfRange(column))
}

fn to_u64(v: i64, column: &'static str) -> Result<u64, PersistenceError> {
    u64::try_from(v).map_err(|_| PersistenceError::OutOfRange(column))
}

#[derive(FromRow)]
struct SimulationRow {
    id: i64,
    product: String,
    selling_price: f64,
    competitor_price: f64,
    demand_units: i64,
    unit_cost: f64,
    elasticity: f64,
    win_probability_percent: i64,
    expected_sales_units: i64,
    expected_profit: i64,
    created_at: String,
}

impl TryFrom<SimulationRow> for SimulationRecord {
    type Error = PersistenceError;

    fn try_from(row: SimulationRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|source| PersistenceError::Timestamp { id: row.id, source })?
            .with_timezone(&Utc);
        let win = u8::try_from(row.win_probability_percent)
            .map_err(|_| PersistenceError::OutOfRange("win_probability_percent"))?;
        Ok(SimulationRecord {
            id: row.id,
            product: row.product,
            input: PricingInput {
                selling_price: row.selling_price,
                competitor_price: row.competitor_price,
                demand_units: to_u64(row.demand_units, "demand_units")?,
                unit_cost: row.unit_cost,
                elasticity: row.elasticity,
            },
            result: PricingResult {
                win_probability_percent: win,
                expected_sales_units: to_u64(row.expected_sales_units, "expected_sales_units")?,
                expected_profit: row.expected_profit,
            },
            created_at,
        })
    }
}

/// Store one simulation and return its row id.
pub async fn record_simulation(
    pool: &SqlitePool,
    product: &str,
    input: &PricingInput,
    result: &PricingResult,
) -> Result<i64, PersistenceError> {
    validate_product(product)?;
    let now = Utc::now().to_rfc3339();
    let res = sqlx::query(
        "INSERT INTO simulations (product, selling_price, competitor_price, demand_units, \
         unit_cost, elasticity, win_probability_percent, expected_sales_units, expected_profit, \
         created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(product.trim())
    .bind(input.selling_price)
    .bind(input.competitor_price)
    .bind(to_i64(input.demand_units, "demand_units")?)
    .bind(input.unit_cost)
    .bind(input.elasticity)
    .bind(i64::from(result.win_probability_percent))
    .bind(to_i64(result.expected_sales_units, "expected_sales_units")?)
    .bind(result.expected_profit)
    .bind(now)
    .execute(pool)
    .await?;
    let id = res.last_insert_rowid();
    debug!(id, product, "simulation stored");
    Ok(id)
}

/// Most recent simulations, newest first.
pub async fn recent_simulations(
    pool: &SqlitePool,
    limit: u32,
) -> Result<Vec<SimulationRecord>, PersistenceError> {
    let rows: Vec<SimulationRow> =
        sqlx::query_as("SELECT * FROM simulations ORDER BY id DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(SimulationRecord::try_from).collect()
}

/// Remember that `product` was searched. Returns `true` the first time.
pub async fn record_search(pool: &SqlitePool, product: &str) -> Result<bool, PersistenceError> {
    validate_product(product)?;
    let now = Utc::now().to_rfc3339();
    insert_search(pool, product, &now).await
}

/// Shared by [`record_search`] and [`record_scan`]; `executor` is a pool or an
/// open transaction.
async fn insert_search<'c, E>(executor: E, product: &str, first_seen: &str) -> Result<bool, PersistenceError>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    let res = sqlx::query("INSERT OR IGNORE INTO search_history (product, first_seen) VALUES (?, ?)")
        .bind(product.trim())
        .bind(first_seen)
        .execute(executor)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Distinct searched products in the order they were first searched.
pub async fn search_history(pool: &SqlitePool) -> Result<Vec<String>, PersistenceError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT product FROM search_history ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

/// A completed market scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanEntry {
    pub product: String,
    pub target_price: Decimal,
    pub quotes: usize,
    pub opportunities: usize,
}

/// Store a scan and add its product to the search history, atomically.
pub async fn record_scan(pool: &SqlitePool, scan: &ScanEntry) -> Result<i64, PersistenceError> {
    validate_product(&scan.product)?;
    let now = Utc::now().to_rfc3339();
    let quotes = to_i64(scan.quotes as u64, "quotes")?;
    let opportunities = to_i64(scan.opportunities as u64, "opportunities")?;

    let mut tx = pool.begin().await?;
    insert_search(&mut *tx, &scan.product, &now).await?;
    let res = sqlx::query(
        "INSERT INTO scans (product, target_price, quotes, opportunities, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(scan.product.trim())
    .bind(scan.target_price.to_string())
    .bind(quotes)
    .bind(opportunities)
    .bind(now.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    let id = res.last_insert_rowid();
    debug!(id, product = %scan.product, "scan stored");
    Ok(id)
}

/// Counters shown on the dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub scans: u64,
    pub opportunities: u64,
    pub simulations: u64,
}

pub async fn dashboard_stats(pool: &SqlitePool) -> Result<DashboardStats, PersistenceError> {
    let (scans, opportunities, simulations): (i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM scans), \
                (SELECT COALESCE(SUM(opportunities), 0) FROM scans), \
                (SELECT COUNT(*) FROM simulations)",
    )
    .fetch_one(pool)
    .await?;
    Ok(DashboardStats {
        scans: to_u64(scans, "scans")?,
        opportunities: to_u64(opportunities, "opportunities")?,
        simulations: to_u64(simulations, "simulations")?,
    })
}
