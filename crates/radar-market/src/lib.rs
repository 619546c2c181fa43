#![deny(warnings)]

//! Market radar: competitor quotes for a product.
//!
//! Quotes come from a [`MarketPriceSource`]. The only implementation shipped
//! is [`SimulatedMarket`], which synthesizes reproducible prices from a seed
//! derived from the product key. A real feed can be plugged in behind the same
//! trait without touching the pricing model.

use radar_core::MarketQuote;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

/// Marketplaces the simulator draws from.
pub const DEFAULT_SOURCES: [&str; 7] = [
    "Alibaba",
    "IndiaMART",
    "Global Sources",
    "N11",
    "Hepsiburada",
    "Amazon TR",
    "Trendyol",
];

/// Errors produced by the market radar.
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    /// Target price must be > 0.
    #[error("target price must be > 0, got {0}")]
    InvalidTarget(Decimal),
    /// A summary needs at least one quote.
    #[error("no quotes to summarize")]
    NoQuotes,
    /// Numeric conversion failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Anything able to quote competitor prices for a product.
pub trait MarketPriceSource {
    /// Quotes for `product_key`, sorted by ascending price.
    fn quote(&self, product_key: &str, target_price: Decimal)
        -> Result<Vec<MarketQuote>, MarketError>;
}

/// 64-bit FNV-1a; stable across runs and platforms.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Seed used for all randomness tied to a product.
pub fn product_seed(product_key: &str) -> u64 {
    fnv1a(product_key.trim().as_bytes())
}

/// Seeded price simulator standing in for real marketplace scraping.
#[derive(Clone, Debug)]
pub struct SimulatedMarket {
    sources: Vec<String>,
    num_sources: usize,
}

impl SimulatedMarket {
    /// Simulator over [`DEFAULT_SOURCES`] quoting `num_sources` of them.
    pub fn new(num_sources: usize) -> Self {
        Self::with_sources(DEFAULT_SOURCES.iter().map(|s| s.to_string()), num_sources)
    }

    pub fn with_sources<I: IntoIterator<Item = String>>(sources: I, num_sources: usize) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            num_sources,
        }
    }
}

impl MarketPriceSource for SimulatedMarket {
    fn quote(
        &self,
        product_key: &str,
        target_price: Decimal,
    ) -> Result<Vec<MarketQuote>, MarketError> {
        if target_price <= Decimal::ZERO {
            return Err(MarketError::InvalidTarget(target_price));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(product_seed(product_key));
        let n = self.num_sources.min(self.sources.len());
        let picked: Vec<&String> = self.sources.choose_multiple(&mut rng, n).collect();

        let mut quotes = Vec::with_capacity(n);
        for source in picked {
            let variation: f64 = rng.gen_range(0.7..1.3);
            let factor = Decimal::from_f64(variation).ok_or(MarketError::NonFinite)?;
            let in_stock = rng.gen::<f64>() > 0.2;
            quotes.push(MarketQuote {
                source: source.clone(),
                price: (target_price * factor).round_dp(2),
                in_stock,
            });
        }
        quotes.sort_by(|a, b| a.price.cmp(&b.price));
        debug!(product = product_key, quotes = quotes.len(), "simulated quotes");
        Ok(quotes)
    }
}

/// Seeded stand-in for a counterfeit check: a score in `60..100`.
///
/// Deterministic per (product, source). No listing data is inspected.
pub fn authenticity_score(product_key: &str, source: &str) -> u8 {
    let seed = product_seed(product_key) ^ fnv1a(source.as_bytes()).rotate_left(17);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.gen_range(60..100)
}

/// One row of a scan result.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanLine {
    pub quote: MarketQuote,
    /// `target - price`; positive means the source undercuts our target.
    pub savings: Decimal,
    pub authenticity: u8,
}

impl ScanLine {
    pub fn is_opportunity(&self) -> bool {
        self.savings > Decimal::ZERO
    }
}

/// Aggregated view of one market scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanSummary {
    pub product: String,
    pub target: Decimal,
    pub best: Decimal,
    pub average: Decimal,
    pub lines: Vec<ScanLine>,
}

impl ScanSummary {
    pub fn from_quotes(
        product: &str,
        target: Decimal,
        quotes: Vec<MarketQuote>,
    ) -> Result<Self, MarketError> {
        let best = quotes
            .iter()
            .map(|q| q.price)
            .min()
            .ok_or(MarketError::NoQuotes)?;
        let total: Decimal = quotes.iter().map(|q| q.price).sum();
        let average = (total / Decimal::from(quotes.len())).round_dp(2);
        let lines = quotes
            .into_iter()
            .map(|quote| ScanLine {
                savings: target - quote.price,
                authenticity: authenticity_score(product, &quote.source),
                quote,
            })
            .collect();
        Ok(Self {
            product: product.to_string(),
            target,
            best,
            average,
            lines,
        })
    }

    /// Number of quotes priced below the target.
    pub fn opportunities(&self) -> usize {
        self.lines.iter().filter(|l| l.is_opportunity()).count()
    }
}

/// Quote `product` from `source` and summarize against `target`.
pub fn scan<S: MarketPriceSource + ?Sized>(
    source: &S,
    product: &str,
    target: Decimal,
) -> Result<ScanSummary, MarketError> {
    let quotes = source.quote(product, target)?;
    let summary = ScanSummary::from_quotes(product, target, quotes)?;
    info!(
        product,
        quotes = summary.lines.len(),
        opportunities = summary.opportunities(),
        best = %summary.best,
        "market scanned"
    );
    Ok(summary)
}
