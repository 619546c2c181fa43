#![deny(warnings)]

//! Core value records, configuration and invariants for INDUS-RADAR.
//!
//! Every record here is a plain, serializable value created per invocation.
//! The pricing model, the market radar and the persistence layer all speak
//! in these types so that none of them depends on another's internals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Demand elasticity used when the caller does not supply one.
pub const DEFAULT_ELASTICITY: f64 = 1.5;

/// Number of candidate prices swept by the optimizer by default.
pub const DEFAULT_SAMPLES: usize = 100;

/// Inputs to a single pricing evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    /// Our quoted price per unit (> 0).
    pub selling_price: f64,
    /// The competitor's price per unit (> 0).
    pub competitor_price: f64,
    /// Addressable market demand in units.
    pub demand_units: u64,
    /// Our cost per unit. May exceed the selling price.
    pub unit_cost: f64,
    /// Exponent of the constant-elasticity demand curve (> 0).
    #[serde(default = "default_elasticity")]
    pub elasticity: f64,
}

fn default_elasticity() -> f64 {
    DEFAULT_ELASTICITY
}

impl PricingInput {
    /// Build an input with the default elasticity.
    pub fn new(selling_price: f64, competitor_price: f64, demand_units: u64, unit_cost: f64) -> Self {
        Self {
            selling_price,
            competitor_price,
            demand_units,
            unit_cost,
            elasticity: DEFAULT_ELASTICITY,
        }
    }

    pub fn with_elasticity(mut self, elasticity: f64) -> Self {
        self.elasticity = elasticity;
        self
    }

    /// Same market conditions, different selling price.
    pub fn at_price(&self, selling_price: f64) -> Self {
        Self {
            selling_price,
            ..*self
        }
    }
}

/// Outcome of evaluating one candidate price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    /// Modeled chance of winning the sale, in [0, 100].
    pub win_probability_percent: u8,
    /// Units expected to sell.
    pub expected_sales_units: u64,
    /// Expected profit in currency units; negative when selling below cost.
    pub expected_profit: i64,
}

/// Profit curve sampled over a price range and its best point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Candidate prices in ascending order.
    pub sampled_prices: Vec<f64>,
    /// Profit at each candidate price, index-aligned with `sampled_prices`.
    pub sampled_profits: Vec<i64>,
    /// First sampled price reaching the maximum profit.
    pub optimal_price: f64,
    /// Profit at `optimal_price`.
    pub optimal_profit: i64,
}

impl OptimizationResult {
    /// `(price, profit)` at the lowest and highest sampled price.
    ///
    /// Returns `None` for an empty curve.
    pub fn profit_at_endpoints(&self) -> Option<((f64, i64), (f64, i64))> {
        let first = (*self.sampled_prices.first()?, *self.sampled_profits.first()?);
        let last = (*self.sampled_prices.last()?, *self.sampled_profits.last()?);
        Some((first, last))
    }
}

/// Advice derived from comparing the current price with the optimum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "delta", rename_all = "snake_case")]
pub enum Recommendation {
    /// Current price is within the tolerance band of the optimum.
    AtOptimal,
    /// Raise the price by the given amount.
    RaisePrice(f64),
    /// Lower the price by the given amount.
    LowerPrice(f64),
}

/// A competitor price offered by one marketplace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Marketplace or vendor name.
    pub source: String,
    /// Quoted unit price, two decimal places.
    pub price: Decimal,
    /// Whether the source reports stock on hand.
    pub in_stock: bool,
}

/// A stored strategy simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: i64,
    pub product: String,
    pub input: PricingInput,
    pub result: PricingResult,
    pub created_at: DateTime<Utc>,
}

/// Application configuration, usually read from `radar.yaml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// SQLite connection URL.
    pub database_url: String,
    /// Elasticity used when a command does not pass one.
    pub default_elasticity: f64,
    /// Number of prices swept by the optimizer.
    pub optimizer_samples: usize,
    /// Number of marketplaces queried per scan.
    pub market_sources: usize,
    /// Currency label used in output.
    pub currency: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./saves/radar.db".to_string(),
            default_elasticity: DEFAULT_ELASTICITY,
            optimizer_samples: DEFAULT_SAMPLES,
            market_sources: 6,
            currency: "TL".to_string(),
        }
    }
}

/// Validation errors for records and configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Elasticity must be strictly positive.
    #[error("elasticity must be > 0, got {0}")]
    NonPositiveElasticity(f64),
    /// The optimizer needs at least one sample.
    #[error("optimizer_samples must be >= 1")]
    NoSamples,
    /// A scan needs at least one marketplace.
    #[error("market_sources must be >= 1")]
    NoSources,
    /// Required text field is blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Validate a configuration.
pub fn validate_config(cfg: &RadarConfig) -> Result<(), ValidationError> {
    if cfg.database_url.trim().is_empty() {
        return Err(ValidationError::Empty("database_url"));
    }
    if cfg.currency.trim().is_empty() {
        return Err(ValidationError::Empty("currency"));
    }
    if !cfg.default_elasticity.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if cfg.default_elasticity <= 0.0 {
        return Err(ValidationError::NonPositiveElasticity(cfg.default_elasticity));
    }
    if cfg.optimizer_samples == 0 {
        return Err(ValidationError::NoSamples);
    }
    if cfg.market_sources == 0 {
        return Err(ValidationError::NoSources);
    }
    Ok(())
}

/// Validate a product name used as a scan or simulation key.
pub fn validate_product(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty("product"));
    }
    Ok(())
}

/// Parse and validate a YAML configuration document.
pub fn parse_config(text: &str) -> Result<RadarConfig, ConfigError> {
    let cfg: RadarConfig = serde_yaml::from_str(text)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RadarConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(RadarConfig::default());
    }
    let text = fs::read_to_string(path)?;
    let cfg = parse_config(&text)?;
    info!(path = %path.display(), "loaded config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RadarConfig::default();
        validate_config(&cfg).unwrap();
        assert_eq!(cfg.optimizer_samples, DEFAULT_SAMPLES);
        assert_eq!(cfg.default_elasticity, DEFAULT_ELASTICITY);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = parse_config("currency: USD\nmarket_sources: 3\n").unwrap();
        assert_eq!(cfg.currency, "USD");
        assert_eq!(cfg.market_sources, 3);
        assert_eq!(cfg.optimizer_samples, DEFAULT_SAMPLES);
    }

    #[test]
    fn yaml_with_bad_values_is_rejected() {
        let err = parse_config("default_elasticity: 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::NonPositiveElasticity(_))
        ));
        assert!(matches!(
            parse_config("optimizer_samples: 0\n").unwrap_err(),
            ConfigError::Invalid(ValidationError::NoSamples)
        ));
        assert!(matches!(
            parse_config("optimizer_samples: [1, 2]\n").unwrap_err(),
            ConfigError::Yaml(_)
        ));
    }

    #[test]
    fn example_config_matches_defaults() {
        let cfg = parse_config(include_str!("../../../radar.yaml.example")).unwrap();
        assert_eq!(cfg, RadarConfig::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_config("./does/not/exist/radar.yaml").unwrap();
        assert_eq!(cfg, RadarConfig::default());
    }

    #[test]
    fn blank_product_rejected() {
        assert_eq!(validate_product("  "), Err(ValidationError::Empty("product")));
        assert!(validate_product("SKF 6309 2RS C3").is_ok());
    }

    #[test]
    fn input_defaults_elasticity_when_missing() {
        let json = r#"{"selling_price":200.0,"competitor_price":200.0,"demand_units":1000,"unit_cost":140.0}"#;
        let input: PricingInput = serde_json::from_str(json).unwrap();
        assert_eq!(input, PricingInput::new(200.0, 200.0, 1000, 140.0));
    }

    #[test]
    fn endpoints_of_profit_curve() {
        let opt = OptimizationResult {
            sampled_prices: vec![140.0, 220.0, 300.0],
            sampled_profits: vec![0, 41_000, 3_900],
            optimal_price: 220.0,
            optimal_profit: 41_000,
        };
        assert_eq!(opt.profit_at_endpoints(), Some(((140.0, 0), (300.0, 3_900))));
        let empty = OptimizationResult {
            sampled_prices: vec![],
            sampled_profits: vec![],
            optimal_price: 0.0,
            optimal_profit: 0,
        };
        assert_eq!(empty.profit_at_endpoints(), None);
    }

    #[test]
    fn recommendation_serializes_with_tag() {
        let s = serde_json::to_string(&Recommendation::RaisePrice(5.0)).unwrap();
        assert_eq!(s, r#"{"action":"raise_price","delta":5.0}"#);
        let back: Recommendation = serde_json::from_str(&s).unwrap();
        assert_eq!(back, Recommendation::RaisePrice(5.0));
    }

    proptest! {
        #[test]
        fn at_price_only_changes_price(p in 1.0f64..10_000.0, q in 1.0f64..10_000.0) {
            let base = PricingInput::new(p, 200.0, 1000, 140.0).with_elasticity(2.0);
            let moved = base.at_price(q);
            prop_assert_eq!(moved.selling_price, q);
            prop_assert_eq!(moved.competitor_price, base.competitor_price);
            prop_assert_eq!(moved.elasticity, 2.0);
        }
    }
}
