//! Plain-text strategy report.
//!
//! The report is built only from the model's outputs; it can be printed,
//! written to a file, or serialized as JSON.

use chrono::{DateTime, Utc};
use radar_core::{OptimizationResult, PricingInput, PricingResult, Recommendation};
use serde::Serialize;
use std::fmt;

/// Every tenth sample of the profit curve goes into the text table.
const CURVE_STRIDE: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub price: f64,
    pub profit: i64,
}

/// Everything a strategy report shows.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub product: String,
    pub currency: String,
    pub input: PricingInput,
    pub result: PricingResult,
    pub margin_percent: f64,
    pub optimal_price: f64,
    pub optimal_profit: i64,
    pub recommendation: Recommendation,
    pub profit_curve: Vec<CurvePoint>,
    /// Lowest and highest swept price with their profits.
    pub range_ends: Option<(CurvePoint, CurvePoint)>,
    pub generated_at: DateTime<Utc>,
}

impl SimulationReport {
    pub fn new(
        product: &str,
        currency: &str,
        input: PricingInput,
        result: PricingResult,
        margin_percent: f64,
        optimization: OptimizationResult,
        recommendation: Recommendation,
    ) -> Self {
        let range_ends = optimization.profit_at_endpoints().map(|(low, high)| {
            (
                CurvePoint { price: low.0, profit: low.1 },
                CurvePoint { price: high.0, profit: high.1 },
            )
        });
        let profit_curve = optimization
            .sampled_prices
            .iter()
            .zip(&optimization.sampled_profits)
            .map(|(&price, &profit)| CurvePoint { price, profit })
            .collect();
        Self {
            product: product.trim().to_string(),
            currency: currency.to_string(),
            input,
            result,
            margin_percent,
            optimal_price: optimization.optimal_price,
            optimal_profit: optimization.optimal_profit,
            recommendation,
            profit_curve,
            range_ends,
            generated_at: Utc::now(),
        }
    }
}

/// `1234567` -> `1,234,567`. Accepts any integer that widens to `i128`.
pub fn group_thousands<T: Into<i128>>(value: T) -> String {
    let value: i128 = value.into();
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-readable advice for a recommendation.
pub fn advice(rec: &Recommendation, optimal_price: f64, currency: &str) -> String {
    match rec {
        Recommendation::AtOptimal => {
            format!("EXCELLENT! Optimal price: {optimal_price:.2} {currency}")
        }
        Recommendation::RaisePrice(d) => {
            format!("TIP: Increase price by {d:.2} {currency} for optimal profit")
        }
        Recommendation::LowerPrice(d) => {
            format!("Consider decreasing price by {d:.2} {currency}")
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cur = &self.currency;
        writeln!(f, "INDUS-RADAR Strategy Report")?;
        writeln!(f, "Product:      {}", self.product)?;
        writeln!(f, "Generated:    {}", self.generated_at.format("%Y-%m-%d %H:%M UTC"))?;
        writeln!(f)?;
        writeln!(f, "Market conditions")?;
        writeln!(f, "  Demand:           {} units", group_thousands(self.input.demand_units))?;
        writeln!(f, "  Competitor price: {:.2} {cur}", self.input.competitor_price)?;
        writeln!(f, "  Unit cost:        {:.2} {cur}", self.input.unit_cost)?;
        writeln!(f, "  Elasticity:       {:.2}", self.input.elasticity)?;
        writeln!(f)?;
        writeln!(f, "Your price: {:.2} {cur}", self.input.selling_price)?;
        writeln!(f, "  Win probability:  {}%", self.result.win_probability_percent)?;
        writeln!(f, "  Expected sales:   {}", group_thousands(self.result.expected_sales_units))?;
        writeln!(f, "  Margin:           {:.1}%", self.margin_percent)?;
        writeln!(f, "  Expected profit:  {} {cur}", group_thousands(self.result.expected_profit))?;
        writeln!(f)?;
        writeln!(f, "Profit curve")?;
        let last = self.profit_curve.len().saturating_sub(1);
        for (i, point) in self.profit_curve.iter().enumerate() {
            if i % CURVE_STRIDE == 0 || i == last {
                writeln!(f, "  {:>10.2}  {:>14}", point.price, group_thousands(point.profit))?;
            }
        }
        if let Some((low, high)) = &self.range_ends {
            writeln!(
                f,
                "Range: {:.2} {cur} (profit {}) to {:.2} {cur} (profit {})",
                low.price,
                group_thousands(low.profit),
                high.price,
                group_thousands(high.profit)
            )?;
        }
        writeln!(
            f,
            "Optimal price: {:.2} {cur} (profit {} {cur})",
            self.optimal_price,
            group_thousands(self.optimal_profit)
        )?;
        writeln!(f)?;
        writeln!(f, "Recommendation: {}", advice(&self.recommendation, self.optimal_price, cur))
    }
}
