#![deny(warnings)]

//! Pricing and strategy model for INDUS-RADAR.
//!
//! This module provides validated, stateless utilities for:
//! - Win probability, expected sales and profit of a candidate price
//! - Grid search for the profit-maximizing price over a bounded range
//! - Turning the gap between current and optimal price into advice

use radar_core::{OptimizationResult, PricingInput, PricingResult, Recommendation};
use thiserror::Error;
use tracing::debug;

pub use radar_core::{DEFAULT_ELASTICITY, DEFAULT_SAMPLES};

/// Prices within this many currency units of the optimum count as optimal.
pub const OPTIMAL_TOLERANCE: f64 = 5.0;

/// At or below this price ratio the win probability saturates high.
const CHEAP_RATIO: f64 = 0.7;
/// At or above this price ratio the win probability saturates low.
const EXPENSIVE_RATIO: f64 = 1.3;
/// Margins thinner than this are penalized.
const THIN_MARGIN: f64 = 0.1;
const THIN_MARGIN_PENALTY: f64 = 0.8;
/// Upper end of the optimizer range, as a multiple of the competitor price.
const MAX_PRICE_FACTOR: f64 = 1.5;

/// Errors produced by the pricing model.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// A price, elasticity or range bound is outside its domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

fn require_positive(name: &str, value: f64) -> Result<(), EconError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EconError::InvalidArgument(format!(
            "{name} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

fn validate_input(input: &PricingInput) -> Result<(), EconError> {
    require_positive("selling price", input.selling_price)?;
    require_positive("competitor price", input.competitor_price)?;
    require_positive("elasticity", input.elasticity)?;
    if !input.unit_cost.is_finite() {
        return Err(EconError::InvalidArgument(format!(
            "unit cost must be finite, got {}",
            input.unit_cost
        )));
    }
    Ok(())
}

/// Base win probability (0..=100) for our price relative to the competitor.
///
/// Piecewise: 95 when we are at least 30% cheaper, 5 when at least 30% more
/// expensive, and a tanh S-curve centered on parity in between. The curve
/// does not meet the flat regimes exactly at 0.7 and 1.3; that step is kept.
pub fn base_win_probability(price_ratio: f64) -> f64 {
    if price_ratio <= CHEAP_RATIO {
        95.0
    } else if price_ratio >= EXPENSIVE_RATIO {
        5.0
    } else {
        let x = (price_ratio - 1.0) * 10.0;
        50.0 * (1.0 - x.tanh())
    }
}

/// Fraction of the selling price left after unit cost, as a percentage.
///
/// Example:
/// let m = margin_percent(200.0, 140.0).unwrap();
/// assert!((m - 30.0).abs() < 1e-9);
pub fn margin_percent(selling_price: f64, unit_cost: f64) -> Result<f64, EconError> {
    require_positive("selling price", selling_price)?;
    Ok((selling_price - unit_cost) / selling_price * 100.0)
}

/// Evaluate a candidate price against a competitor.
///
/// Computes win probability, expected sales under a constant-elasticity
/// demand response `(competitor / price)^elasticity`, and expected profit.
/// A unit cost above the selling price is valid and yields a negative profit.
///
/// Example:
/// let r = evaluate(&PricingInput::new(200.0, 200.0, 1000, 140.0)).unwrap();
/// assert_eq!(r.expected_profit, 30_000);
pub fn evaluate(input: &PricingInput) -> Result<PricingResult, EconError> {
    validate_input(input)?;
    let price = input.selling_price;
    let ratio = price / input.competitor_price;

    let mut prob = base_win_probability(ratio);
    let margin_ratio = (price - input.unit_cost) / price;
    if margin_ratio < THIN_MARGIN {
        prob *= THIN_MARGIN_PENALTY;
    }
    let prob = prob.clamp(0.0, 100.0);

    let multiplier = (input.competitor_price / price).powf(input.elasticity);
    let sales = (input.demand_units as f64) * (prob / 100.0) * multiplier;
    // saturating float-to-int casts; sales is never negative here
    let expected_sales_units = sales.floor() as u64;
    let expected_profit = ((expected_sales_units as f64) * (price - input.unit_cost)) as i64;

    debug!(
        price,
        ratio, prob, multiplier, expected_sales_units, expected_profit, "evaluated price"
    );
    Ok(PricingResult {
        win_probability_percent: prob as u8,
        expected_sales_units,
        expected_profit,
    })
}

/// `count` evenly spaced values from `start` to `end`, both inclusive.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (end - start) / (count - 1) as f64;
    let mut out: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    if let Some(last) = out.last_mut() {
        *last = end;
    }
    out
}

/// Sweep `samples` prices over `[unit_cost, competitor_price * 1.5]` and pick
/// the most profitable one.
///
/// The profit curve is not unimodal across the piecewise probability regimes,
/// so this is a plain grid search. Ties go to the lowest price.
///
/// Example:
/// let opt = find_optimal_price(200.0, 140.0, 1000, 1.5, DEFAULT_SAMPLES).unwrap();
/// assert_eq!(opt.sampled_prices.len(), 100);
pub fn find_optimal_price(
    competitor_price: f64,
    unit_cost: f64,
    demand_units: u64,
    elasticity: f64,
    samples: usize,
) -> Result<OptimizationResult, EconError> {
    require_positive("competitor price", competitor_price)?;
    require_positive("elasticity", elasticity)?;
    require_positive("unit cost (lower bound of the price range)", unit_cost)?;
    if samples == 0 {
        return Err(EconError::InvalidArgument(
            "sample count must be at least 1".to_string(),
        ));
    }
    let upper = competitor_price * MAX_PRICE_FACTOR;
    if upper <= unit_cost {
        return Err(EconError::InvalidArgument(format!(
            "empty price range [{unit_cost}, {upper}]"
        )));
    }

    let base = PricingInput {
        selling_price: unit_cost,
        competitor_price,
        demand_units,
        unit_cost,
        elasticity,
    };
    let sampled_prices = linspace(unit_cost, upper, samples);
    let sampled_profits = sampled_prices
        .iter()
        .map(|&p| evaluate(&base.at_price(p)).map(|r| r.expected_profit))
        .collect::<Result<Vec<_>, _>>()?;

    let mut best = 0;
    for (i, &profit) in sampled_profits.iter().enumerate().skip(1) {
        if profit > sampled_profits[best] {
            best = i;
        }
    }
    debug!(
        samples,
        optimal_price = sampled_prices[best],
        optimal_profit = sampled_profits[best],
        "profit curve searched"
    );
    Ok(OptimizationResult {
        optimal_price: sampled_prices[best],
        optimal_profit: sampled_profits[best],
        sampled_prices,
        sampled_profits,
    })
}

/// Classify the current price relative to the optimum.
///
/// The tolerance band is an absolute amount of currency, not a percentage.
pub fn classify(current_price: f64, optimal_price: f64) -> Recommendation {
    if (current_price - optimal_price).abs() < OPTIMAL_TOLERANCE {
        Recommendation::AtOptimal
    } else if current_price < optimal_price {
        Recommendation::RaisePrice(optimal_price - current_price)
    } else {
        Recommendation::LowerPrice(current_price - optimal_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(price: f64) -> PricingInput {
        PricingInput::new(price, 200.0, 1000, 140.0)
    }

    #[test]
    fn parity_price_example() {
        let r = evaluate(&input(200.0)).unwrap();
        assert_eq!(
            r,
            PricingResult {
                win_probability_percent: 50,
                expected_sales_units: 500,
                expected_profit: 30_000,
            }
        );
        assert_eq!(base_win_probability(1.0), 50.0);
    }

    #[test]
    fn cheap_boundary_uses_flat_regime() {
        assert_eq!(base_win_probability(140.0 / 200.0), 95.0);
        assert_eq!(base_win_probability(260.0 / 200.0), 5.0);
        // 140 sells at cost: zero margin triggers the penalty
        let r = evaluate(&input(140.0)).unwrap();
        assert_eq!(r.win_probability_percent, 76);
        assert_eq!(r.expected_profit, 0);
    }

    #[test]
    fn regimes_are_not_continuous() {
        // the S-curve overshoots the flat 95 just inside the cheap threshold
        let inside = base_win_probability(0.7001);
        assert!(inside > 95.0);
        assert!((inside - 50.0 * (1.0 - (-2.999f64).tanh())).abs() < 1e-9);
        // and undershoots the flat 5 just inside the expensive threshold
        assert!(base_win_probability(1.2999) < 5.0);
    }

    #[test]
    fn thin_margin_penalty() {
        // margin 5% < 10%
        let thin = evaluate(&PricingInput::new(200.0, 200.0, 1000, 190.0)).unwrap();
        assert_eq!(thin.win_probability_percent, 40);
        assert_eq!(thin.expected_sales_units, 400);
        assert_eq!(thin.expected_profit, 4_000);
    }

    #[test]
    fn margin_of_exactly_ten_percent_is_not_penalized() {
        let r = evaluate(&PricingInput::new(200.0, 200.0, 1000, 180.0)).unwrap();
        assert_eq!(r.win_probability_percent, 50);
        assert_eq!(r.expected_sales_units, 500);
        assert_eq!(r.expected_profit, 10_000);
    }

    #[test]
    fn cost_above_price_gives_negative_profit() {
        let r = evaluate(&PricingInput::new(100.0, 200.0, 1000, 150.0)).unwrap();
        assert!(r.expected_profit < 0);
        assert_eq!(r.win_probability_percent, 76);
    }

    #[test]
    fn invalid_arguments() {
        assert!(matches!(evaluate(&input(0.0)), Err(EconError::InvalidArgument(_))));
        assert!(evaluate(&input(-1.0)).is_err());
        assert!(evaluate(&PricingInput::new(200.0, 0.0, 1000, 140.0)).is_err());
        assert!(evaluate(&input(200.0).with_elasticity(0.0)).is_err());
        assert!(evaluate(&input(200.0).with_elasticity(f64::NAN)).is_err());
        assert!(evaluate(&PricingInput::new(200.0, 200.0, 1000, f64::INFINITY)).is_err());
        assert!(margin_percent(0.0, 10.0).is_err());
    }

    #[test]
    fn zero_demand_sells_nothing() {
        let r = evaluate(&PricingInput::new(200.0, 200.0, 0, 140.0)).unwrap();
        assert_eq!(r.expected_sales_units, 0);
        assert_eq!(r.expected_profit, 0);
    }

    #[test]
    fn margin_percent_basic() {
        let m = margin_percent(200.0, 140.0).unwrap();
        assert!((m - 30.0).abs() < 1e-9);
    }

    #[test]
    fn optimizer_reference_case() {
        let opt = find_optimal_price(200.0, 140.0, 1000, 1.5, DEFAULT_SAMPLES).unwrap();
        assert_eq!(opt.sampled_prices.len(), 100);
        assert_eq!(opt.sampled_profits.len(), 100);
        let ((low, first), (high, last)) = opt.profit_at_endpoints().unwrap();
        assert_eq!(low, 140.0);
        assert_eq!(high, 300.0);
        assert!(opt.optimal_profit >= first);
        assert!(opt.optimal_profit >= last);
        assert_eq!(opt.optimal_profit, *opt.sampled_profits.iter().max().unwrap());
        // the optimum sits between cost and the expensive regime
        assert!(opt.optimal_price > 140.0 && opt.optimal_price < 260.0);
    }

    #[test]
    fn optimizer_matches_independent_evaluation() {
        let opt = find_optimal_price(200.0, 140.0, 1000, 1.5, 25).unwrap();
        for (p, profit) in opt.sampled_prices.iter().zip(&opt.sampled_profits) {
            let r = evaluate(&PricingInput::new(*p, 200.0, 1000, 140.0)).unwrap();
            assert_eq!(r.expected_profit, *profit);
        }
    }

    #[test]
    fn optimizer_ties_pick_lowest_price() {
        // zero demand makes every profit 0
        let opt = find_optimal_price(200.0, 140.0, 0, 1.5, 10).unwrap();
        assert_eq!(opt.optimal_profit, 0);
        assert_eq!(opt.optimal_price, 140.0);
    }

    #[test]
    fn optimizer_single_sample() {
        let opt = find_optimal_price(200.0, 140.0, 1000, 1.5, 1).unwrap();
        assert_eq!(opt.sampled_prices, vec![140.0]);
        assert_eq!(opt.optimal_price, 140.0);
    }

    #[test]
    fn optimizer_rejects_bad_ranges() {
        assert!(find_optimal_price(100.0, 150.0, 1000, 1.5, 100).is_err());
        assert!(find_optimal_price(100.0, 200.0, 1000, 1.5, 100).is_err());
        assert!(find_optimal_price(200.0, 140.0, 1000, 1.5, 0).is_err());
        assert!(find_optimal_price(200.0, 0.0, 1000, 1.5, 100).is_err());
        assert!(find_optimal_price(200.0, 140.0, 1000, -1.0, 100).is_err());
    }

    #[test]
    fn classify_tolerance_band() {
        assert_eq!(classify(200.0, 200.0), Recommendation::AtOptimal);
        assert_eq!(classify(196.0, 200.0), Recommendation::AtOptimal);
        assert_eq!(classify(204.5, 200.0), Recommendation::AtOptimal);
        // exactly 5 away is outside the band
        assert_eq!(classify(195.0, 200.0), Recommendation::RaisePrice(5.0));
        assert_eq!(classify(205.0, 200.0), Recommendation::LowerPrice(5.0));
        assert_eq!(classify(150.0, 200.0), Recommendation::RaisePrice(50.0));
    }

    proptest! {
        #[test]
        fn probability_in_bounds(price in 0.01f64..5_000.0,
                                 comp in 0.01f64..5_000.0,
                                 cost in -1_000.0f64..5_000.0,
                                 demand in 0u64..100_000,
                                 e in 0.1f64..4.0) {
            let i = PricingInput::new(price, comp, demand, cost).with_elasticity(e);
            let r = evaluate(&i).unwrap();
            prop_assert!(r.win_probability_percent <= 100);
            prop_assert_eq!(evaluate(&i).unwrap(), r);
        }

        #[test]
        fn sales_non_increasing_above_parity(comp in 10.0f64..1_000.0,
                                             a in 0.0f64..1.0,
                                             b in 0.0f64..1.0,
                                             expensive in any::<bool>(),
                                             e in 0.1f64..3.0) {
            // stay inside one regime; the step at 1.3 raises the flat 5 above the curve
            let (from, to) = if expensive { (1.31, 3.0) } else { (1.0, 1.29) };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let price = |t: f64| comp * (from + (to - from) * t);
            let cost = comp * 0.5;
            let ql = evaluate(&PricingInput::new(price(lo), comp, 5_000, cost).with_elasticity(e)).unwrap();
            let qh = evaluate(&PricingInput::new(price(hi), comp, 5_000, cost).with_elasticity(e)).unwrap();
            prop_assert!(qh.expected_sales_units <= ql.expected_sales_units);
        }

        #[test]
        fn optimum_is_first_argmax(comp in 50.0f64..1_000.0,
                                   cost_frac in 0.1f64..1.4,
                                   demand in 100u64..5_000,
                                   e in 0.5f64..3.0,
                                   samples in 1usize..200) {
            let opt = find_optimal_price(comp, comp * cost_frac, demand, e, samples).unwrap();
            prop_assert_eq!(opt.sampled_prices.len(), samples);
            prop_assert_eq!(opt.sampled_profits.len(), samples);
            let max = *opt.sampled_profits.iter().max().unwrap();
            prop_assert_eq!(opt.optimal_profit, max);
            let idx = opt.sampled_profits.iter().position(|&p| p == max).unwrap();
            prop_assert_eq!(opt.optimal_price, opt.sampled_prices[idx]);
            prop_assert!(opt.sampled_prices.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
