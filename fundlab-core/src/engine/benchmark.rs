//! Fixed dollar-cost-averaging benchmark.

use serde::{Deserialize, Serialize};

/// Invest a fixed amount at every decision point regardless of signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    pub contributions: usize,
    pub total_invested: f64,
    pub shares: f64,
    pub final_value: f64,
}

impl BenchmarkOutcome {
    /// Return on contributed capital, in percent.
    pub fn return_pct(&self) -> f64 {
        if self.total_invested <= 0.0 {
            return 0.0;
        }
        (self.final_value - self.total_invested) / self.total_invested * 100.0
    }
}

/// `prices` are the prices at the scheduled decision points; invalid
/// prices are skipped as in the strategy.
pub fn run_fixed_dca(prices: &[f64], amount: f64, final_price: f64) -> BenchmarkOutcome {
    let mut out = BenchmarkOutcome::default();
    for &price in prices {
        if !(price.is_finite() && price > 0.0) {
            continue;
        }
        out.contributions += 1;
        out.total_invested += amount;
        out.shares += amount / price;
    }
    out.final_value = out.shares * final_price;
    out
}
