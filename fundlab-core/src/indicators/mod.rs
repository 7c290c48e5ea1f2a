//! Series indicators computed once over the full input before any
//! decision is made. Index `i` of every output depends only on inputs
//! `0..=i`; the warm-up region is NaN.

pub mod pct_change;
pub mod sma;

pub use pct_change::PctChange;
pub use sma::Sma;

/// A pure, single-series indicator.
pub trait Indicator: Send + Sync {
    /// Short identifier (e.g., "sma_250").
    fn name(&self) -> &str;

    /// Number of leading outputs that are always NaN.
    fn lookback(&self) -> usize;

    /// One output per input value.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Trend-following moving averages used by the signal rules.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverages {
    pub short: Vec<f64>,
    pub medium: Vec<f64>,
    pub long: Vec<f64>,
}

impl MovingAverages {
    pub fn compute(closes: &[f64], short: usize, medium: usize, long: usize) -> Self {
        Self {
            short: Sma::new(short).compute(closes),
            medium: Sma::new(medium).compute(closes),
            long: Sma::new(long).compute(closes),
        }
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
