//! Rolling-window historical percentile ranks.
//!
//! For every index `i` the engine reports how much of the trailing window
//! `[max(0, i-W+1), i]` is less than or equal to `value[i]`:
//!
//! ```text
//! percentile[i] = 100 * count(v in history[i] : v <= value[i]) / |history[i]|
//! ```
//!
//! The window expands until it holds `W` indices, then slides. NaN values
//! are dropped from the window; a NaN current value has no percentile.
//! Fewer than two historical values yield `0.0`. The current value is
//! always part of its own history, so a tie with everything gives `100.0`
//! and a new minimum gives `100 / h`, never zero.
//!
//! # Look-ahead contamination guard
//! `percentile[i]` never reads index `> i`. Truncating the input after `i`
//! must leave every output up to `i` unchanged.

pub mod naive;
pub mod order_statistic;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::domain::TimeSeries;

pub use naive::NaiveBackend;
pub use order_statistic::OrderStatisticBackend;

/// Two trading years.
pub const DEFAULT_WINDOW: usize = 504;

/// Below this many historical values the percentile is forced to 0.0.
pub const MIN_HISTORY: usize = 2;

/// Raw rank of one value inside its trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRank {
    /// Historical values `<=` the current value (including itself).
    pub at_or_below: usize,
    /// Non-NaN values in the window (including the current one).
    pub history: usize,
}

impl WindowRank {
    /// Percentile in `[0, 100]`, with the short-history rule applied.
    pub fn percentile(&self) -> f64 {
        if self.history < MIN_HISTORY {
            return 0.0;
        }
        100.0 * self.at_or_below as f64 / self.history as f64
    }
}

/// A rank-counting strategy. Both backends must agree exactly.
pub trait RankBackend: Send + Sync {
    /// Human-readable name (e.g., "naive", "order_statistic").
    fn name(&self) -> &str;

    /// One entry per input value; `None` where the value itself is NaN.
    fn window_ranks(&self, values: &[f64], window: usize) -> Vec<Option<WindowRank>>;
}

/// Backend selector (serializable for configuration files).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Recount the whole window at every step: O(n·W).
    Naive,
    /// Fenwick tree over compressed values: O(n log n).
    #[default]
    OrderStatistic,
}

impl Backend {
    fn implementation(&self) -> &'static dyn RankBackend {
        match self {
            Backend::Naive => &NaiveBackend,
            Backend::OrderStatistic => &OrderStatisticBackend,
        }
    }
}

/// Percentile of one timestamped observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileResult {
    pub timestamp: NaiveDate,
    /// `None` when the observation was missing (NaN).
    pub percentile: Option<f64>,
}

/// Computes rolling percentile ranks with a fixed window and backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentileWindowEngine {
    window: usize,
    backend: Backend,
}

impl PercentileWindowEngine {
    pub fn new(window: usize, backend: Backend) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::InvalidWindow(window));
        }
        Ok(Self { window, backend })
    }

    /// Engine with the default (order-statistic) backend.
    pub fn with_window(window: usize) -> Result<Self, ConfigError> {
        Self::new(window, Backend::default())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn window_ranks(&self, values: &[f64]) -> Vec<Option<WindowRank>> {
        self.backend
            .implementation()
            .window_ranks(values, self.window)
    }

    /// One percentile per value. Empty input gives empty output; use
    /// [`rolling_percentile`] where an empty series is an error.
    pub fn compute_values(&self, values: &[f64]) -> Vec<Option<f64>> {
        self.window_ranks(values)
            .into_iter()
            .map(|r| r.map(|r| r.percentile()))
            .collect()
    }

    pub fn compute(&self, series: &TimeSeries) -> Vec<PercentileResult> {
        let values = series.values();
        series
            .points()
            .iter()
            .zip(self.compute_values(&values))
            .map(|(p, percentile)| PercentileResult {
                timestamp: p.timestamp,
                percentile,
            })
            .collect()
    }

    /// Independent dimensions (price, amount, spread...) in parallel.
    ///
    /// Each input is read-only; output order matches input order.
    pub fn compute_many(&self, dimensions: &[&[f64]]) -> Vec<Vec<Option<f64>>> {
        dimensions
            .par_iter()
            .map(|values| self.compute_values(values))
            .collect()
    }
}

impl Default for PercentileWindowEngine {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            backend: Backend::default(),
        }
    }
}

/// Failure of the pure-function entry point.
#[derive(Debug, Error)]
pub enum PercentileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Pure-function form: `(series, window) -> percentiles`.
///
/// An empty series is rejected with [`DataError::EmptySeries`].
pub fn rolling_percentile(
    values: &[f64],
    window: usize,
) -> Result<Vec<Option<f64>>, PercentileError> {
    let engine = PercentileWindowEngine::with_window(window)?;
    if values.is_empty() {
        return Err(DataError::EmptySeries.into());
    }
    Ok(engine.compute_values(values))
}

#[cfg(test)]
pub(crate) fn assert_backends_agree(values: &[f64], window: usize) {
    let a = NaiveBackend.window_ranks(values, window);
    let b = OrderStatisticBackend.window_ranks(values, window);
    assert_eq!(a, b, "backends disagree for window {window} on {values:?}");
}
