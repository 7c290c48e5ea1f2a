//! Backtest configuration, errors and result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::benchmark::BenchmarkOutcome;
use crate::allocation::{AllocationRules, BuyTier};
use crate::config::ConfigError;
use crate::data::DataError;
use crate::domain::{PortfolioSnapshot, PortfolioState, Trade};
use crate::percentile::{Backend, DEFAULT_WINDOW};
use crate::signals::{SignalThresholds, SignalVector};

/// Everything that parameterizes one timing backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub percentile_window: usize,
    pub backend: Backend,
    pub ma_short: usize,
    pub ma_medium: usize,
    pub ma_long: usize,
    pub thresholds: SignalThresholds,
    pub allocation: AllocationRules,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            percentile_window: DEFAULT_WINDOW,
            backend: Backend::default(),
            ma_short: 20,
            ma_medium: 60,
            ma_long: 250,
            thresholds: SignalThresholds::default(),
            allocation: AllocationRules::default(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.percentile_window == 0 {
            return Err(ConfigError::InvalidWindow(self.percentile_window));
        }
        if self.ma_short == 0 || self.ma_medium == 0 || self.ma_long == 0 {
            return Err(ConfigError::Invalid {
                name: "moving average periods",
                reason: "periods must be positive".into(),
            });
        }
        if !(self.ma_short <= self.ma_medium && self.ma_medium <= self.ma_long) {
            return Err(ConfigError::Invalid {
                name: "moving average periods",
                reason: format!(
                    "expected short <= medium <= long, got {} / {} / {}",
                    self.ma_short, self.ma_medium, self.ma_long
                ),
            });
        }
        self.thresholds.validate()?;
        self.allocation.validate()
    }
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Signals and outcome of one evaluated decision point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub date: chrono::NaiveDate,
    pub price: f64,
    pub signals: SignalVector,
    pub total_signal: i32,
    pub max_signal: i32,
    pub tier: BuyTier,
    pub price_percentile: Option<f64>,
    pub volume_percentile: Option<f64>,
}

/// Complete result of a timing backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub trades: Vec<Trade>,
    /// One per input record, after that record's trades.
    pub snapshots: Vec<PortfolioSnapshot>,
    pub decisions: Vec<DecisionRecord>,
    pub final_state: PortfolioState,
    pub final_price: f64,
    pub benchmark: BenchmarkOutcome,
    /// Scheduled decision points with a defined long moving average.
    pub decision_points: usize,
    /// Decision points dropped for an invalid price.
    pub skipped_decision_points: usize,
}

impl BacktestOutcome {
    pub fn final_value(&self) -> f64 {
        self.final_state.total_value(self.final_price)
    }

    /// Return on contributed capital, in percent. Zero if nothing was invested.
    pub fn strategy_return_pct(&self) -> f64 {
        self.final_state.return_rate(self.final_price) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let c = StrategyConfig {
            percentile_window: 0,
            ..StrategyConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidWindow(0)));
    }

    #[test]
    fn unordered_moving_averages_rejected() {
        let c = StrategyConfig {
            ma_short: 3,
            ma_medium: 60,
            ma_long: 10,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Invalid {
                name: "moving average periods",
                ..
            })
        ));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let c: StrategyConfig =
            serde_json::from_str(r#"{"ma_long": 120, "allocation": {"bearish_salary": 1000.0}}"#)
                .unwrap();
        assert_eq!(c.ma_long, 120);
        assert_eq!(c.ma_short, 20);
        assert_eq!(c.allocation.bearish_salary, 1000.0);
        assert_eq!(c.allocation.strong_salary, 8000.0);
    }
}
