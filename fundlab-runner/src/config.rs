//! Serializable backtest configuration.
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! [backtest]
//! symbol = "000300"
//! start_date = "2015-01-01"
//! end_date = "2024-12-31"
//!
//! [data]
//! csv_dir = "data/csv"
//! cache_dir = "data/cache"
//! macro_csv = "data/macro.csv"   # optional
//!
//! [strategy]
//! percentile_window = 504
//!
//! [strategy.allocation]
//! bearish_salary = 2000.0
//! ```
//!
//! Every `[strategy]` block falls back to its defaults field by field.

use chrono::NaiveDate;
use fundlab_core::engine::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] fundlab_core::config::ConfigError),

    #[error("start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// What to backtest and over which period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
}

/// Where input data lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory of `{SYMBOL}.csv` files read by the CSV provider.
    pub csv_dir: PathBuf,
    /// JSON cache directory.
    pub cache_dir: PathBuf,
    /// Optional macro indicator file; enables the macro signal dimension.
    pub macro_csv: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("data/csv"),
            cache_dir: PathBuf::from("data/cache"),
            macro_csv: None,
        }
    }
}

/// Full configuration of a single timing backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl BacktestConfig {
    /// Default strategy and data locations for `symbol` over a date range.
    pub fn new(symbol: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                start_date,
                end_date,
            },
            data: DataSection::default(),
            strategy: StrategyConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigError::DateRange {
                start: self.backtest.start_date,
                end: self.backtest.end_date,
            });
        }
        self.strategy.validate()?;
        Ok(())
    }

    /// Deterministic hash of the whole configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlab_core::percentile::Backend;

    const SAMPLE: &str = r#"
[backtest]
symbol = "000300"
start_date = "2015-01-01"
end_date = "2024-12-31"

[data]
csv_dir = "fixtures"

[strategy]
percentile_window = 252
backend = "naive"

[strategy.allocation]
bearish_salary = 1000.0
"#;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = BacktestConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.backtest.symbol, "000300");
        assert_eq!(config.data.csv_dir, PathBuf::from("fixtures"));
        assert_eq!(config.data.cache_dir, PathBuf::from("data/cache"));
        assert!(config.data.macro_csv.is_none());
        assert_eq!(config.strategy.percentile_window, 252);
        assert_eq!(config.strategy.backend, Backend::Naive);
        assert_eq!(config.strategy.ma_long, 250);
        assert_eq!(config.strategy.allocation.bearish_salary, 1000.0);
        assert_eq!(config.strategy.allocation.strong_salary, 8000.0);
        assert_eq!(config.strategy.thresholds.valuation_buy_below, 30.0);
    }

    #[test]
    fn toml_round_trip() {
        let config = BacktestConfig::from_toml(SAMPLE).unwrap();
        let text = toml::to_string(&config).unwrap();
        let back = BacktestConfig::from_toml(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn reversed_dates_rejected() {
        let text = SAMPLE.replace("2015-01-01", "2030-01-01");
        let err = BacktestConfig::from_toml(&text).unwrap_err();
        assert!(matches!(err, ConfigError::DateRange { .. }));
    }

    #[test]
    fn invalid_strategy_rejected() {
        let text = SAMPLE.replace("percentile_window = 252", "percentile_window = 0");
        let err = BacktestConfig::from_toml(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Strategy(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let config = BacktestConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.run_id().unwrap(), config.run_id().unwrap());

        let mut other = config.clone();
        other.strategy.allocation.strong_salary = 9000.0;
        assert_ne!(config.run_id().unwrap(), other.run_id().unwrap());
    }
}
