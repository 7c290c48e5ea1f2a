//! FundLab Runner: configuration, data loading, orchestration, metrics.
//!
//! This crate builds on `fundlab-core` to provide:
//! - TOML backtest configuration with content-addressed run ids
//! - Data loading with cache/provider/synthetic fallback
//! - Single-backtest runner plus drawdown and stock/bond entry points
//! - Strategy-versus-benchmark metrics
//! - Artifact export (JSON result, trade and portfolio CSVs)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_macro_csv, load_records, LoadError, LoadOptions, LoadedData};
pub use export::save_artifacts;
pub use metrics::PerformanceMetrics;
pub use runner::{
    field_series, run_backtest_from_data, run_drawdown, run_single_backtest, run_stock_bond,
    BacktestResult, RunError, SeriesField,
};
