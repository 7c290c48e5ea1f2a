//! Runner: wires data loading, the core analyses, and metrics together.
//!
//! Entry points:
//! - `run_single_backtest()`: loads records (and macro data if configured),
//!   then runs the timing backtest. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data, no I/O.
//! - `run_drawdown()` / `run_stock_bond()`: load and analyse one or two series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use fundlab_core::data::{DataError, DataKind, DataProvider, DataSource, JsonCache};
use fundlab_core::domain::{MarketRecord, TimeSeries};
use fundlab_core::drawdown::{analyze_drawdown, DrawdownReport};
use fundlab_core::engine::{
    run_timing_backtest_with_macro, BacktestError, BacktestOutcome, StrategyConfig,
};
use fundlab_core::percentile::PercentileWindowEngine;
use fundlab_core::signals::MacroObservation;
use fundlab_core::stock_bond::{analyze_stock_bond, RatioPoint, RATIO_LOOKBACK};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_macro_csv, load_records, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid parameters: {0}")]
    Parameters(#[from] fundlab_core::config::ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single timing backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    /// First and last record actually loaded.
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub record_count: usize,
    pub config: StrategyConfig,
    pub dataset_hash: String,
    pub source: DataSource,
    pub has_synthetic: bool,
    /// Whether the macro dimension took part.
    pub macro_enabled: bool,
    pub metrics: PerformanceMetrics,
    pub outcome: BacktestOutcome,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Which column of a daily record to analyse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesField {
    #[default]
    Close,
    Amount,
    Volume,
}

/// Extract one column of `records` as a validated series.
pub fn field_series(records: &[MarketRecord], field: SeriesField) -> Result<TimeSeries, DataError> {
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let values: Vec<f64> = records
        .iter()
        .map(|r| match field {
            SeriesField::Close => r.close,
            SeriesField::Amount => r.amount,
            SeriesField::Volume => r.volume,
        })
        .collect();
    TimeSeries::from_parts(&dates, &values)
}

/// Load data per `config` and run the timing backtest.
pub fn run_single_backtest(
    config: &BacktestConfig,
    cache: &JsonCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_records(
        &config.backtest.symbol,
        DataKind::Market,
        cache,
        provider,
        opts,
    )?;
    let macro_observations = match &config.data.macro_csv {
        Some(path) => load_macro_csv(path)?,
        None => Vec::new(),
    };
    run_backtest_from_data(config, &loaded, &macro_observations)
}

/// Run a backtest with pre-loaded data. No I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
    macro_observations: &[MacroObservation],
) -> Result<BacktestResult, RunError> {
    let outcome =
        run_timing_backtest_with_macro(&loaded.records, macro_observations, &config.strategy)?;
    let metrics = PerformanceMetrics::compute(&outcome);
    let (first_date, last_date) = match (loaded.records.first(), loaded.records.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(DataError::EmptySeries.into()),
    };

    info!(
        symbol = %loaded.symbol,
        strategy_return_pct = metrics.strategy_return_pct,
        benchmark_return_pct = metrics.benchmark_return_pct,
        excess_return_pct = metrics.excess_return_pct,
        synthetic = loaded.has_synthetic,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        symbol: loaded.symbol.clone(),
        first_date,
        last_date,
        record_count: loaded.records.len(),
        config: config.strategy.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        source: loaded.source,
        has_synthetic: loaded.has_synthetic,
        macro_enabled: !macro_observations.is_empty(),
        metrics,
        outcome,
    })
}

/// Drawdown analysis of a fund's net asset value (the `close` column).
pub fn run_drawdown(
    symbol: &str,
    cache: &JsonCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
    recent_days: Option<usize>,
) -> Result<DrawdownReport, RunError> {
    let loaded = load_records(symbol, DataKind::FundNav, cache, provider, opts)?;
    let series = field_series(&loaded.records, SeriesField::Close)?;
    let report = analyze_drawdown(&series, recent_days)?;
    info!(
        symbol,
        current_depth = report.current_depth,
        depth_percentile = report.depth_percentile,
        suggestion = report.suggestion.label(),
        "drawdown analysed"
    );
    Ok(report)
}

/// Stock/bond ratio history. `pe_symbol` supplies the index PE and
/// `yield_symbol` the 10y bond yield, both in the `close` column.
pub fn run_stock_bond(
    pe_symbol: &str,
    yield_symbol: &str,
    cache: &JsonCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
    window: Option<usize>,
) -> Result<Vec<RatioPoint>, RunError> {
    let pe = load_records(pe_symbol, DataKind::Macro, cache, provider, opts)?;
    let bond_yield = load_records(yield_symbol, DataKind::Macro, cache, provider, opts)?;
    let engine = PercentileWindowEngine::with_window(window.unwrap_or(RATIO_LOOKBACK))?;
    let points = analyze_stock_bond(
        &field_series(&pe.records, SeriesField::Close)?,
        &field_series(&bond_yield.records, SeriesField::Close)?,
        &engine,
    )?;
    info!(pe_symbol, yield_symbol, points = points.len(), "stock/bond ratio computed");
    Ok(points)
}
