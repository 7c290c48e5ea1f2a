//! Performance metrics: strategy versus the fixed-contribution benchmark.
//!
//! Every metric is a pure function of a backtest outcome, its snapshots or
//! its trades.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use fundlab_core::domain::{FundSource, PortfolioSnapshot, Trade, TradeKind};
use fundlab_core::engine::BacktestOutcome;

/// Aggregate metrics for a single timing backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Return on contributed capital, in percent.
    pub strategy_return_pct: f64,
    pub benchmark_return_pct: f64,
    /// Strategy minus benchmark, in percentage points.
    pub excess_return_pct: f64,
    pub total_invested: f64,
    pub final_value: f64,
    pub final_profit_pool: f64,
    pub benchmark_invested: f64,
    pub benchmark_final_value: f64,
    pub trade_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    /// Buys funded at least partly from the profit pool.
    pub pool_funded_buys: usize,
    pub take_profit_amount: f64,
    /// Largest peak-to-trough decline of total portfolio value, as a
    /// negative fraction. Contributions count as gains.
    pub max_drawdown: f64,
    /// Number of buys per composite signal score.
    pub signal_distribution: BTreeMap<i32, usize>,
}

impl PerformanceMetrics {
    pub fn compute(outcome: &BacktestOutcome) -> Self {
        let strategy_return_pct = outcome.strategy_return_pct();
        let benchmark_return_pct = outcome.benchmark.return_pct();
        let values = value_curve(&outcome.snapshots);
        Self {
            strategy_return_pct,
            benchmark_return_pct,
            excess_return_pct: strategy_return_pct - benchmark_return_pct,
            total_invested: outcome.final_state.cash_invested_cumulative(),
            final_value: outcome.final_value(),
            final_profit_pool: outcome.final_state.profit_pool(),
            benchmark_invested: outcome.benchmark.total_invested,
            benchmark_final_value: outcome.benchmark.final_value,
            trade_count: outcome.trades.len(),
            buy_count: count_kind(&outcome.trades, TradeKind::Buy),
            sell_count: count_kind(&outcome.trades, TradeKind::Sell),
            pool_funded_buys: pool_funded_buys(&outcome.trades),
            take_profit_amount: take_profit_amount(&outcome.trades),
            max_drawdown: max_drawdown(&values),
            signal_distribution: signal_distribution(&outcome.trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn count_kind(trades: &[Trade], kind: TradeKind) -> usize {
    trades.iter().filter(|t| t.kind == kind).count()
}

pub fn pool_funded_buys(trades: &[Trade]) -> usize {
    trades
        .iter()
        .filter(|t| {
            matches!(
                t.fund_source,
                Some(FundSource::ProfitPool) | Some(FundSource::Mixed { .. })
            )
        })
        .count()
}

/// Total proceeds of all take-profit sells.
pub fn take_profit_amount(trades: &[Trade]) -> f64 {
    trades.iter().filter(|t| t.is_sell()).map(|t| t.amount).sum()
}

/// Buys grouped by composite signal score.
pub fn signal_distribution(trades: &[Trade]) -> BTreeMap<i32, usize> {
    let mut out = BTreeMap::new();
    for t in trades.iter().filter(|t| t.is_buy()) {
        *out.entry(t.signal_score).or_insert(0) += 1;
    }
    out
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Non-finite values are ignored. Returns 0.0 for a curve that never falls.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values.iter().filter(|v| v.is_finite()) {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((v - peak) / peak);
        }
    }
    max_dd
}

/// Total portfolio value per snapshot.
pub fn value_curve(snapshots: &[PortfolioSnapshot]) -> Vec<f64> {
    snapshots.iter().map(|s| s.total_value).collect()
}
