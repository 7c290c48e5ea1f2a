//! End-to-end timing backtests on generated series.

use chrono::{Datelike, NaiveDate};
use fundlab_core::domain::{MarketRecord, TradeKind};
use fundlab_core::engine::{run_timing_backtest, run_timing_backtest_with_macro, StrategyConfig};
use fundlab_core::signals::MacroObservation;

fn records_from(closes: &[f64], amounts: &[f64]) -> Vec<MarketRecord> {
    let base = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    closes
        .iter()
        .zip(amounts)
        .enumerate()
        .map(|(i, (&c, &a))| {
            MarketRecord::close_amount(base + chrono::Duration::days(i as i64), c, a)
        })
        .collect()
}

/// A slow sine wave around 100 with a volume spike at every crest.
fn cyclical(n: usize) -> Vec<MarketRecord> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + 30.0 * (i as f64 / 90.0).sin())
        .collect();
    let amounts: Vec<f64> = closes.iter().map(|c| c * 1.0e7).collect();
    records_from(&closes, &amounts)
}

#[test]
fn accounting_identities_hold_over_a_full_run() {
    let records = cyclical(1400);
    let out = run_timing_backtest(&records, &StrategyConfig::default()).unwrap();

    let salary: f64 = out.trades.iter().map(|t| t.salary_used).sum();
    assert!((salary - out.final_state.cash_invested_cumulative()).abs() < 1e-6);

    let bought: f64 = out
        .trades
        .iter()
        .filter(|t| t.kind == TradeKind::Buy)
        .map(|t| t.quantity)
        .sum();
    let sold: f64 = out
        .trades
        .iter()
        .filter(|t| t.kind == TradeKind::Sell)
        .map(|t| t.quantity)
        .sum();
    assert!((bought - sold - out.final_state.shares_held()).abs() < 1e-6);

    let proceeds: f64 = out
        .trades
        .iter()
        .filter(|t| t.kind == TradeKind::Sell)
        .map(|t| t.amount)
        .sum();
    let drawn: f64 = out
        .trades
        .iter()
        .filter(|t| t.kind == TradeKind::Buy)
        .map(|t| t.amount - t.salary_used)
        .sum();
    assert!((proceeds - drawn - out.final_state.profit_pool()).abs() < 1e-6);
}

#[test]
fn one_buy_per_evaluated_month() {
    let records = cyclical(1000);
    let out = run_timing_backtest(&records, &StrategyConfig::default()).unwrap();
    let buys: Vec<_> = out.trades.iter().filter(|t| t.is_buy()).collect();
    assert_eq!(buys.len(), out.decisions.len());
    assert_eq!(out.benchmark.contributions, out.decisions.len());
    for pair in buys.windows(2) {
        let (a, b) = (pair[0].timestamp, pair[1].timestamp);
        assert_ne!((a.year(), a.month()), (b.year(), b.month()));
    }
    assert_eq!(out.snapshots.len(), records.len());
    assert!(out.decisions.iter().all(|d| d.max_signal == 4));
}

#[test]
fn benchmark_invests_fixed_amounts() {
    let records = cyclical(800);
    let out = run_timing_backtest(&records, &StrategyConfig::default()).unwrap();
    let b = out.benchmark;
    assert_eq!(b.total_invested, 5_000.0 * b.contributions as f64);
    assert!((b.final_value - b.shares * out.final_price).abs() < 1e-6);
}

#[test]
fn macro_dimension_widens_the_signal_range() {
    let records = cyclical(800);
    let first = records[0].date;
    let observations = vec![MacroObservation {
        date: first,
        pmi: Some(53.0),
        m1_growth: Some(25.0),
        m2_growth: Some(10.0),
        ..Default::default()
    }];
    let out =
        run_timing_backtest_with_macro(&records, &observations, &StrategyConfig::default())
            .unwrap();
    assert!(!out.decisions.is_empty());
    for d in &out.decisions {
        assert_eq!(d.max_signal, 8);
        // PMI +2 and money policy +2
        assert_eq!(d.signals.macro_factor, Some(4));
    }
}

#[test]
fn outcome_serializes_to_json() {
    let out = run_timing_backtest(&cyclical(400), &StrategyConfig::default()).unwrap();
    let json = serde_json::to_string(&out).unwrap();
    assert!(json.contains("\"snapshots\""));
    assert!(json.contains("\"benchmark\""));
}
