//! Look-ahead contamination tests.
//!
//! Invariant: no output at index t may depend on input at index t+1 or later.
//!
//! Method: compute on a truncated series and on the full series, then
//! require the overlapping prefix to be identical.

use chrono::NaiveDate;
use fundlab_core::domain::MarketRecord;
use fundlab_core::engine::{run_timing_backtest, StrategyConfig};
use fundlab_core::indicators::{Indicator, PctChange, Sma};
use fundlab_core::percentile::{Backend, PercentileWindowEngine};

/// Deterministic pseudo-random walk using a simple LCG.
fn make_walk(n: usize) -> Vec<f64> {
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
            price = (price + change).max(10.0);
            price
        })
        .collect()
}

fn make_records(n: usize) -> Vec<MarketRecord> {
    let base = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    make_walk(n)
        .into_iter()
        .enumerate()
        .map(|(i, close)| {
            let amount = 1.0e9 + ((i * 7919) % 1000) as f64 * 1.0e6;
            MarketRecord::close_amount(base + chrono::Duration::days(i as i64), close, amount)
        })
        .collect()
}

fn assert_prefix_equal(name: &str, full: &[f64], truncated: &[f64]) {
    for (i, (f, t)) in full.iter().zip(truncated).enumerate() {
        if f.is_nan() && t.is_nan() {
            continue;
        }
        assert_eq!(f, t, "{name}: value changed at index {i}");
    }
}

#[test]
fn percentile_has_no_lookahead() {
    let values = make_walk(1200);
    for backend in [Backend::Naive, Backend::OrderStatistic] {
        let engine = PercentileWindowEngine::new(504, backend).unwrap();
        let full = engine.compute_values(&values);
        for cut in [1, 2, 503, 504, 505, 800] {
            let truncated = engine.compute_values(&values[..cut]);
            assert_eq!(&full[..cut], &truncated[..], "{backend:?} cut at {cut}");
        }
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let values = make_walk(600);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Sma::new(250)),
        Box::new(PctChange::new(20)),
    ];
    for ind in &indicators {
        let full = ind.compute(&values);
        let truncated = ind.compute(&values[..300]);
        assert_eq!(truncated.len(), 300);
        assert_prefix_equal(ind.name(), &full, &truncated);
    }
}

#[test]
fn backtest_decisions_have_no_lookahead() {
    let records = make_records(1500);
    let config = StrategyConfig::default();
    let full = run_timing_backtest(&records, &config).unwrap();
    let truncated = run_timing_backtest(&records[..900], &config).unwrap();

    assert!(!truncated.decisions.is_empty());
    for (f, t) in full.decisions.iter().zip(&truncated.decisions) {
        assert_eq!(f.date, t.date);
        assert_eq!(f.signals, t.signals);
        assert_eq!(f.price_percentile, t.price_percentile);
    }
    let prefix_trades = full
        .trades
        .iter()
        .filter(|t| t.timestamp <= records[899].date)
        .count();
    assert_eq!(prefix_trades, truncated.trades.len());
    for (f, t) in full.snapshots.iter().zip(&truncated.snapshots) {
        assert_eq!(f.total_value, t.total_value);
    }
}
