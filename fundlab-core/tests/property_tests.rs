//! Property tests for percentile and allocation invariants.
//!
//! Uses proptest to verify:
//! 1. No look-ahead: truncating the input leaves earlier outputs unchanged
//! 2. Self-inclusion: every computed percentile is in [100/h, 100]
//! 3. Window invariance: values older than the window do not matter
//! 4. Monotonicity: raising the current value never lowers its percentile
//! 5. Backend equivalence: naive and order-statistic agree exactly
//! 6. Conservation: sells move value into the pool, buys only count salary

use chrono::NaiveDate;
use fundlab_core::allocation::{step, AllocationRules, DecisionInput};
use fundlab_core::domain::{FundSource, PortfolioState, TradeKind};
use fundlab_core::percentile::{
    Backend, NaiveBackend, OrderStatisticBackend, PercentileWindowEngine, RankBackend,
};
use fundlab_core::signals::{SignalDimension, SignalVector};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Coarse values so ties are common; occasional NaN.
fn arb_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            9 => (0u8..20).prop_map(|v| v as f64),
            1 => Just(f64::NAN),
        ],
        1..120,
    )
}

fn arb_window() -> impl Strategy<Value = usize> {
    1usize..80
}

fn arb_signals() -> impl Strategy<Value = SignalVector> {
    (
        prop_oneof![Just(-1), Just(1)],
        -1i32..=1,
        -1i32..=1,
        -1i32..=1,
        prop::option::of(-4i32..=4),
    )
        .prop_map(|(t, v, s, m, macro_score)| {
            let mut out = SignalVector::default()
                .with(SignalDimension::Trend, t)
                .with(SignalDimension::Valuation, v)
                .with(SignalDimension::Sentiment, s)
                .with(SignalDimension::Momentum, m);
            out.set(SignalDimension::Macro, macro_score);
            out
        })
}

// ── 1–5. Percentile engine ───────────────────────────────────────────

proptest! {
    #[test]
    fn no_lookahead(values in arb_series(), window in arb_window(), cut in 0usize..120) {
        let cut = cut.min(values.len());
        let engine = PercentileWindowEngine::with_window(window).unwrap();
        let full = engine.compute_values(&values);
        let truncated = engine.compute_values(&values[..cut]);
        prop_assert_eq!(&full[..cut], &truncated[..]);
    }

    #[test]
    fn self_inclusion_bound(values in arb_series(), window in arb_window()) {
        let ranks = NaiveBackend.window_ranks(&values, window);
        for r in ranks.into_iter().flatten() {
            let p = r.percentile();
            prop_assert!(p <= 100.0);
            if r.history >= 2 {
                prop_assert!(p >= 100.0 / r.history as f64 - 1e-9);
            } else {
                prop_assert_eq!(p, 0.0);
            }
        }
    }

    #[test]
    fn window_invariance(
        values in arb_series(),
        window in arb_window(),
        replacement in 0u8..20,
    ) {
        let engine = PercentileWindowEngine::with_window(window).unwrap();
        let base = engine.compute_values(&values);
        let n = values.len();
        if n > window {
            // overwrite everything that has left the last index's window
            let mut changed = values.clone();
            for v in changed.iter_mut().take(n - window) {
                *v = replacement as f64;
            }
            let after = engine.compute_values(&changed);
            prop_assert_eq!(base[n - 1], after[n - 1]);
        }
    }

    #[test]
    fn raising_current_value_never_lowers_percentile(
        values in arb_series(),
        window in arb_window(),
        bump in 0u8..20,
    ) {
        let last = values.len() - 1;
        prop_assume!(!values[last].is_nan());
        let engine = PercentileWindowEngine::with_window(window).unwrap();
        let before = engine.compute_values(&values)[last];
        let mut raised = values.clone();
        raised[last] += bump as f64;
        let after = engine.compute_values(&raised)[last];
        prop_assert!(after >= before, "{:?} -> {:?}", before, after);
    }

    #[test]
    fn strictly_increasing_window_tops_out(start in -50i32..50, len in 2usize..200, window in 2usize..80) {
        let values: Vec<f64> = (0..len).map(|i| (start + i as i32) as f64).collect();
        let engine = PercentileWindowEngine::new(window, Backend::OrderStatistic).unwrap();
        let out = engine.compute_values(&values);
        for p in out.iter().skip(1) {
            prop_assert_eq!(*p, Some(100.0));
        }
    }

    #[test]
    fn backends_agree(values in arb_series(), window in arb_window()) {
        prop_assert_eq!(
            NaiveBackend.window_ranks(&values, window),
            OrderStatisticBackend.window_ranks(&values, window)
        );
    }
}

// ── 6. Allocation conservation ───────────────────────────────────────

proptest! {
    #[test]
    fn step_conserves_value(
        invested in 0.0..100_000.0_f64,
        shares in 0.0..5_000.0_f64,
        pool in 0.0..40_000.0_f64,
        price in 0.5..100.0_f64,
        volume in 0.0..=100.0_f64,
        signals in arb_signals(),
    ) {
        let before = PortfolioState::from_parts(invested, shares, pool);
        let d = step(
            &AllocationRules::default(),
            before,
            &DecisionInput {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                price,
                signals,
                volume_percentile: Some(volume),
            },
        );

        let mut expected_shares = shares;
        let mut expected_pool = pool;
        let mut expected_invested = invested;
        let mut sells = 0;
        let mut buys = 0;
        for t in &d.trades {
            match t.kind {
                TradeKind::Sell => {
                    sells += 1;
                    prop_assert!((t.amount - t.quantity * price).abs() < 1e-6);
                    expected_shares -= t.quantity;
                    expected_pool += t.amount;
                }
                TradeKind::Buy => {
                    buys += 1;
                    let pool_part = t.amount - t.salary_used;
                    match t.fund_source {
                        Some(FundSource::Salary) => prop_assert_eq!(pool_part, 0.0),
                        Some(FundSource::ProfitPool) => prop_assert_eq!(t.salary_used, 0.0),
                        Some(FundSource::Mixed { pool, salary }) => {
                            prop_assert!((pool - pool_part).abs() < 1e-9);
                            prop_assert!((salary - t.salary_used).abs() < 1e-9);
                        }
                        None => prop_assert!(false, "buy without fund source"),
                    }
                    expected_pool -= pool_part;
                    expected_invested += t.salary_used;
                    expected_shares += t.quantity;
                }
            }
        }

        prop_assert!(sells <= 1);
        prop_assert_eq!(buys, 1);
        prop_assert!((d.state.shares_held() - expected_shares).abs() < 1e-6);
        prop_assert!((d.state.profit_pool() - expected_pool).abs() < 1e-6);
        prop_assert!((d.state.cash_invested_cumulative() - expected_invested).abs() < 1e-6);
        prop_assert!(d.state.profit_pool() >= 0.0);
        prop_assert!(d.state.shares_held() >= 0.0);
    }
}
