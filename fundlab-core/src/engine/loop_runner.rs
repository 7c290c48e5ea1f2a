//! The timing-backtest fold.

use tracing::{debug, info};

use super::benchmark::run_fixed_dca;
use super::precompute::precompute_features;
use super::schedule::decision_points;
use super::state::{BacktestError, BacktestOutcome, DecisionRecord, StrategyConfig};
use crate::allocation::{step, DecisionInput};
use crate::data::DataError;
use crate::domain::{validate_records, MarketRecord, PortfolioState};
use crate::signals::{derive_signals, MacroObservation, SignalInputs};

/// Run the strategy over `records` without the macro dimension.
pub fn run_timing_backtest(
    records: &[MarketRecord],
    config: &StrategyConfig,
) -> Result<BacktestOutcome, BacktestError> {
    run_timing_backtest_with_macro(records, &[], config)
}

/// Run the strategy, adding the macro dimension wherever `macro_observations`
/// cover a date.
pub fn run_timing_backtest_with_macro(
    records: &[MarketRecord],
    macro_observations: &[MacroObservation],
    config: &StrategyConfig,
) -> Result<BacktestOutcome, BacktestError> {
    config.validate()?;
    validate_records(records)?;
    if records.len() < config.ma_long {
        return Err(DataError::InsufficientHistory {
            len: records.len(),
            required: config.ma_long,
        }
        .into());
    }

    let features = precompute_features(records, macro_observations, config)?;
    let warmup = config.ma_long - 1;
    let mut scheduled = vec![false; records.len()];
    for i in decision_points(&features.dates) {
        scheduled[i] = true;
    }

    let mut state = PortfolioState::new();
    let mut trades = Vec::new();
    let mut decisions = Vec::new();
    let mut snapshots = Vec::with_capacity(records.len());
    let mut benchmark_prices = Vec::new();
    let mut evaluated = 0usize;
    let mut skipped = 0usize;

    for (i, record) in records.iter().enumerate() {
        if scheduled[i] && i >= warmup {
            evaluated += 1;
            let ma = &features.moving_averages;
            let ma_undefined = [ma.short[i], ma.medium[i], ma.long[i]]
                .iter()
                .any(|v| v.is_nan());
            if !record.has_valid_price() || ma_undefined {
                skipped += 1;
                debug!(
                    date = %record.date,
                    price = record.close,
                    "skipping decision point: price or moving average unavailable"
                );
            } else {
                let inputs = SignalInputs {
                    price: record.close,
                    ma_short: ma.short[i],
                    ma_medium: ma.medium[i],
                    ma_long: ma.long[i],
                    price_percentile: features.price_percentile[i],
                    volume_percentile: features.volume_percentile[i],
                };
                let macro_score = features.macro_factors[i].map(|f| f.dimension_score());
                let signals = derive_signals(&config.thresholds, &inputs, macro_score);
                let input = DecisionInput {
                    date: record.date,
                    price: record.close,
                    signals,
                    volume_percentile: inputs.volume_percentile,
                };

                let decision = step(&config.allocation, state, &input);
                state = decision.state;
                for trade in &decision.trades {
                    debug!(
                        date = %trade.timestamp,
                        kind = ?trade.kind,
                        reason = trade.reason.label(),
                        amount = trade.amount,
                        signal = trade.signal_score,
                        "trade"
                    );
                }
                trades.extend(decision.trades);
                benchmark_prices.push(record.close);
                decisions.push(DecisionRecord {
                    date: record.date,
                    price: record.close,
                    signals,
                    total_signal: signals.total(),
                    max_signal: signals.max_magnitude(),
                    tier: config
                        .allocation
                        .buy_tier(signals.total(), signals.max_magnitude()),
                    price_percentile: inputs.price_percentile,
                    volume_percentile: inputs.volume_percentile,
                });
            }
        }

        snapshots.push(state.snapshot(
            record.date,
            record.close,
            features.price_percentile[i],
            features.volume_percentile[i],
        ));
    }

    let final_price = records
        .iter()
        .rev()
        .find(|r| r.has_valid_price())
        .map(|r| r.close)
        .unwrap_or(0.0);
    let benchmark = run_fixed_dca(
        &benchmark_prices,
        config.allocation.benchmark_amount,
        final_price,
    );

    let outcome = BacktestOutcome {
        trades,
        snapshots,
        decisions,
        final_state: state,
        final_price,
        benchmark,
        decision_points: evaluated,
        skipped_decision_points: skipped,
    };
    info!(
        records = records.len(),
        decision_points = outcome.decision_points,
        skipped = outcome.skipped_decision_points,
        trades = outcome.trades.len(),
        strategy_return_pct = outcome.strategy_return_pct(),
        benchmark_return_pct = outcome.benchmark.return_pct(),
        "timing backtest complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn daily(closes: &[f64]) -> Vec<MarketRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                MarketRecord::close_amount(start + chrono::Duration::days(i as i64), c, 1_000.0)
            })
            .collect()
    }

    fn short_config() -> StrategyConfig {
        StrategyConfig {
            ma_short: 3,
            ma_medium: 5,
            ma_long: 10,
            percentile_window: 30,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn too_short_series_rejected() {
        let err = run_timing_backtest(&daily(&[1.0; 5]), &short_config()).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::Data(DataError::InsufficientHistory {
                len: 5,
                required: 10
            })
        ));
    }

    #[test]
    fn empty_series_rejected() {
        let err = run_timing_backtest(&[], &short_config()).unwrap_err();
        assert!(matches!(err, BacktestError::Data(DataError::EmptySeries)));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = short_config();
        config.allocation.signal_sell_percentile = 150.0;
        let err = run_timing_backtest(&daily(&[1.0; 50]), &config).unwrap_err();
        assert!(matches!(err, BacktestError::Config(_)));
    }

    #[test]
    fn one_buy_per_month_after_warmup() {
        // 2020-01-01 .. 2020-04-09: months Jan..Apr, warm-up covers early January
        let closes: Vec<f64> = (0..100).map(|i| 10.0 + i as f64 * 0.1).collect();
        let out = run_timing_backtest(&daily(&closes), &short_config()).unwrap();
        assert_eq!(out.snapshots.len(), 100);
        // Feb 1, Mar 1, Apr 1 (Jan 1 is inside warm-up)
        assert_eq!(out.decision_points, 3);
        assert_eq!(out.skipped_decision_points, 0);
        assert_eq!(out.trades.iter().filter(|t| t.is_buy()).count(), 3);
        assert_eq!(out.benchmark.contributions, 3);
    }

    #[test]
    fn unordered_moving_averages_rejected_before_any_decision() {
        let config = StrategyConfig {
            ma_short: 3,
            ma_medium: 60,
            ma_long: 10,
            percentile_window: 30,
            ..StrategyConfig::default()
        };
        let err = run_timing_backtest(&daily(&[10.0; 100]), &config).unwrap_err();
        assert!(matches!(err, BacktestError::Config(_)));
    }

    #[test]
    fn undefined_moving_average_skips_the_decision_point() {
        let mut records = daily(&[10.0; 100]);
        // 2020-03-01 is index 60; a missing close two days earlier leaves
        // every moving average that spans it undefined
        records[58].close = f64::NAN;
        let out = run_timing_backtest(&records, &short_config()).unwrap();
        assert_eq!(out.decision_points, 3);
        assert_eq!(out.skipped_decision_points, 1);
        assert_eq!(out.decisions.len(), 2);
        assert!(out
            .decisions
            .iter()
            .all(|d| d.date != NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()));
    }

    #[test]
    fn invalid_price_on_decision_day_is_skipped() {
        let mut records = daily(&[10.0; 100]);
        // 2020-02-01 is index 31
        records[31].close = 0.0;
        let out = run_timing_backtest(&records, &short_config()).unwrap();
        assert_eq!(out.skipped_decision_points, 1);
        assert_eq!(out.decision_points, 3);
        assert_eq!(out.trades.iter().filter(|t| t.is_buy()).count(), 2);
        assert_eq!(out.decisions.len(), 2);
    }
}
