//! Timing backtest: a left-to-right fold over daily market records.
//!
//! 1. Validate the records and precompute moving averages and percentiles
//! 2. Mark decision points (first trading day of each calendar month)
//! 3. Fold: on decision points derive signals and call `allocation::step`;
//!    on every record emit a `PortfolioSnapshot`
//! 4. Replay the same schedule with a fixed contribution as the benchmark

pub mod benchmark;
pub mod loop_runner;
pub mod precompute;
pub mod schedule;
pub mod state;

pub use benchmark::{run_fixed_dca, BenchmarkOutcome};
pub use loop_runner::{run_timing_backtest, run_timing_backtest_with_macro};
pub use precompute::{precompute_features, Features};
pub use schedule::decision_points;
pub use state::{BacktestError, BacktestOutcome, DecisionRecord, StrategyConfig};
