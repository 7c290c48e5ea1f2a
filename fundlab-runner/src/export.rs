//! Artifact export: JSON result, trade tape and portfolio history as CSV.
//!
//! A run directory holds:
//! - `result.json`: the full `BacktestResult`
//! - `trades.csv`: one row per trade
//! - `portfolio.csv`: one row per input record, after that record's trades
//!
//! JSON has no NaN; non-finite numbers are written as `null`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fundlab_core::domain::{PortfolioSnapshot, Trade};

use crate::runner::BacktestResult;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

/// Columns: date, kind, reason, price, quantity, amount, salary_used,
/// fund_source, signal_score, signal_vector
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "kind",
        "reason",
        "price",
        "quantity",
        "amount",
        "salary_used",
        "fund_source",
        "signal_score",
        "signal_vector",
    ])?;

    for t in trades {
        wtr.write_record([
            t.timestamp.to_string(),
            if t.is_buy() { "buy" } else { "sell" }.to_string(),
            t.reason.label().to_string(),
            format!("{:.4}", t.price),
            format!("{:.4}", t.quantity),
            format!("{:.2}", t.amount),
            format!("{:.2}", t.salary_used),
            t.fund_source.map(|s| s.to_string()).unwrap_or_default(),
            t.signal_score.to_string(),
            t.signal_vector.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per snapshot.
pub fn export_portfolio_csv(snapshots: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "price",
        "shares_held",
        "stock_value",
        "profit_pool",
        "cash_invested_cumulative",
        "total_value",
        "price_percentile",
        "volume_percentile",
    ])?;
    for s in snapshots {
        wtr.write_record([
            s.date.to_string(),
            format!("{:.4}", s.price),
            format!("{:.4}", s.shares_held),
            format!("{:.2}", s.stock_value),
            format!("{:.2}", s.profit_pool),
            format!("{:.2}", s.cash_invested_cumulative),
            format!("{:.2}", s.total_value),
            opt(s.price_percentile),
            opt(s.volume_percentile),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set under `{output_dir}/{symbol}_{run_id prefix}/`.
///
/// Returns the path to the run directory. Re-running an identical config
/// overwrites its previous artifacts.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{short_id}", result.symbol));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_trades_csv(&result.outcome.trades)?,
    )?;
    std::fs::write(
        run_dir.join("portfolio.csv"),
        export_portfolio_csv(&result.outcome.snapshots)?,
    )?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}
