//! FundLab CLI: backtest, drawdown, percentile, stock-bond and cache commands.
//!
//! Commands:
//! - `backtest`: monthly timing backtest from a TOML config or a symbol
//! - `drawdown`: drawdown statistics and buy suggestion for a fund
//! - `percentile`: rolling percentile of one column of a series
//! - `stock-bond`: stock/bond ratio index and suggested allocation
//! - `cache status`: report cached entries, date ranges and size
//!
//! Logging goes to stderr; set `RUST_LOG` to change the level (default `info`).

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use fundlab_core::data::{CsvProvider, DataProvider, JsonCache};
use fundlab_core::notify::{
    backtest_notification, drawdown_notification, stock_bond_notification, BarkSink,
    Notification, NotificationSink,
};
use fundlab_core::percentile::{Backend, PercentileWindowEngine, DEFAULT_WINDOW};
use fundlab_runner::data_loader::load_records;
use fundlab_runner::{
    field_series, run_drawdown, run_single_backtest, run_stock_bond, save_artifacts,
    BacktestConfig, BacktestResult, LoadOptions, SeriesField,
};

#[derive(Parser)]
#[command(
    name = "fundlab",
    about = "FundLab CLI: percentile timing signals and fund backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where data comes from and which range to load.
#[derive(Args, Clone)]
struct DataArgs {
    /// Directory of `{SYMBOL}.csv` files.
    #[arg(long, default_value = "data/csv")]
    csv_dir: PathBuf,

    /// Cache directory.
    #[arg(long, default_value = "data/cache")]
    cache_dir: PathBuf,

    /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Use only the cache; never read the CSV directory.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Ignore cached entries and re-import.
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monthly timing backtest.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol to backtest with default rules (ignored with --config).
        #[arg(long)]
        symbol: Option<String>,

        #[command(flatten)]
        data: DataArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Bark endpoint to push the summary to.
        #[arg(long)]
        notify_url: Option<String>,
    },
    /// Drawdown statistics and buy suggestion for a fund's NAV.
    Drawdown {
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        /// Only analyse the most recent N observations.
        #[arg(long)]
        recent_days: Option<usize>,

        /// Print the report as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(long)]
        notify_url: Option<String>,
    },
    /// Rolling historical percentile of one column.
    Percentile {
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        #[arg(long, value_enum, default_value_t = FieldArg::Close)]
        field: FieldArg,

        /// Trailing window in observations.
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        #[arg(long, value_enum, default_value_t = BackendArg::OrderStatistic)]
        backend: BackendArg,

        /// Print only the last N rows.
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
    /// Stock/bond ratio index from an index PE series and a bond yield series.
    StockBond {
        /// Symbol whose `close` column holds the index PE.
        #[arg(long)]
        pe_symbol: String,

        /// Symbol whose `close` column holds the 10y bond yield in percent.
        #[arg(long)]
        yield_symbol: String,

        #[command(flatten)]
        data: DataArgs,

        /// Percentile window. Defaults to three years of trading days.
        #[arg(long)]
        window: Option<usize>,

        #[arg(long, default_value_t = 10)]
        last: usize,

        #[arg(long)]
        notify_url: Option<String>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached entries, date ranges and total size.
    Status {
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Close,
    Amount,
    Volume,
}

impl From<FieldArg> for SeriesField {
    fn from(f: FieldArg) -> Self {
        match f {
            FieldArg::Close => SeriesField::Close,
            FieldArg::Amount => SeriesField::Amount,
            FieldArg::Volume => SeriesField::Volume,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Naive,
    OrderStatistic,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Naive => Backend::Naive,
            BackendArg::OrderStatistic => Backend::OrderStatistic,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            symbol,
            data,
            output_dir,
            notify_url,
        } => run_backtest_cmd(config, symbol, data, output_dir, notify_url),
        Commands::Drawdown {
            symbol,
            data,
            recent_days,
            json,
            notify_url,
        } => run_drawdown_cmd(&symbol, &data, recent_days, json, notify_url),
        Commands::Percentile {
            symbol,
            data,
            field,
            window,
            backend,
            last,
        } => run_percentile_cmd(&symbol, &data, field, window, backend, last),
        Commands::StockBond {
            pe_symbol,
            yield_symbol,
            data,
            window,
            last,
            notify_url,
        } => run_stock_bond_cmd(&pe_symbol, &yield_symbol, &data, window, last, notify_url),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn parse_date(s: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    Ok(s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or(default))
}

impl DataArgs {
    fn load_options(&self) -> Result<LoadOptions> {
        if self.offline && self.force {
            bail!("--offline and --force are mutually exclusive");
        }
        let today = chrono::Local::now().date_naive();
        let start = parse_date(
            self.start.as_deref(),
            today - chrono::Duration::days(365 * 10),
        )?;
        let end = parse_date(self.end.as_deref(), today)?;
        if start > end {
            bail!("start date {start} is after end date {end}");
        }
        Ok(LoadOptions {
            start,
            end,
            offline: self.offline,
            synthetic: self.synthetic,
            force: self.force,
        })
    }

    fn provider(&self) -> Option<CsvProvider> {
        (!self.offline).then(|| CsvProvider::new(&self.csv_dir))
    }
}

fn notify(url: Option<&str>, notification: &Notification) -> Result<()> {
    if let Some(url) = url {
        let sink = BarkSink::new(url)?;
        sink.send(notification)?;
        println!("Notification sent via {}", sink.name());
    }
    Ok(())
}

fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    data: DataArgs,
    output_dir: PathBuf,
    notify_url: Option<String>,
) -> Result<()> {
    let mut opts = data.load_options()?;
    let config = match (config_path, symbol) {
        (Some(_), Some(_)) => bail!("--config and --symbol are mutually exclusive"),
        (None, None) => bail!("one of --config or --symbol is required"),
        (Some(path), None) => {
            let config = BacktestConfig::from_file(&path)?;
            opts.start = config.backtest.start_date;
            opts.end = config.backtest.end_date;
            config
        }
        (None, Some(symbol)) => {
            let mut config = BacktestConfig::new(symbol, opts.start, opts.end);
            config.data.csv_dir = data.csv_dir.clone();
            config.data.cache_dir = data.cache_dir.clone();
            config
        }
    };

    let cache = JsonCache::new(&config.data.cache_dir);
    let provider = (!opts.offline).then(|| CsvProvider::new(&config.data.csv_dir));
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let result = run_single_backtest(&config, &cache, provider_ref, &opts)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    notify(
        notify_url.as_deref(),
        &backtest_notification(&result.symbol, &result.outcome),
    )
}

fn run_drawdown_cmd(
    symbol: &str,
    data: &DataArgs,
    recent_days: Option<usize>,
    json: bool,
    notify_url: Option<String>,
) -> Result<()> {
    let opts = data.load_options()?;
    let cache = JsonCache::new(&data.cache_dir);
    let provider = data.provider();
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let report = run_drawdown(symbol, &cache, provider_ref, &opts, recent_days)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return notify(notify_url.as_deref(), &drawdown_notification(symbol, &report));
    }
    let s = &report.stats;

    println!();
    println!("=== Drawdown: {symbol} (as of {}) ===", report.as_of);
    println!("Observations:       {}", report.observations);
    println!("Current drawdown:   {:.2}%", report.current_depth);
    println!("Depth percentile:   {:.1}%", report.depth_percentile);
    println!("Max drawdown:       {:.2}%", s.max);
    println!("Mean / std:         {:.2}% / {:.2}%", s.mean, s.std_dev);
    println!(
        "Quantiles 5/10/25/50/75: {:.2} / {:.2} / {:.2} / {:.2} / {:.2}",
        s.q05, s.q10, s.q25, s.q50, s.q75
    );
    println!("At a high:          {:.1}% of days", s.zero_ratio_pct);
    println!();
    println!("Suggestion: {} (risk: {})", report.suggestion.label(), report.risk_level);
    println!("Reason:     {}", report.suggestion.reason());

    notify(
        notify_url.as_deref(),
        &drawdown_notification(symbol, &report),
    )
}

fn run_percentile_cmd(
    symbol: &str,
    data: &DataArgs,
    field: FieldArg,
    window: usize,
    backend: BackendArg,
    last: usize,
) -> Result<()> {
    let opts = data.load_options()?;
    let cache = JsonCache::new(&data.cache_dir);
    let provider = data.provider();
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let loaded = load_records(
        symbol,
        fundlab_core::data::DataKind::Market,
        &cache,
        provider_ref,
        &opts,
    )?;
    let series = field_series(&loaded.records, field.into())?;
    let engine = PercentileWindowEngine::new(window, backend.into())?;
    let results = engine.compute(&series);

    println!("{:<12} {:>16} {:>11}", "Date", "Value", "Percentile");
    println!("{}", "-".repeat(41));
    let skip = results.len().saturating_sub(last);
    for (point, result) in series.points().iter().zip(&results).skip(skip) {
        let pct = result
            .percentile
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".into());
        println!("{:<12} {:>16.4} {:>11}", result.timestamp, point.value, pct);
    }
    Ok(())
}

fn run_stock_bond_cmd(
    pe_symbol: &str,
    yield_symbol: &str,
    data: &DataArgs,
    window: Option<usize>,
    last: usize,
    notify_url: Option<String>,
) -> Result<()> {
    let opts = data.load_options()?;
    let cache = JsonCache::new(&data.cache_dir);
    let provider = data.provider();
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let points = run_stock_bond(pe_symbol, yield_symbol, &cache, provider_ref, &opts, window)?;

    println!(
        "{:<12} {:>8} {:>8} {:>8} {:>7} {:>12}",
        "Date", "Bond %", "Stock %", "Spread", "Index", "Stock/Bond"
    );
    println!("{}", "-".repeat(60));
    let skip = points.len().saturating_sub(last);
    for p in points.iter().skip(skip) {
        println!(
            "{:<12} {:>8.2} {:>8.2} {:>8.2} {:>7.1} {:>8}/{:<3}",
            p.date,
            p.bond_yield,
            p.stock_yield,
            p.spread,
            p.ratio_index,
            p.allocation.stock_pct,
            p.allocation.bond_pct
        );
    }

    match points.last() {
        Some(latest) => {
            println!();
            println!(
                "Latest: {} (risk: {})",
                latest.allocation.tilt, latest.allocation.risk_level
            );
            notify(notify_url.as_deref(), &stock_bond_notification(latest))
        }
        None => Ok(()),
    }
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = JsonCache::new(cache_dir);
    let entries = cache.entries();
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}", entries.len());
    println!("Total size: {}", format_size(dir_size(cache_dir)));
    println!();
    println!(
        "{:<10} {:<8} {:<25} {:>8}  {}",
        "Symbol", "Kind", "Date Range", "Records", "Cached At"
    );
    println!("{}", "-".repeat(72));
    for meta in &entries {
        println!(
            "{:<10} {:<8} {:<25} {:>8}  {}",
            meta.symbol,
            meta.kind.as_str(),
            format!("{} to {}", meta.start_date, meta.end_date),
            meta.record_count,
            meta.cached_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Timing Backtest Result ===");
    println!("Symbol:           {}", result.symbol);
    println!(
        "Period:           {} to {} ({} records)",
        result.first_date, result.last_date, result.record_count
    );
    println!(
        "Decision points:  {} ({} skipped)",
        result.outcome.decision_points, result.outcome.skipped_decision_points
    );
    println!("Macro dimension:  {}", if result.macro_enabled { "on" } else { "off" });
    println!();
    println!("--- Performance ---");
    println!("Invested:         {:.0}", m.total_invested);
    println!("Final value:      {:.2}", m.final_value);
    println!("Strategy return:  {:.2}%", m.strategy_return_pct);
    println!("Fixed DCA return: {:.2}%", m.benchmark_return_pct);
    println!("Excess return:    {:.2}%", m.excess_return_pct);
    println!("Profit pool:      {:.2}", m.final_profit_pool);
    println!("Max drawdown:     {:.2}%", m.max_drawdown * 100.0);
    println!();
    println!("--- Trades ---");
    println!("Total:            {}", m.trade_count);
    println!("Buys:             {} ({} from pool)", m.buy_count, m.pool_funded_buys);
    println!("Take-profits:     {} ({:.2})", m.sell_count, m.take_profit_amount);
    if !m.signal_distribution.is_empty() {
        println!();
        println!("Signal distribution of buys:");
        for (score, count) in &m.signal_distribution {
            println!("  {score:+3}: {count}");
        }
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
