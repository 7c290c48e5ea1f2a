//! Domain types for FundLab

pub mod portfolio;
pub mod series;
pub mod trade;

pub use portfolio::{PortfolioSnapshot, PortfolioState};
pub use series::{validate_records, MarketRecord, TimeSeries, TimeSeriesPoint};
pub use trade::{FundSource, Trade, TradeKind, TradeReason};
