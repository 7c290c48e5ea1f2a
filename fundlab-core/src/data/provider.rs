//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (CSV import, remote
//! APIs) so the engine never cares where a record came from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MarketRecord;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("series is empty")]
    EmptySeries,

    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("series too short: {len} records, need at least {required}")]
    InsufficientHistory { len: usize, required: usize },

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("no data available for '{symbol}'")]
    NoData { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What a cached or fetched series represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Index or stock daily records.
    Market,
    /// Fund net asset value history.
    FundNav,
    /// Macro indicators (bond yield, money supply, PMI, USD index).
    Macro,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Market => "market",
            DataKind::FundNav => "fund",
            DataKind::Macro => "macro",
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    CsvImport,
    Cache,
    Synthetic,
}

/// Trait for market-data providers.
///
/// Implementations must return records strictly ordered by date with no
/// duplicates. The cache layer sits above this trait; providers don't know
/// about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily records for a symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarketRecord>, DataError>;
}
