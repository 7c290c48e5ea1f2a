//! CSV import provider.
//!
//! Layout: `{dir}/{SYMBOL}.csv` with header
//! `date,open,high,low,close,volume,amount`. Only `date`, `close`, and
//! `amount` are required; missing numeric cells become NaN.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::provider::{DataError, DataProvider};
use crate::domain::series::validate_records;
use crate::domain::MarketRecord;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    amount: Option<f64>,
}

impl From<CsvRow> for MarketRecord {
    fn from(row: CsvRow) -> Self {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        MarketRecord {
            date: row.date,
            open: nan(row.open),
            high: nan(row.high),
            low: nan(row.low),
            close: nan(row.close),
            volume: nan(row.volume),
            amount: nan(row.amount),
        }
    }
}

/// Reads daily records from CSV files in a directory.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

/// Parse a CSV file of daily records, sorted as found in the file.
pub fn read_records_csv(path: &Path) -> Result<Vec<MarketRecord>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        records.push(MarketRecord::from(row?));
    }
    Ok(records)
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarketRecord>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let records: Vec<MarketRecord> = read_records_csv(&path)?
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect();
        if records.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        validate_records(&records)?;
        tracing::debug!(symbol, count = records.len(), "loaded CSV records");
        Ok(records)
    }
}
