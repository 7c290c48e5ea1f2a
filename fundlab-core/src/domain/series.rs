//! Time series and market records: the input units of every computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::provider::DataError;

/// A single observation of one dimension (price, amount, spread...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: NaiveDate, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// An ordered, validated series of observations.
///
/// Construction guarantees the series is non-empty and timestamps are
/// strictly increasing. NaN values are allowed; they are treated as missing
/// by every consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self, DataError> {
        if points.is_empty() {
            return Err(DataError::EmptySeries);
        }
        check_monotonic(points.iter().map(|p| p.timestamp))?;
        Ok(Self { points })
    }

    /// Build from parallel date/value slices.
    pub fn from_parts(dates: &[NaiveDate], values: &[f64]) -> Result<Self, DataError> {
        if dates.len() != values.len() {
            return Err(DataError::Malformed(format!(
                "{} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        let points = dates
            .iter()
            .zip(values)
            .map(|(&d, &v)| TimeSeriesPoint::new(d, v))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Last observation (a validated series is never empty).
    pub fn last(&self) -> TimeSeriesPoint {
        self.points[self.points.len() - 1]
    }

    /// Keep only the most recent `n` observations.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.points.len().saturating_sub(n.max(1));
        Self {
            points: self.points[start..].to_vec(),
        }
    }
}

/// Daily record as supplied by a market-data provider.
///
/// The core only requires `date`, `close`, and `amount` (turnover). Other
/// fields may be NaN when the source does not provide them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl MarketRecord {
    /// Record with only the fields the core needs.
    pub fn close_amount(date: NaiveDate, close: f64, amount: f64) -> Self {
        Self {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close,
            volume: f64::NAN,
            amount,
        }
    }

    /// A usable price: finite and strictly positive.
    pub fn has_valid_price(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Validate that a slice of records is non-empty with strictly increasing dates.
pub fn validate_records(records: &[MarketRecord]) -> Result<(), DataError> {
    if records.is_empty() {
        return Err(DataError::EmptySeries);
    }
    check_monotonic(records.iter().map(|r| r.date))
}

fn check_monotonic(dates: impl Iterator<Item = NaiveDate>) -> Result<(), DataError> {
    let mut prev: Option<NaiveDate> = None;
    for (index, date) in dates.enumerate() {
        if let Some(p) = prev {
            if date <= p {
                return Err(DataError::NonMonotonic {
                    index,
                    previous: p,
                    current: date,
                });
            }
        }
        prev = Some(date);
    }
    Ok(())
}
