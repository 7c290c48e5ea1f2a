//! Stock/bond ratio: equity earnings yield versus the 10y bond yield.
//!
//! `spread = bond_yield_10y - 100 / pe`. The ratio index is the rolling
//! percentile of the spread; a low index means equities are cheap relative
//! to bonds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::DataError;
use crate::domain::TimeSeries;
use crate::drawdown::RiskLevel;
use crate::percentile::PercentileWindowEngine;

/// Three trading years.
pub const RATIO_LOOKBACK: usize = 756;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tilt {
    TowardEquity,
    Balanced,
    TowardBonds,
}

impl fmt::Display for Tilt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tilt::TowardEquity => "overweight equity funds",
            Tilt::Balanced => "balanced stock/bond mix",
            Tilt::TowardBonds => "overweight bond funds",
        };
        f.write_str(s)
    }
}

/// Recommended split for a ratio index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub stock_pct: u8,
    pub bond_pct: u8,
    pub tilt: Tilt,
    pub risk_level: RiskLevel,
}

// Upper bounds (inclusive) of each band with its stock share.
const BANDS: [(f64, u8); 7] = [
    (5.0, 100),
    (15.0, 90),
    (35.0, 80),
    (65.0, 50),
    (85.0, 30),
    (95.0, 20),
    (100.0, 10),
];

pub fn allocation_for(ratio_index: f64) -> AssetAllocation {
    let stock_pct = BANDS
        .iter()
        .find(|(upper, _)| ratio_index <= *upper)
        .map(|(_, stock)| *stock)
        .unwrap_or(10);
    let tilt = match stock_pct {
        s if s > 50 => Tilt::TowardEquity,
        50 => Tilt::Balanced,
        _ => Tilt::TowardBonds,
    };
    let risk_level = if ratio_index <= 35.0 {
        RiskLevel::High
    } else if ratio_index <= 65.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    AssetAllocation {
        stock_pct,
        bond_pct: 100 - stock_pct,
        tilt,
        risk_level,
    }
}

/// One joined date with its spread and ratio index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioPoint {
    pub date: NaiveDate,
    pub bond_yield: f64,
    /// Earnings yield in percent (`100 / pe`).
    pub stock_yield: f64,
    pub spread: f64,
    pub ratio_index: f64,
    pub allocation: AssetAllocation,
}

/// Inner-join `pe` and `bond_yield` on date. Dates with a non-positive or
/// missing PE or a missing yield are dropped.
pub fn stock_bond_spread(pe: &TimeSeries, bond_yield: &TimeSeries) -> Vec<(NaiveDate, f64, f64)> {
    let mut out = Vec::new();
    let (a, b) = (pe.points(), bond_yield.points());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].timestamp.cmp(&b[j].timestamp) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let (pe, y) = (a[i].value, b[j].value);
                if pe.is_finite() && pe > 0.0 && y.is_finite() {
                    out.push((a[i].timestamp, y, 100.0 / pe));
                }
                i += 1;
                j += 1;
            }
        }
    }
    out
}

pub fn analyze_stock_bond(
    pe: &TimeSeries,
    bond_yield: &TimeSeries,
    engine: &PercentileWindowEngine,
) -> Result<Vec<RatioPoint>, DataError> {
    let joined = stock_bond_spread(pe, bond_yield);
    if joined.is_empty() {
        return Err(DataError::EmptySeries);
    }
    let spreads: Vec<f64> = joined.iter().map(|(_, y, s)| y - s).collect();
    let index = engine.compute_values(&spreads);

    Ok(joined
        .iter()
        .zip(spreads)
        .zip(index)
        .map(|((&(date, bond_yield, stock_yield), spread), ratio)| {
            let ratio_index = ratio.unwrap_or(0.0);
            RatioPoint {
                date,
                bond_yield,
                stock_yield,
                spread,
                ratio_index,
                allocation: allocation_for(ratio_index),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn ts(days: &[u32], values: &[f64]) -> TimeSeries {
        let dates: Vec<NaiveDate> = days.iter().map(|&x| d(x)).collect();
        TimeSeries::from_parts(&dates, values).unwrap()
    }

    #[test]
    fn band_edges() {
        assert_eq!(allocation_for(0.0).stock_pct, 100);
        assert_eq!(allocation_for(5.0).stock_pct, 100);
        assert_eq!(allocation_for(5.5).stock_pct, 90);
        assert_eq!(allocation_for(35.0).stock_pct, 80);
        assert_eq!(allocation_for(50.0).stock_pct, 50);
        assert_eq!(allocation_for(50.0).tilt, Tilt::Balanced);
        assert_eq!(allocation_for(85.0).bond_pct, 70);
        assert_eq!(allocation_for(95.0).stock_pct, 20);
        assert_eq!(allocation_for(100.0).stock_pct, 10);
    }

    #[test]
    fn risk_levels() {
        assert_eq!(allocation_for(35.0).risk_level, RiskLevel::High);
        assert_eq!(allocation_for(65.0).risk_level, RiskLevel::Medium);
        assert_eq!(allocation_for(65.1).risk_level, RiskLevel::Low);
    }

    #[test]
    fn inner_join_drops_unmatched_and_invalid() {
        let pe = ts(&[1, 2, 3, 5], &[10.0, 0.0, 20.0, 25.0]);
        let y = ts(&[1, 2, 3, 4], &[3.0, 3.0, 2.5, 2.0]);
        let joined = stock_bond_spread(&pe, &y);
        assert_eq!(joined, vec![(d(1), 3.0, 10.0), (d(3), 2.5, 5.0)]);
    }

    #[test]
    fn ratio_index_ranks_the_spread() {
        let pe = ts(&[1, 2, 3], &[10.0, 20.0, 50.0]);
        let y = ts(&[1, 2, 3], &[3.0, 3.0, 3.0]);
        let engine = PercentileWindowEngine::with_window(RATIO_LOOKBACK).unwrap();
        let points = analyze_stock_bond(&pe, &y, &engine).unwrap();
        // spreads: -7, -2, 1 → rising, so the last ranks at 100
        assert!((points[0].spread + 7.0).abs() < 1e-12);
        assert_eq!(points[0].ratio_index, 0.0);
        assert_eq!(points[2].ratio_index, 100.0);
        assert_eq!(points[2].allocation.stock_pct, 10);
    }

    #[test]
    fn no_overlap_is_an_error() {
        let pe = ts(&[1], &[10.0]);
        let y = ts(&[2], &[3.0]);
        let engine = PercentileWindowEngine::default();
        assert!(analyze_stock_bond(&pe, &y, &engine).is_err());
    }
}
