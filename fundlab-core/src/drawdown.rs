//! Drawdown analysis and the buy-suggestion ladder.
//!
//! Depth is measured as a positive percentage below the running maximum
//! (0 at a new high). The current depth is ranked against the non-zero
//! depths of the analysed span: a higher percentile means a deeper, rarer
//! drawdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::DataError;
use crate::domain::TimeSeries;

/// `(running_max - value) / running_max * 100` for each value.
///
/// The running maximum includes the current value.
pub fn drawdown_depths(values: &[f64]) -> Vec<f64> {
    let mut running_max = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            running_max = running_max.max(v);
            if running_max > 0.0 {
                (running_max - v) / running_max * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStats {
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 with fewer than two points.
    pub std_dev: f64,
    pub q05: f64,
    pub q10: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    /// Share of points at a running high, in percent.
    pub zero_ratio_pct: f64,
    pub current: f64,
}

impl DrawdownStats {
    pub fn from_depths(depths: &[f64]) -> Self {
        let n = depths.len();
        let current = depths.last().copied().unwrap_or(0.0);
        if n == 0 {
            return Self {
                max: 0.0,
                mean: 0.0,
                std_dev: 0.0,
                q05: 0.0,
                q10: 0.0,
                q25: 0.0,
                q50: 0.0,
                q75: 0.0,
                zero_ratio_pct: 0.0,
                current,
            };
        }

        let max = depths.iter().copied().fold(0.0, f64::max);
        let mean = depths.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let var = depths.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };

        let mut non_zero: Vec<f64> = depths.iter().copied().filter(|d| *d > 0.0).collect();
        non_zero.sort_by(|a, b| a.total_cmp(b));
        let zeros = n - non_zero.len();

        Self {
            max,
            mean,
            std_dev,
            q05: quantile(&non_zero, 0.05),
            q10: quantile(&non_zero, 0.10),
            q25: quantile(&non_zero, 0.25),
            q50: quantile(&non_zero, 0.50),
            q75: quantile(&non_zero, 0.75),
            zero_ratio_pct: zeros as f64 / n as f64 * 100.0,
            current,
        }
    }
}

/// Share (in percent) of the non-zero depths that are `<=` the current depth.
pub fn depth_percentile(depths: &[f64]) -> f64 {
    let Some(&current) = depths.last() else {
        return 0.0;
    };
    let (count, at_or_below) = depths
        .iter()
        .filter(|d| **d > 0.0)
        .fold((0usize, 0usize), |(n, k), &d| {
            (n + 1, k + usize::from(d <= current))
        });
    if count == 0 {
        0.0
    } else {
        at_or_below as f64 / count as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    MediumLow,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::MediumLow => "medium-low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    StrongBuy,
    Buy,
    ConsiderBuy,
    Hold,
    Watch,
    AvoidBuying,
}

impl Suggestion {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 75.0 {
            Suggestion::StrongBuy
        } else if percentile >= 50.0 {
            Suggestion::Buy
        } else if percentile >= 30.0 {
            Suggestion::ConsiderBuy
        } else if percentile > 15.0 {
            Suggestion::Hold
        } else if percentile > 0.0 {
            Suggestion::Watch
        } else {
            Suggestion::AvoidBuying
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Suggestion::StrongBuy => "strong buy",
            Suggestion::Buy => "buy",
            Suggestion::ConsiderBuy => "consider buying",
            Suggestion::Hold => "hold",
            Suggestion::Watch => "watch",
            Suggestion::AvoidBuying => "avoid buying",
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Suggestion::StrongBuy => RiskLevel::Low,
            Suggestion::Buy => RiskLevel::MediumLow,
            Suggestion::ConsiderBuy | Suggestion::Hold | Suggestion::Watch => RiskLevel::Medium,
            Suggestion::AvoidBuying => RiskLevel::High,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Suggestion::StrongBuy => "current drawdown is among the deepest 25% of its history",
            Suggestion::Buy => "current drawdown is deeper than the historical median",
            Suggestion::ConsiderBuy => "current drawdown is moderately deep",
            Suggestion::Hold => "current drawdown is shallower than usual",
            Suggestion::Watch => "current drawdown is close to the recent high",
            Suggestion::AvoidBuying => "price is at its high, there is no drawdown",
        }
    }
}

/// Full drawdown report for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownReport {
    pub as_of: NaiveDate,
    pub observations: usize,
    pub current_depth: f64,
    pub depth_percentile: f64,
    pub stats: DrawdownStats,
    pub suggestion: Suggestion,
    pub risk_level: RiskLevel,
}

/// Analyse `series`, optionally restricted to its last `recent_days` points.
///
/// Non-finite and non-positive values are ignored.
pub fn analyze_drawdown(
    series: &TimeSeries,
    recent_days: Option<usize>,
) -> Result<DrawdownReport, DataError> {
    let span = match recent_days {
        Some(n) => series.tail(n),
        None => series.clone(),
    };
    let points: Vec<_> = span
        .points()
        .iter()
        .filter(|p| p.value.is_finite() && p.value > 0.0)
        .collect();
    let Some(last) = points.last() else {
        return Err(DataError::EmptySeries);
    };

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let depths = drawdown_depths(&values);
    let stats = DrawdownStats::from_depths(&depths);
    let percentile = depth_percentile(&depths);
    let suggestion = Suggestion::from_percentile(percentile);

    Ok(DrawdownReport {
        as_of: last.timestamp,
        observations: values.len(),
        current_depth: stats.current,
        depth_percentile: percentile,
        stats,
        suggestion,
        risk_level: suggestion.risk_level(),
    })
}
