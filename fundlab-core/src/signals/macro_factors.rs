//! Macro-economic factor scores.
//!
//! Four sub-factors, each in `[-2, 2]`:
//! - interest rate: percentile of the 10y bond yield (low rates bullish)
//! - money policy: M1/M2 year-over-year growth
//! - economic: PMI
//! - global: 20-period % change of the USD index (weak dollar bullish)
//!
//! Observations arrive on their own calendar (monthly for M1/M2/PMI, daily
//! for yields). The yield rank and the USD change are computed over each
//! series' own observation dates, so carried values never enter a window.
//! Everything is then forward-filled on an outer-joined date axis, scored,
//! and joined onto the market dates by forward fill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MACRO_MAGNITUDE;
use crate::config::ConfigError;
use crate::indicators::{Indicator, PctChange};
use crate::percentile::{PercentileWindowEngine, WindowRank};

/// The yield percentile needs more than this many historical points.
pub const MIN_RATE_HISTORY: usize = 10;

/// Lookback for the USD index change.
pub const USD_CHANGE_PERIODS: usize = 20;

/// One dated row of macro data. Missing fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroObservation {
    pub date: NaiveDate,
    pub bond_yield_10y: Option<f64>,
    pub m1_growth: Option<f64>,
    pub m2_growth: Option<f64>,
    pub pmi: Option<f64>,
    pub usd_index: Option<f64>,
}

/// Sub-factor scores for one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroFactors {
    pub interest_rate: i32,
    pub money_policy: i32,
    pub economic: i32,
    pub global: i32,
}

impl MacroFactors {
    /// Raw sum, in `[-8, 8]`.
    pub fn total(&self) -> i32 {
        self.interest_rate + self.money_policy + self.economic + self.global
    }

    /// The score carried by the Macro signal dimension.
    pub fn dimension_score(&self) -> i32 {
        self.total().clamp(-MACRO_MAGNITUDE, MACRO_MAGNITUDE)
    }
}

pub fn score_interest_rate(rank: Option<WindowRank>) -> i32 {
    let Some(rank) = rank else { return 0 };
    if rank.history <= MIN_RATE_HISTORY {
        return 0;
    }
    let p = 100.0 * rank.at_or_below as f64 / rank.history as f64;
    if p < 20.0 {
        2
    } else if p < 40.0 {
        1
    } else if p > 90.0 {
        -2
    } else if p > 80.0 {
        -1
    } else {
        0
    }
}

/// Both growth rates are required.
pub fn score_money_policy(m1_growth: Option<f64>, m2_growth: Option<f64>) -> i32 {
    let (Some(m1), Some(m2)) = (m1_growth, m2_growth) else {
        return 0;
    };
    if m1.is_nan() || m2.is_nan() {
        0
    } else if m1 > 20.0 || m2 > 15.0 {
        2
    } else if m1 > 15.0 || m2 > 12.0 {
        1
    } else if m1 < 2.0 || m2 < 3.0 {
        -2
    } else if m1 < 5.0 || m2 < 6.0 {
        -1
    } else {
        0
    }
}

pub fn score_pmi(pmi: Option<f64>) -> i32 {
    match pmi {
        Some(p) if p > 52.0 => 2,
        Some(p) if p > 50.0 => 1,
        Some(p) if p < 45.0 => -2,
        Some(p) if p < 48.0 => -1,
        _ => 0,
    }
}

/// `change_pct` in percent (e.g., -3.5 for a 3.5% drop).
pub fn score_usd_change(change_pct: Option<f64>) -> i32 {
    match change_pct {
        Some(c) if c < -3.0 => 2,
        Some(c) if c < -1.0 => 1,
        Some(c) if c > 3.0 => -2,
        Some(c) if c > 1.0 => -1,
        _ => 0,
    }
}

/// Forward-fill every field in date order. Input need not be sorted;
/// rows sharing a date are merged.
pub fn forward_fill(observations: &[MacroObservation]) -> Vec<MacroObservation> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|o| o.date);

    let mut out: Vec<MacroObservation> = Vec::with_capacity(sorted.len());
    for obs in sorted {
        let carried = match out.last() {
            Some(prev) if prev.date == obs.date => {
                let merged = merge(prev, &obs);
                out.pop();
                merged
            }
            Some(prev) => merge(prev, &obs),
            None => obs,
        };
        out.push(carried);
    }
    out
}

fn merge(prev: &MacroObservation, next: &MacroObservation) -> MacroObservation {
    MacroObservation {
        date: next.date,
        bond_yield_10y: next.bond_yield_10y.or(prev.bond_yield_10y),
        m1_growth: next.m1_growth.or(prev.m1_growth),
        m2_growth: next.m2_growth.or(prev.m2_growth),
        pmi: next.pmi.or(prev.pmi),
        usd_index: next.usd_index.or(prev.usd_index),
    }
}

/// One field on its own calendar, in date order. Rows without a value are
/// dropped; a repeated date keeps its last value.
fn own_calendar(
    observations: &[MacroObservation],
    field: impl Fn(&MacroObservation) -> Option<f64>,
) -> (Vec<NaiveDate>, Vec<f64>) {
    let mut rows: Vec<(NaiveDate, f64)> = observations
        .iter()
        .filter_map(|o| field(o).filter(|v| !v.is_nan()).map(|v| (o.date, v)))
        .collect();
    rows.sort_by_key(|(date, _)| *date);

    let mut dates: Vec<NaiveDate> = Vec::with_capacity(rows.len());
    let mut values: Vec<f64> = Vec::with_capacity(rows.len());
    for (date, value) in rows {
        if dates.last() == Some(&date) {
            values.pop();
            dates.pop();
        }
        dates.push(date);
        values.push(value);
    }
    (dates, values)
}

/// Carry `values` (indexed like `dates`) forward onto `onto` (ascending).
fn carry_forward<T: Copy>(
    dates: &[NaiveDate],
    values: &[T],
    onto: &[MacroObservation],
) -> Vec<Option<T>> {
    let mut cursor = 0;
    let mut current = None;
    onto.iter()
        .map(|o| {
            while cursor < dates.len() && dates[cursor] <= o.date {
                current = Some(values[cursor]);
                cursor += 1;
            }
            current
        })
        .collect()
}

/// Score every (forward-filled) observation date.
pub fn compute_macro_factors(
    observations: &[MacroObservation],
    engine: &PercentileWindowEngine,
) -> Vec<(NaiveDate, MacroFactors)> {
    let filled = forward_fill(observations);

    let (yield_dates, yields) = own_calendar(observations, |o| o.bond_yield_10y);
    let rate_ranks = carry_forward(&yield_dates, &engine.window_ranks(&yields), &filled);

    let (usd_dates, usd) = own_calendar(observations, |o| o.usd_index);
    let usd_change = carry_forward(
        &usd_dates,
        &PctChange::new(USD_CHANGE_PERIODS).compute(&usd),
        &filled,
    );

    filled
        .iter()
        .zip(rate_ranks)
        .zip(usd_change)
        .map(|((obs, rank), change)| {
            let change_pct = change.filter(|c| !c.is_nan()).map(|c| c * 100.0);
            let rank = rank.flatten();
            let factors = MacroFactors {
                interest_rate: score_interest_rate(rank),
                money_policy: score_money_policy(obs.m1_growth, obs.m2_growth),
                economic: score_pmi(obs.pmi),
                global: score_usd_change(change_pct),
            };
            (obs.date, factors)
        })
        .collect()
}

/// Join scored dates onto `dates` (ascending) by forward fill. Dates before
/// the first scored date get `None`.
pub fn align_to_dates(
    scored: &[(NaiveDate, MacroFactors)],
    dates: &[NaiveDate],
) -> Vec<Option<MacroFactors>> {
    let mut out = Vec::with_capacity(dates.len());
    let mut cursor = 0;
    let mut current = None;
    for date in dates {
        while cursor < scored.len() && scored[cursor].0 <= *date {
            current = Some(scored[cursor].1);
            cursor += 1;
        }
        out.push(current);
    }
    out
}

/// Convenience: score and align in one call, building the engine from a window.
pub fn macro_scores_for(
    observations: &[MacroObservation],
    dates: &[NaiveDate],
    window: usize,
) -> Result<Vec<Option<MacroFactors>>, ConfigError> {
    let engine = PercentileWindowEngine::with_window(window)?;
    let scored = compute_macro_factors(observations, &engine);
    Ok(align_to_dates(&scored, dates))
}
