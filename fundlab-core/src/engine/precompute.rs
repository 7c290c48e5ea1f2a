//! Feature precomputation.
//!
//! Every per-record input of the fold is computed once, before the fold
//! starts. Index `i` of every feature depends only on records `0..=i`.

use chrono::NaiveDate;

use super::state::StrategyConfig;
use crate::config::ConfigError;
use crate::domain::MarketRecord;
use crate::indicators::MovingAverages;
use crate::percentile::PercentileWindowEngine;
use crate::signals::macro_factors::{align_to_dates, compute_macro_factors};
use crate::signals::{MacroFactors, MacroObservation};

/// Aligned per-record features.
#[derive(Debug, Clone)]
pub struct Features {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub moving_averages: MovingAverages,
    pub price_percentile: Vec<Option<f64>>,
    pub volume_percentile: Vec<Option<f64>>,
    /// Empty slots when no macro data covers the date.
    pub macro_factors: Vec<Option<MacroFactors>>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

pub fn precompute_features(
    records: &[MarketRecord],
    macro_observations: &[MacroObservation],
    config: &StrategyConfig,
) -> Result<Features, ConfigError> {
    let engine = PercentileWindowEngine::new(config.percentile_window, config.backend)?;
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();

    let moving_averages =
        MovingAverages::compute(&closes, config.ma_short, config.ma_medium, config.ma_long);

    // Price and amount ranks are independent dimensions.
    let mut ranked = engine.compute_many(&[closes.as_slice(), amounts.as_slice()]).into_iter();
    let price_percentile = ranked.next().unwrap_or_default();
    let volume_percentile = ranked.next().unwrap_or_default();

    let macro_factors = if macro_observations.is_empty() {
        vec![None; records.len()]
    } else {
        let scored = compute_macro_factors(macro_observations, &engine);
        align_to_dates(&scored, &dates)
    };

    Ok(Features {
        dates,
        closes,
        moving_averages,
        price_percentile,
        volume_percentile,
        macro_factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<MarketRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                MarketRecord::close_amount(
                    start + chrono::Duration::days(i as i64),
                    100.0 + i as f64,
                    1_000.0,
                )
            })
            .collect()
    }

    #[test]
    fn features_are_aligned() {
        let config = StrategyConfig {
            ma_short: 2,
            ma_medium: 3,
            ma_long: 5,
            ..StrategyConfig::default()
        };
        let f = precompute_features(&records(10), &[], &config).unwrap();
        assert_eq!(f.len(), 10);
        assert_eq!(f.price_percentile.len(), 10);
        assert_eq!(f.volume_percentile.len(), 10);
        assert!(f.moving_averages.long[3].is_nan());
        assert!(!f.moving_averages.long[4].is_nan());
        // strictly increasing closes rank at the top
        assert_eq!(f.price_percentile[9], Some(100.0));
        // constant amounts tie with everything
        assert_eq!(f.volume_percentile[9], Some(100.0));
        assert!(f.macro_factors.iter().all(Option::is_none));
    }
}
