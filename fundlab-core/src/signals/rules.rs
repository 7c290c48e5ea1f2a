//! Technical signal derivation from price, moving averages and percentiles.

use serde::{Deserialize, Serialize};

use super::{SignalDimension, SignalVector};
use crate::config::{check_threshold, ConfigError};

/// Percentile cut-offs for the valuation and sentiment dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Price percentile below which valuation is bullish.
    pub valuation_buy_below: f64,
    /// Price percentile above which valuation is bearish.
    pub valuation_sell_above: f64,
    /// Amount percentile below which sentiment is bullish (quiet market).
    pub sentiment_buy_below: f64,
    /// Amount percentile above which sentiment is bearish (overheated).
    pub sentiment_sell_above: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            valuation_buy_below: 30.0,
            valuation_sell_above: 80.0,
            sentiment_buy_below: 20.0,
            sentiment_sell_above: 95.0,
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("valuation_buy_below", self.valuation_buy_below)?;
        check_threshold("valuation_sell_above", self.valuation_sell_above)?;
        check_threshold("sentiment_buy_below", self.sentiment_buy_below)?;
        check_threshold("sentiment_sell_above", self.sentiment_sell_above)?;
        if self.valuation_buy_below > self.valuation_sell_above {
            return Err(ConfigError::Invalid {
                name: "valuation thresholds",
                reason: "buy cut-off is above sell cut-off".into(),
            });
        }
        if self.sentiment_buy_below > self.sentiment_sell_above {
            return Err(ConfigError::Invalid {
                name: "sentiment thresholds",
                reason: "buy cut-off is above sell cut-off".into(),
            });
        }
        Ok(())
    }
}

/// Everything the technical rules read at one decision point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInputs {
    pub price: f64,
    pub ma_short: f64,
    pub ma_medium: f64,
    pub ma_long: f64,
    pub price_percentile: Option<f64>,
    pub volume_percentile: Option<f64>,
}

/// Score the four technical dimensions and attach the macro score.
///
/// A dimension whose input is missing stays `None`.
pub fn derive_signals(
    thresholds: &SignalThresholds,
    inputs: &SignalInputs,
    macro_score: Option<i32>,
) -> SignalVector {
    let mut v = SignalVector::default();

    if !inputs.ma_long.is_nan() {
        let trend = if inputs.price > inputs.ma_long { 1 } else { -1 };
        v.set(SignalDimension::Trend, Some(trend));
    }

    v.set(
        SignalDimension::Valuation,
        inputs.price_percentile.map(|p| {
            band(
                p,
                thresholds.valuation_buy_below,
                thresholds.valuation_sell_above,
            )
        }),
    );

    v.set(
        SignalDimension::Sentiment,
        inputs.volume_percentile.map(|p| {
            band(
                p,
                thresholds.sentiment_buy_below,
                thresholds.sentiment_sell_above,
            )
        }),
    );

    let (p, short, medium) = (inputs.price, inputs.ma_short, inputs.ma_medium);
    let momentum = if p > short && short > medium {
        1
    } else if p < short && short < medium {
        -1
    } else {
        0
    };
    v.set(SignalDimension::Momentum, Some(momentum));

    v.set(SignalDimension::Macro, macro_score);
    v
}

fn band(percentile: f64, buy_below: f64, sell_above: f64) -> i32 {
    if percentile < buy_below {
        1
    } else if percentile > sell_above {
        -1
    } else {
        0
    }
}
