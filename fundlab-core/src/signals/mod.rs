//! Discrete timing signals.
//!
//! Each decision point is described by a [`SignalVector`] with one
//! optional score per [`SignalDimension`]. Absent dimensions contribute
//! neither to the total nor to the attainable maximum.

pub mod macro_factors;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use macro_factors::{MacroFactors, MacroObservation};
pub use rules::{derive_signals, SignalInputs, SignalThresholds};

/// Largest absolute score a single technical dimension can take.
pub const TECHNICAL_MAGNITUDE: i32 = 1;

/// The macro dimension is clamped to this magnitude.
pub const MACRO_MAGNITUDE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDimension {
    Trend,
    Valuation,
    Sentiment,
    Momentum,
    Macro,
}

impl SignalDimension {
    pub const ALL: [SignalDimension; 5] = [
        SignalDimension::Trend,
        SignalDimension::Valuation,
        SignalDimension::Sentiment,
        SignalDimension::Momentum,
        SignalDimension::Macro,
    ];

    pub fn max_magnitude(&self) -> i32 {
        match self {
            SignalDimension::Macro => MACRO_MAGNITUDE,
            _ => TECHNICAL_MAGNITUDE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalDimension::Trend => "trend",
            SignalDimension::Valuation => "valuation",
            SignalDimension::Sentiment => "sentiment",
            SignalDimension::Momentum => "momentum",
            SignalDimension::Macro => "macro",
        }
    }
}

/// Per-dimension scores for one decision point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVector {
    pub trend: Option<i32>,
    pub valuation: Option<i32>,
    pub sentiment: Option<i32>,
    pub momentum: Option<i32>,
    #[serde(rename = "macro")]
    pub macro_factor: Option<i32>,
}

impl SignalVector {
    pub fn get(&self, dimension: SignalDimension) -> Option<i32> {
        match dimension {
            SignalDimension::Trend => self.trend,
            SignalDimension::Valuation => self.valuation,
            SignalDimension::Sentiment => self.sentiment,
            SignalDimension::Momentum => self.momentum,
            SignalDimension::Macro => self.macro_factor,
        }
    }

    /// Set one dimension, clamping the score to that dimension's range.
    pub fn set(&mut self, dimension: SignalDimension, score: Option<i32>) {
        let bound = dimension.max_magnitude();
        let score = score.map(|s| s.clamp(-bound, bound));
        match dimension {
            SignalDimension::Trend => self.trend = score,
            SignalDimension::Valuation => self.valuation = score,
            SignalDimension::Sentiment => self.sentiment = score,
            SignalDimension::Momentum => self.momentum = score,
            SignalDimension::Macro => self.macro_factor = score,
        }
    }

    pub fn with(mut self, dimension: SignalDimension, score: i32) -> Self {
        self.set(dimension, Some(score));
        self
    }

    pub fn active_dimensions(&self) -> impl Iterator<Item = SignalDimension> + '_ {
        SignalDimension::ALL
            .into_iter()
            .filter(move |d| self.get(*d).is_some())
    }

    /// Sum of the present scores.
    pub fn total(&self) -> i32 {
        SignalDimension::ALL
            .iter()
            .filter_map(|d| self.get(*d))
            .sum()
    }

    /// `M`: the largest total attainable with the present dimensions.
    pub fn max_magnitude(&self) -> i32 {
        self.active_dimensions().map(|d| d.max_magnitude()).sum()
    }
}

impl fmt::Display for SignalVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for d in self.active_dimensions() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}={:+}", d.label(), self.get(d).unwrap_or_default())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn technical(t: i32, v: i32, s: i32, m: i32) -> SignalVector {
        SignalVector::default()
            .with(SignalDimension::Trend, t)
            .with(SignalDimension::Valuation, v)
            .with(SignalDimension::Sentiment, s)
            .with(SignalDimension::Momentum, m)
    }

    #[test]
    fn magnitude_without_macro_is_four() {
        let v = technical(1, 1, 0, -1);
        assert_eq!(v.total(), 1);
        assert_eq!(v.max_magnitude(), 4);
    }

    #[test]
    fn magnitude_with_macro_is_eight() {
        let v = technical(1, 1, 1, 1).with(SignalDimension::Macro, 4);
        assert_eq!(v.total(), 8);
        assert_eq!(v.max_magnitude(), 8);
    }

    #[test]
    fn macro_score_is_clamped() {
        let v = SignalVector::default().with(SignalDimension::Macro, -7);
        assert_eq!(v.macro_factor, Some(-4));
        let v = SignalVector::default().with(SignalDimension::Trend, 3);
        assert_eq!(v.trend, Some(1));
    }

    #[test]
    fn missing_dimension_shrinks_magnitude() {
        let mut v = technical(1, 0, 0, 0);
        v.set(SignalDimension::Sentiment, None);
        assert_eq!(v.max_magnitude(), 3);
        assert_eq!(v.active_dimensions().count(), 3);
    }

    #[test]
    fn display_lists_present_dimensions() {
        let v = technical(1, -1, 0, 1);
        assert_eq!(v.to_string(), "trend=+1 valuation=-1 sentiment=+0 momentum=+1");
    }

    #[test]
    fn serde_uses_macro_key() {
        let v = SignalVector::default().with(SignalDimension::Macro, 2);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"macro\":2"));
        let back: SignalVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
