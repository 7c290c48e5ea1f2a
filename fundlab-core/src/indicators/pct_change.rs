//! Fractional change over `periods` observations: `x[i] / x[i-periods] - 1`.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct PctChange {
    periods: usize,
    name: String,
}

impl PctChange {
    pub fn new(periods: usize) -> Self {
        assert!(periods >= 1, "pct_change periods must be >= 1");
        Self {
            periods,
            name: format!("pct_change_{periods}"),
        }
    }
}

impl Indicator for PctChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.periods
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i < self.periods {
                    return f64::NAN;
                }
                let base = values[i - self.periods];
                if base == 0.0 {
                    f64::NAN
                } else {
                    v / base - 1.0
                }
            })
            .collect()
    }
}
