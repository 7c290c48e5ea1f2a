//! Simple Moving Average (SMA).
//!
//! Lookback: period - 1. Any NaN inside the window makes the output NaN.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        // Running sum over finite values plus a count of NaNs in the window
        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for (i, &entering) in values.iter().enumerate() {
            if entering.is_nan() {
                nan_count += 1;
            } else {
                sum += entering;
            }
            if i >= self.period {
                let leaving = values[i - self.period];
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }
            if i + 1 >= self.period && nan_count == 0 {
                result[i] = sum / self.period as f64;
            }
        }
        result
    }
}
