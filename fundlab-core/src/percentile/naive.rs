//! Reference backend: recount the window at every index.

use super::{RankBackend, WindowRank};

#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBackend;

impl RankBackend for NaiveBackend {
    fn name(&self) -> &str {
        "naive"
    }

    fn window_ranks(&self, values: &[f64], window: usize) -> Vec<Option<WindowRank>> {
        let mut out = Vec::with_capacity(values.len());
        for (i, &current) in values.iter().enumerate() {
            if current.is_nan() {
                out.push(None);
                continue;
            }
            let start = (i + 1).saturating_sub(window);
            let mut history = 0;
            let mut at_or_below = 0;
            for &v in values[start..=i].iter().filter(|v| !v.is_nan()) {
                history += 1;
                if v <= current {
                    at_or_below += 1;
                }
            }
            out.push(Some(WindowRank {
                at_or_below,
                history,
            }));
        }
        out
    }
}
