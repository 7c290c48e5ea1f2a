//! Order-statistic backend.
//!
//! Values are coordinate-compressed once, then a Fenwick tree holds the
//! multiset of the current window. Each step is one insert, at most one
//! removal and one prefix query, so a full pass costs O(n log n) instead
//! of O(n·W).

use super::{RankBackend, WindowRank};

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStatisticBackend;

impl RankBackend for OrderStatisticBackend {
    fn name(&self) -> &str {
        "order_statistic"
    }

    fn window_ranks(&self, values: &[f64], window: usize) -> Vec<Option<WindowRank>> {
        let levels = CompressedLevels::new(values);
        let mut tree = Fenwick::new(levels.len());
        let mut history = 0usize;
        let mut out = Vec::with_capacity(values.len());

        for (i, &current) in values.iter().enumerate() {
            if !current.is_nan() {
                tree.add(levels.index_of(current), 1);
                history += 1;
            }
            if i >= window {
                let leaving = values[i - window];
                if !leaving.is_nan() {
                    tree.add(levels.index_of(leaving), -1);
                    history -= 1;
                }
            }

            if current.is_nan() {
                out.push(None);
            } else {
                out.push(Some(WindowRank {
                    at_or_below: tree.prefix_sum(levels.index_of(current)),
                    history,
                }));
            }
        }
        out
    }
}

/// Sorted distinct non-NaN values. `-0.0` and `0.0` share a level.
struct CompressedLevels(Vec<f64>);

impl CompressedLevels {
    fn new(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.dedup_by(|a, b| a == b);
        Self(sorted)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    /// Zero-based level of a value that was present at construction.
    fn index_of(&self, value: f64) -> usize {
        self.0.partition_point(|&x| x < value)
    }
}

/// Binary indexed tree of counts.
struct Fenwick {
    tree: Vec<i64>,
}

impl Fenwick {
    fn new(len: usize) -> Self {
        Self {
            tree: vec![0; len + 1],
        }
    }

    fn add(&mut self, index: usize, delta: i64) {
        let mut i = index + 1;
        while i < self.tree.len() {
            self.tree[i] += delta;
            i += i & i.wrapping_neg();
        }
    }

    /// Sum of counts at levels `0..=index`.
    fn prefix_sum(&self, index: usize) -> usize {
        let mut i = index + 1;
        let mut sum = 0i64;
        while i > 0 {
            sum += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        debug_assert!(sum >= 0);
        sum as usize
    }
}
