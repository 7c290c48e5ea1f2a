//! Decision-point schedule.

use chrono::{Datelike, NaiveDate};

/// Indices of the first record of every calendar month.
///
/// `dates` must be ascending.
pub fn decision_points(dates: &[NaiveDate]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut last_month: Option<(i32, u32)> = None;
    for (i, d) in dates.iter().enumerate() {
        let month = (d.year(), d.month());
        if last_month != Some(month) {
            out.push(i);
            last_month = Some(month);
        }
    }
    out
}
