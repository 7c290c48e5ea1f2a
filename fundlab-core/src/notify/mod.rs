//! Notification content and delivery.

pub mod bark;

use std::sync::Mutex;

use thiserror::Error;

use crate::drawdown::DrawdownReport;
use crate::engine::BacktestOutcome;
use crate::stock_bond::RatioPoint;

pub use bark::BarkSink;

/// A short push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notification endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("notification rejected with HTTP {0}")]
    Rejected(u16),

    #[error("network error: {0}")]
    Network(String),
}

/// Delivery channel for notifications.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push(notification.clone());
        Ok(())
    }
}

pub fn drawdown_notification(name: &str, report: &DrawdownReport) -> Notification {
    let s = &report.stats;
    Notification {
        title: format!("{name} drawdown analysis"),
        body: format!(
            "Current drawdown: {:.2}%\n\
             Drawdown percentile: {:.1}%\n\
             Max drawdown: {:.2}%\n\
             Mean drawdown: {:.2}%\n\
             \n\
             Suggestion: {}\n\
             Risk: {}\n\
             Reason: {}",
            report.current_depth,
            report.depth_percentile,
            s.max,
            s.mean,
            report.suggestion.label(),
            report.risk_level,
            report.suggestion.reason(),
        ),
    }
}

pub fn backtest_notification(symbol: &str, outcome: &BacktestOutcome) -> Notification {
    let strategy = outcome.strategy_return_pct();
    let fixed = outcome.benchmark.return_pct();
    Notification {
        title: format!("{symbol} timing backtest"),
        body: format!(
            "Invested: {:.0}\n\
             Final value: {:.0}\n\
             Strategy return: {strategy:.2}%\n\
             Fixed DCA return: {fixed:.2}%\n\
             Excess return: {:.2}%\n\
             Trades: {}",
            outcome.final_state.cash_invested_cumulative(),
            outcome.final_value(),
            strategy - fixed,
            outcome.trades.len(),
        ),
    }
}

pub fn stock_bond_notification(point: &RatioPoint) -> Notification {
    let a = &point.allocation;
    Notification {
        title: format!("Stock/bond ratio {}", point.date),
        body: format!(
            "Ratio index: {:.2}\n\
             Earnings yield: {:.2}%\n\
             Bond yield: {:.2}%\n\
             Spread: {:.2}\n\
             Allocation: {}% stock / {}% bond\n\
             Suggestion: {}\n\
             Risk: {}",
            point.ratio_index,
            point.stock_yield,
            point.bond_yield,
            point.spread,
            a.stock_pct,
            a.bond_pct,
            a.tilt,
            a.risk_level,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSeries;
    use crate::drawdown::analyze_drawdown;
    use chrono::NaiveDate;

    #[test]
    fn recording_sink_keeps_messages() {
        let sink = RecordingSink::new();
        let n = Notification {
            title: "t".into(),
            body: "b".into(),
        };
        sink.send(&n).unwrap();
        sink.send(&n).unwrap();
        assert_eq!(sink.sent().len(), 2);
        assert_eq!(sink.name(), "recording");
    }

    #[test]
    fn drawdown_body_mentions_suggestion() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..4).map(|i| start + chrono::Duration::days(i)).collect();
        let series = TimeSeries::from_parts(&dates, &[10.0, 9.0, 9.5, 7.0]).unwrap();
        let report = analyze_drawdown(&series, None).unwrap();
        let n = drawdown_notification("Fund 000001", &report);
        assert_eq!(n.title, "Fund 000001 drawdown analysis");
        assert!(n.body.contains("Current drawdown: 30.00%"));
        assert!(n.body.contains("Suggestion: strong buy"));
        assert!(n.body.contains("Risk: low"));
    }
}
