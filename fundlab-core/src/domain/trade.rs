//! Trade: an append-only record of one allocation action.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signals::SignalVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
}

/// Which rule produced the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    /// Extreme sentiment with a large unrealized gain.
    AggressiveTakeProfit,
    /// Elevated sentiment with a bearish composite signal.
    SignalTakeProfit,
    /// The monthly contribution.
    ScheduledBuy,
}

impl TradeReason {
    pub fn label(&self) -> &'static str {
        match self {
            TradeReason::AggressiveTakeProfit => "aggressive_take_profit",
            TradeReason::SignalTakeProfit => "signal_take_profit",
            TradeReason::ScheduledBuy => "scheduled_buy",
        }
    }
}

/// Where the capital of a buy came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FundSource {
    Salary,
    ProfitPool,
    Mixed { pool: f64, salary: f64 },
}

impl fmt::Display for FundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundSource::Salary => write!(f, "salary"),
            FundSource::ProfitPool => write!(f, "profit_pool"),
            FundSource::Mixed { pool, salary } => write!(f, "pool {pool:.0} + salary {salary:.0}"),
        }
    }
}

/// One executed action at a decision point. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: NaiveDate,
    pub kind: TradeKind,
    pub reason: TradeReason,
    pub price: f64,
    pub quantity: f64,
    pub amount: f64,
    /// New capital used (buys only; zero for sells).
    pub salary_used: f64,
    pub signal_score: i32,
    pub signal_vector: SignalVector,
    /// Funding of a buy; `None` for sells.
    pub fund_source: Option<FundSource>,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.kind == TradeKind::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.kind == TradeKind::Sell
    }
}
