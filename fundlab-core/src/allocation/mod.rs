//! Signal allocation: one pure state transition per decision point.
//!
//! ```text
//! (rules, state, input) → step → (state', trades)
//! ```
//!
//! Order inside a step:
//! 1. return rate on invested capital (before any sell)
//! 2. at most one take-profit sell, proceeds into the profit pool
//! 3. exactly one buy from the ladder, funded by pool and/or salary

pub mod rules;

use chrono::NaiveDate;

use crate::domain::{FundSource, PortfolioState, Trade, TradeKind, TradeReason};
use crate::signals::SignalVector;

pub use rules::{AllocationRules, BuyPlan, BuyTier};

/// Market view at one decision point.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionInput {
    pub date: NaiveDate,
    pub price: f64,
    pub signals: SignalVector,
    /// Percentile of traded amount; drives take-profit.
    pub volume_percentile: Option<f64>,
}

/// Why a decision point produced no action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    InvalidPrice(f64),
}

/// Result of one step.
#[derive(Debug, Clone)]
pub struct Decision {
    pub state: PortfolioState,
    pub trades: Vec<Trade>,
    pub skipped: Option<SkipReason>,
}

/// Apply the take-profit rules and the buy ladder to `state`.
///
/// A non-positive or non-finite price leaves the state untouched.
pub fn step(rules: &AllocationRules, state: PortfolioState, input: &DecisionInput) -> Decision {
    let price = input.price;
    if !(price.is_finite() && price > 0.0) {
        return Decision {
            state,
            trades: Vec::new(),
            skipped: Some(SkipReason::InvalidPrice(price)),
        };
    }

    let mut state = state;
    let mut trades = Vec::with_capacity(2);
    let total = input.signals.total();
    let return_rate = state.return_rate(price);

    if let Some((reason, fraction)) = sell_rule(rules, &state, input, total, return_rate) {
        let (shares, proceeds) = state.sell_fraction(fraction, price);
        trades.push(Trade {
            timestamp: input.date,
            kind: TradeKind::Sell,
            reason,
            price,
            quantity: shares,
            amount: proceeds,
            salary_used: 0.0,
            signal_score: total,
            signal_vector: input.signals,
            fund_source: None,
        });
    }

    let tier = rules.buy_tier(total, input.signals.max_magnitude());
    let plan = rules.plan_buy(tier, state.profit_pool());
    if plan.amount() > 0.0 {
        if plan.pool_draw > 0.0 {
            state.draw_pool(plan.pool_draw);
        }
        let shares = state.buy(plan.amount(), plan.salary, price);
        trades.push(Trade {
            timestamp: input.date,
            kind: TradeKind::Buy,
            reason: TradeReason::ScheduledBuy,
            price,
            quantity: shares,
            amount: plan.amount(),
            salary_used: plan.salary,
            signal_score: total,
            signal_vector: input.signals,
            fund_source: Some(fund_source(&plan)),
        });
    }

    Decision {
        state,
        trades,
        skipped: None,
    }
}

fn sell_rule(
    rules: &AllocationRules,
    state: &PortfolioState,
    input: &DecisionInput,
    total: i32,
    return_rate: f64,
) -> Option<(TradeReason, f64)> {
    let volume = input.volume_percentile?;
    if state.shares_held() <= 0.0 {
        return None;
    }
    if volume > rules.aggressive_sell_percentile && return_rate > rules.aggressive_min_return {
        Some((
            TradeReason::AggressiveTakeProfit,
            rules.aggressive_sell_fraction,
        ))
    } else if volume > rules.signal_sell_percentile && total <= rules.signal_sell_max_total {
        Some((TradeReason::SignalTakeProfit, rules.signal_sell_fraction))
    } else {
        None
    }
}

fn fund_source(plan: &BuyPlan) -> FundSource {
    match (plan.pool_draw > 0.0, plan.salary > 0.0) {
        (true, true) => FundSource::Mixed {
            pool: plan.pool_draw,
            salary: plan.salary,
        },
        (true, false) => FundSource::ProfitPool,
        _ => FundSource::Salary,
    }
}
