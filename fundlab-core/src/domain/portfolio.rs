//! PortfolioState: invested capital, holdings, and the profit pool.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tolerance used by the state invariants (pool draws, share sells).
const EPSILON: f64 = 1e-9;

/// Accumulated state of a timing backtest.
///
/// Three quantities move independently:
/// - `cash_invested_cumulative`: new ("salary") capital contributed so far.
///   Pool-funded purchases never increase it.
/// - `shares_held`: units currently owned.
/// - `profit_pool`: proceeds of earlier sells, waiting to be re-invested.
///
/// Mutation is restricted to the allocation engine. Overselling or
/// over-drawing the pool is an invariant violation and panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    cash_invested_cumulative: f64,
    shares_held: f64,
    profit_pool: f64,
}

impl PortfolioState {
    /// Empty portfolio at the start of a backtest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from known values (replay, tests, what-if scenarios).
    pub fn from_parts(cash_invested_cumulative: f64, shares_held: f64, profit_pool: f64) -> Self {
        assert!(
            cash_invested_cumulative >= 0.0 && shares_held >= 0.0 && profit_pool >= 0.0,
            "portfolio components must be non-negative"
        );
        Self {
            cash_invested_cumulative,
            shares_held,
            profit_pool,
        }
    }

    pub fn cash_invested_cumulative(&self) -> f64 {
        self.cash_invested_cumulative
    }

    pub fn shares_held(&self) -> f64 {
        self.shares_held
    }

    pub fn profit_pool(&self) -> f64 {
        self.profit_pool
    }

    /// Market value of the holdings alone.
    pub fn stock_value(&self, price: f64) -> f64 {
        self.shares_held * price
    }

    /// Holdings plus the profit pool (uninvested cash is always zero here).
    pub fn total_value(&self, price: f64) -> f64 {
        self.stock_value(price) + self.profit_pool
    }

    /// Return on contributed capital; 0 until something has been invested.
    pub fn return_rate(&self, price: f64) -> f64 {
        if self.cash_invested_cumulative <= 0.0 {
            return 0.0;
        }
        (self.total_value(price) - self.cash_invested_cumulative) / self.cash_invested_cumulative
    }

    /// Sell a fraction of the holdings; proceeds go to the profit pool.
    ///
    /// Returns `(shares_sold, proceeds)`.
    pub(crate) fn sell_fraction(&mut self, fraction: f64, price: f64) -> (f64, f64) {
        assert!(
            fraction > 0.0 && fraction <= 1.0,
            "sell fraction must be in (0, 1], got {fraction}"
        );
        assert!(self.shares_held > 0.0, "cannot sell from an empty position");
        let shares = self.shares_held * fraction;
        let proceeds = shares * price;
        self.shares_held -= shares;
        self.profit_pool += proceeds;
        (shares, proceeds)
    }

    /// Withdraw capital from the profit pool for re-investment.
    pub(crate) fn draw_pool(&mut self, amount: f64) {
        assert!(
            amount <= self.profit_pool + EPSILON,
            "pool draw {amount} exceeds pool {}",
            self.profit_pool
        );
        self.profit_pool = (self.profit_pool - amount).max(0.0);
    }

    /// Convert `amount` into shares. Only `salary_used` counts as invested capital.
    ///
    /// Returns the number of shares bought.
    pub(crate) fn buy(&mut self, amount: f64, salary_used: f64, price: f64) -> f64 {
        assert!(price > 0.0, "buy requires a positive price");
        assert!(
            salary_used <= amount + EPSILON,
            "salary portion {salary_used} exceeds purchase amount {amount}"
        );
        let shares = amount / price;
        self.shares_held += shares;
        self.cash_invested_cumulative += salary_used;
        shares
    }

    /// Read-only view for reporting.
    pub fn snapshot(
        &self,
        date: NaiveDate,
        price: f64,
        price_percentile: Option<f64>,
        volume_percentile: Option<f64>,
    ) -> PortfolioSnapshot {
        PortfolioSnapshot {
            date,
            price,
            shares_held: self.shares_held,
            stock_value: self.stock_value(price),
            profit_pool: self.profit_pool,
            cash_invested_cumulative: self.cash_invested_cumulative,
            total_value: self.total_value(price),
            price_percentile,
            volume_percentile,
        }
    }
}

/// Per-record view of the portfolio, consumed by reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub price: f64,
    pub shares_held: f64,
    pub stock_value: f64,
    pub profit_pool: f64,
    pub cash_invested_cumulative: f64,
    pub total_value: f64,
    pub price_percentile: Option<f64>,
    pub volume_percentile: Option<f64>,
}
