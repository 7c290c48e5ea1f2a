//! Allocation thresholds and amounts.

use serde::{Deserialize, Serialize};

use crate::config::{check_amount, check_fraction, check_threshold, ConfigError};

/// Every threshold and amount of the take-profit and buy ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationRules {
    // ── Take-profit ──────────────────────────────────────────────────
    /// Volume percentile above which an aggressive take-profit may fire.
    pub aggressive_sell_percentile: f64,
    /// Minimum return on invested capital for the aggressive sell.
    pub aggressive_min_return: f64,
    pub aggressive_sell_fraction: f64,
    /// Volume percentile above which a bearish composite signal sells.
    pub signal_sell_percentile: f64,
    /// Composite signal at or below which the signal sell fires.
    pub signal_sell_max_total: i32,
    pub signal_sell_fraction: f64,

    // ── Buy ladder (fractions of M) ──────────────────────────────────
    pub strong_buy_ratio: f64,
    pub buy_ratio: f64,
    pub neutral_ratio: f64,

    // ── Buy amounts ──────────────────────────────────────────────────
    /// Pool draw for a strong buy, used when the pool holds at least this much.
    pub strong_pool_draw: f64,
    pub strong_salary: f64,
    /// Pool balance that unlocks a pool-funded moderate buy.
    pub buy_pool_threshold: f64,
    /// Upper bound on the pool draw for a moderate buy.
    pub buy_pool_draw: f64,
    /// Salary added on top of the pool draw.
    pub buy_pool_salary: f64,
    pub buy_salary: f64,
    pub neutral_salary: f64,
    pub bearish_salary: f64,

    /// Contribution of the fixed dollar-cost-averaging benchmark.
    pub benchmark_amount: f64,
}

impl Default for AllocationRules {
    fn default() -> Self {
        Self {
            aggressive_sell_percentile: 98.0,
            aggressive_min_return: 0.30,
            aggressive_sell_fraction: 0.30,
            signal_sell_percentile: 90.0,
            signal_sell_max_total: -2,
            signal_sell_fraction: 0.20,
            strong_buy_ratio: 0.5,
            buy_ratio: 0.2,
            neutral_ratio: -0.2,
            strong_pool_draw: 15_000.0,
            strong_salary: 8_000.0,
            buy_pool_threshold: 8_000.0,
            buy_pool_draw: 8_000.0,
            buy_pool_salary: 5_000.0,
            buy_salary: 6_000.0,
            neutral_salary: 5_000.0,
            bearish_salary: 2_000.0,
            benchmark_amount: 5_000.0,
        }
    }
}

impl AllocationRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("aggressive_sell_percentile", self.aggressive_sell_percentile)?;
        check_threshold("signal_sell_percentile", self.signal_sell_percentile)?;
        check_fraction("aggressive_sell_fraction", self.aggressive_sell_fraction)?;
        check_fraction("signal_sell_fraction", self.signal_sell_fraction)?;
        if !self.aggressive_min_return.is_finite() {
            return Err(ConfigError::Invalid {
                name: "aggressive_min_return",
                reason: "must be finite".into(),
            });
        }

        for (name, value) in [
            ("strong_pool_draw", self.strong_pool_draw),
            ("strong_salary", self.strong_salary),
            ("buy_pool_threshold", self.buy_pool_threshold),
            ("buy_pool_draw", self.buy_pool_draw),
            ("buy_pool_salary", self.buy_pool_salary),
            ("buy_salary", self.buy_salary),
            ("neutral_salary", self.neutral_salary),
            ("bearish_salary", self.bearish_salary),
            ("benchmark_amount", self.benchmark_amount),
        ] {
            check_amount(name, value)?;
        }

        let ordered = self.neutral_ratio <= self.buy_ratio && self.buy_ratio <= self.strong_buy_ratio;
        if !ordered || !self.strong_buy_ratio.is_finite() || !self.neutral_ratio.is_finite() {
            return Err(ConfigError::Invalid {
                name: "buy ladder",
                reason: format!(
                    "ratios must satisfy neutral <= buy <= strong, got {} / {} / {}",
                    self.neutral_ratio, self.buy_ratio, self.strong_buy_ratio
                ),
            });
        }
        Ok(())
    }

    /// Place a composite signal on the buy ladder.
    ///
    /// With no active dimension (`max_magnitude == 0`) the signal is neutral.
    pub fn buy_tier(&self, total: i32, max_magnitude: i32) -> BuyTier {
        if max_magnitude <= 0 {
            return BuyTier::Neutral;
        }
        let m = max_magnitude as f64;
        let t = total as f64;
        if t >= self.strong_buy_ratio * m {
            BuyTier::Strong
        } else if t >= self.buy_ratio * m {
            BuyTier::Moderate
        } else if t >= self.neutral_ratio * m {
            BuyTier::Neutral
        } else {
            BuyTier::Bearish
        }
    }

    /// Funding for a buy in `tier` given the current pool balance.
    pub fn plan_buy(&self, tier: BuyTier, profit_pool: f64) -> BuyPlan {
        match tier {
            BuyTier::Strong if profit_pool >= self.strong_pool_draw => BuyPlan {
                pool_draw: self.strong_pool_draw,
                salary: 0.0,
            },
            BuyTier::Strong => BuyPlan::salary(self.strong_salary),
            BuyTier::Moderate if profit_pool >= self.buy_pool_threshold => BuyPlan {
                pool_draw: profit_pool.min(self.buy_pool_draw),
                salary: self.buy_pool_salary,
            },
            BuyTier::Moderate => BuyPlan::salary(self.buy_salary),
            BuyTier::Neutral => BuyPlan::salary(self.neutral_salary),
            BuyTier::Bearish => BuyPlan::salary(self.bearish_salary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyTier {
    Strong,
    Moderate,
    Neutral,
    Bearish,
}

/// Capital sources of one buy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyPlan {
    pub pool_draw: f64,
    pub salary: f64,
}

impl BuyPlan {
    fn salary(salary: f64) -> Self {
        Self {
            pool_draw: 0.0,
            salary,
        }
    }

    pub fn amount(&self) -> f64 {
        self.pool_draw + self.salary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AllocationRules::default().validate().is_ok());
    }

    #[test]
    fn bad_values_rejected() {
        let r = AllocationRules {
            signal_sell_percentile: 120.0,
            ..AllocationRules::default()
        };
        assert!(matches!(
            r.validate(),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));

        let r = AllocationRules {
            bearish_salary: -1.0,
            ..AllocationRules::default()
        };
        assert!(matches!(r.validate(), Err(ConfigError::NegativeAmount { .. })));

        let r = AllocationRules {
            aggressive_sell_fraction: 0.0,
            ..AllocationRules::default()
        };
        assert!(matches!(r.validate(), Err(ConfigError::InvalidFraction { .. })));

        let r = AllocationRules {
            buy_ratio: 0.9,
            ..AllocationRules::default()
        };
        assert!(matches!(r.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn ladder_boundaries_with_and_without_macro() {
        let r = AllocationRules::default();
        // M = 4: 2 is strong, 1 is moderate (0.8 <= 1 < 2), 0 neutral, -1 bearish
        assert_eq!(r.buy_tier(2, 4), BuyTier::Strong);
        assert_eq!(r.buy_tier(1, 4), BuyTier::Moderate);
        assert_eq!(r.buy_tier(0, 4), BuyTier::Neutral);
        assert_eq!(r.buy_tier(-1, 4), BuyTier::Bearish);
        // M = 8: boundaries at 4, 1.6, -1.6
        assert_eq!(r.buy_tier(4, 8), BuyTier::Strong);
        assert_eq!(r.buy_tier(3, 8), BuyTier::Moderate);
        assert_eq!(r.buy_tier(1, 8), BuyTier::Neutral);
        assert_eq!(r.buy_tier(-1, 8), BuyTier::Neutral);
        assert_eq!(r.buy_tier(-2, 8), BuyTier::Bearish);
        assert_eq!(r.buy_tier(3, 0), BuyTier::Neutral);
    }

    #[test]
    fn plans_follow_pool_balance() {
        let r = AllocationRules::default();
        assert_eq!(r.plan_buy(BuyTier::Strong, 20_000.0).pool_draw, 15_000.0);
        assert_eq!(r.plan_buy(BuyTier::Strong, 14_999.0).salary, 8_000.0);
        let p = r.plan_buy(BuyTier::Moderate, 8_000.0);
        assert_eq!((p.pool_draw, p.salary), (8_000.0, 5_000.0));
        let p = r.plan_buy(BuyTier::Moderate, 7_999.0);
        assert_eq!((p.pool_draw, p.salary), (0.0, 6_000.0));
        assert_eq!(r.plan_buy(BuyTier::Bearish, 1e9).amount(), 2_000.0);
    }
}
