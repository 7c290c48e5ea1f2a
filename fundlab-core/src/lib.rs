//! FundLab Core: percentile engine, signals, allocation, and analysis.
//!
//! This crate contains the pure computations of the fund-timing toolkit:
//! - Domain types (market records, time series, portfolio state, trades)
//! - Rolling-window percentile engine with naive and order-statistic backends
//! - Moving-average indicators and discrete signal derivation (incl. macro)
//! - Signal allocation: take-profit rules, buy ladder, profit pool
//! - Monthly timing backtest against a fixed dollar-cost-averaging benchmark
//! - Drawdown and stock/bond ratio analysis
//! - Notification content and sinks, data providers and the JSON cache

pub mod allocation;
pub mod config;
pub mod data;
pub mod domain;
pub mod drawdown;
pub mod engine;
pub mod indicators;
pub mod notify;
pub mod percentile;
pub mod signals;
pub mod stock_bond;
