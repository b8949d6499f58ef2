//! Core domain types and logic.

pub mod ohlcv;
pub mod history;
pub mod feature;
pub mod signal;
pub mod sizer;
pub mod strategy;
pub mod execution;
pub mod account;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
