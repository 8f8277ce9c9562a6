//! Core domain types and logic.

pub mod bar;
pub mod signal;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod sweep;
pub mod error;
