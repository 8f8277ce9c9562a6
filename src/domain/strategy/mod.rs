//! Strategy interface and per-ticker cooldown state.
//!
//! # Soft-failure contract
//!
//! `generate_signals` never aborts the caller: an empty bar series, missing
//! required indicator columns, or fewer bars than the minimum lookback are
//! logged and produce an empty sequence. Individual bars with undefined
//! indicator values are skipped without mutating state.

pub mod ma_crossover;
pub mod bollinger;
pub mod macd_stoch;

pub use bollinger::{BollingerConfig, BollingerMode, BollingerStrategy};
pub use ma_crossover::{MaCrossoverConfig, MaCrossoverStrategy};
pub use macd_stoch::{MacdStochConfig, MacdStochStrategy};

use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::domain::bar::Bar;
use crate::domain::error::StrategyError;
use crate::domain::signal::Signal;

/// Default minimum spacing between consecutive signals for one ticker.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;

pub trait Strategy {
    fn name(&self) -> &str;

    /// Generate signals over a bar series sorted ascending by timestamp.
    fn generate_signals(&mut self, bars: &[Bar]) -> Vec<Signal>;
}

/// Last-emitted signal per ticker, owned by a single strategy instance.
///
/// The `&mut self` emission path means the borrow checker enforces the
/// one-instance-per-concurrent-context rule; the map is never shared.
#[derive(Debug, Clone, Default)]
pub struct StrategyState {
    last_signals: HashMap<String, Signal>,
}

impl StrategyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure query: true iff no prior signal exists for the ticker, or at
    /// least `cooldown_minutes` whole minutes have elapsed since it.
    pub fn can_signal(
        &self,
        ticker: &str,
        timestamp: NaiveDateTime,
        cooldown_minutes: i64,
    ) -> bool {
        match self.last_signals.get(ticker) {
            None => true,
            Some(last) => (timestamp - last.timestamp).num_minutes() >= cooldown_minutes,
        }
    }

    pub fn last_signal(&self, ticker: &str) -> Option<&Signal> {
        self.last_signals.get(ticker)
    }

    /// Record an emitted signal. Every emission updates the state.
    pub fn record(&mut self, signal: &Signal) {
        self.last_signals
            .insert(signal.ticker.clone(), signal.clone());
    }
}

/// Check that every required column is carried by at least one bar.
///
/// An indicator whose leading lookback run is still NaN counts as present;
/// only a column absent from the whole series is a configuration failure.
pub(crate) fn check_columns(bars: &[Bar], required: &[String]) -> Result<(), StrategyError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !bars.iter().any(|bar| bar.has_column(col)))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StrategyError::MissingColumns { columns: missing })
    }
}
