//! Price bar with attached indicator columns.

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// One OHLCV record plus precomputed indicator values for a single ticker.
///
/// Timestamps are strictly increasing per ticker. Indicator columns carry a
/// leading run of NaN while the lookback window fills; those values read as
/// absent
/// through [`Bar::indicator`].
#[derive(Debug, Clone)]
pub struct Bar {
    pub ticker: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub indicators: HashMap<String, f64>,
}

impl Bar {
    /// Look up an indicator value; NaN entries count as undefined.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied().filter(|v| !v.is_nan())
    }

    /// Whether the bar carries the column at all, defined or not.
    pub fn has_column(&self, name: &str) -> bool {
        self.indicators.contains_key(name)
    }
}
