#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use stratsig::domain::bar::Bar;
use stratsig::domain::error::StratsigError;
use stratsig::domain::signal::{Signal, SignalAction, SignalStrength};
use stratsig::domain::strategy::Strategy;
use stratsig::ports::data_port::DataPort;

pub fn base_ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(ticker: &str, timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        ticker: ticker.to_string(),
        timestamp,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
        indicators: HashMap::new(),
    }
}

/// One daily bar per close, starting at `base_ts`.
pub fn make_series(ticker: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(ticker, base_ts() + Duration::days(i as i64), close))
        .collect()
}

/// Attach trailing simple moving averages as indicator columns, NaN while
/// the lookback window is still filling.
pub fn with_sma(bars: &mut [Bar], column: &str, period: usize) {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    for (i, bar) in bars.iter_mut().enumerate() {
        let value = if i + 1 >= period {
            closes[i + 1 - period..=i].iter().sum::<f64>() / period as f64
        } else {
            f64::NAN
        };
        bar.indicators.insert(column.to_string(), value);
    }
}

pub fn with_constant(bars: &mut [Bar], column: &str, value: f64) {
    for bar in bars.iter_mut() {
        bar.indicators.insert(column.to_string(), value);
    }
}

pub fn make_signal(ticker: &str, action: SignalAction, timestamp: NaiveDateTime, price: f64) -> Signal {
    Signal {
        ticker: ticker.to_string(),
        action,
        strength: SignalStrength::Strong,
        reason: "scripted".to_string(),
        timestamp,
        price,
        metadata: HashMap::new(),
    }
}

/// Replays a fixed signal script regardless of the bars it sees.
pub struct ScriptedStrategy {
    pub script: Vec<Signal>,
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn generate_signals(&mut self, _bars: &[Bar]) -> Vec<Signal> {
        self.script.clone()
    }
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>, StratsigError> {
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| StratsigError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsigError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, StratsigError> {
        let bars = self.fetch_bars(ticker)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
