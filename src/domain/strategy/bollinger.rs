//! Bollinger Bands strategy with RSI filter.
//!
//! Two modes: mean reversion fades touches of the outer bands when RSI
//! confirms the extreme; breakout follows closes through the middle band
//! with RSI momentum.

use log::{error, info, warn};
use std::collections::HashMap;

use crate::domain::bar::Bar;
use crate::domain::signal::{Signal, SignalAction, SignalStrength};
use crate::domain::strategy::{check_columns, Strategy, StrategyState, DEFAULT_COOLDOWN_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerMode {
    MeanReversion,
    Breakout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerConfig {
    pub length: usize,
    pub num_std: f64,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub cooldown_minutes: i64,
    pub mode: BollingerMode,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        BollingerConfig {
            length: 20,
            num_std: 2.0,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            mode: BollingerMode::MeanReversion,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BollingerStrategy {
    config: BollingerConfig,
    name: String,
    state: StrategyState,
}

impl BollingerStrategy {
    pub fn new(config: BollingerConfig) -> Self {
        let name = format!(
            "BBands{}_{}std_RSI{}",
            config.length, config.num_std, config.rsi_period
        );
        BollingerStrategy {
            config,
            name,
            state: StrategyState::new(),
        }
    }

    pub fn config(&self) -> &BollingerConfig {
        &self.config
    }

    fn lower_col(&self) -> String {
        format!("bb_lower_{}", self.config.length)
    }

    fn middle_col(&self) -> String {
        format!("bb_middle_{}", self.config.length)
    }

    fn upper_col(&self) -> String {
        format!("bb_upper_{}", self.config.length)
    }

    fn rsi_col(&self) -> String {
        format!("rsi{}", self.config.rsi_period)
    }

    fn make_signal(
        &self,
        bar: &Bar,
        action: SignalAction,
        strength: SignalStrength,
        reason: String,
        lower: f64,
        middle: f64,
        upper: f64,
        bb_pct: f64,
        rsi: f64,
    ) -> Signal {
        Signal {
            ticker: bar.ticker.clone(),
            action,
            strength,
            reason,
            timestamp: bar.timestamp,
            price: bar.close,
            metadata: HashMap::from([
                ("bb_lower".to_string(), lower),
                ("bb_middle".to_string(), middle),
                ("bb_upper".to_string(), upper),
                ("bb_pct".to_string(), bb_pct),
                ("rsi".to_string(), rsi),
            ]),
        }
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signals(&mut self, bars: &[Bar]) -> Vec<Signal> {
        if bars.is_empty() {
            warn!("{}: empty bar series, no signals generated", self.name);
            return Vec::new();
        }

        let lower_col = self.lower_col();
        let middle_col = self.middle_col();
        let upper_col = self.upper_col();
        let rsi_col = self.rsi_col();
        let required = [
            lower_col.clone(),
            middle_col.clone(),
            upper_col.clone(),
            rsi_col.clone(),
        ];
        if let Err(e) = check_columns(bars, &required) {
            error!("{}: {}", self.name, e);
            return Vec::new();
        }

        if bars.len() < self.config.length {
            warn!(
                "{}: not enough bars ({}) for BBands{}",
                self.name,
                bars.len(),
                self.config.length
            );
            return Vec::new();
        }

        let mut signals = Vec::new();

        for i in 0..bars.len() {
            let bar = &bars[i];

            let (Some(lower), Some(middle), Some(upper), Some(rsi)) = (
                bar.indicator(&lower_col),
                bar.indicator(&middle_col),
                bar.indicator(&upper_col),
                bar.indicator(&rsi_col),
            ) else {
                continue;
            };

            if i < self.config.length {
                continue;
            }

            if !self
                .state
                .can_signal(&bar.ticker, bar.timestamp, self.config.cooldown_minutes)
            {
                continue;
            }

            let bb_pct = (bar.close - lower) / (upper - lower);

            let signal = match self.config.mode {
                BollingerMode::MeanReversion => {
                    if bar.close <= lower && rsi <= self.config.rsi_oversold {
                        let strength = if rsi < 20.0 {
                            SignalStrength::Strong
                        } else {
                            SignalStrength::Moderate
                        };
                        Some(self.make_signal(
                            bar,
                            SignalAction::Buy,
                            strength,
                            format!(
                                "Price at/below lower BBand ({bb_pct:.2}) with RSI={rsi:.1}"
                            ),
                            lower,
                            middle,
                            upper,
                            bb_pct,
                            rsi,
                        ))
                    } else if bar.close >= upper && rsi >= self.config.rsi_overbought {
                        let strength = if rsi > 80.0 {
                            SignalStrength::Strong
                        } else {
                            SignalStrength::Moderate
                        };
                        Some(self.make_signal(
                            bar,
                            SignalAction::Sell,
                            strength,
                            format!(
                                "Price at/above upper BBand ({bb_pct:.2}) with RSI={rsi:.1}"
                            ),
                            lower,
                            middle,
                            upper,
                            bb_pct,
                            rsi,
                        ))
                    } else {
                        None
                    }
                }
                BollingerMode::Breakout => {
                    if i == 0 {
                        continue;
                    }
                    let prev = &bars[i - 1];
                    let Some(prev_middle) = prev.indicator(&middle_col) else {
                        continue;
                    };

                    if prev.close < prev_middle
                        && bar.close > middle
                        && rsi > 50.0
                        && rsi < self.config.rsi_overbought
                    {
                        Some(self.make_signal(
                            bar,
                            SignalAction::Buy,
                            SignalStrength::Moderate,
                            format!("Upward breakout of middle BBand with RSI={rsi:.1}"),
                            lower,
                            middle,
                            upper,
                            bb_pct,
                            rsi,
                        ))
                    } else if prev.close > prev_middle
                        && bar.close < middle
                        && rsi < 50.0
                        && rsi > self.config.rsi_oversold
                    {
                        Some(self.make_signal(
                            bar,
                            SignalAction::Sell,
                            SignalStrength::Moderate,
                            format!("Downward breakout of middle BBand with RSI={rsi:.1}"),
                            lower,
                            middle,
                            upper,
                            bb_pct,
                            rsi,
                        ))
                    } else {
                        None
                    }
                }
            };

            if let Some(signal) = signal {
                self.state.record(&signal);
                info!(
                    "{}: {} {} at {}",
                    self.name, signal.action, bar.ticker, bar.timestamp
                );
                signals.push(signal);
            }
        }

        signals
    }
}
