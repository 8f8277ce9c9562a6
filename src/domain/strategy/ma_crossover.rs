//! Moving-average crossover strategy with RSI filter.
//!
//! BUY on a golden cross (fast MA crosses strictly above slow MA), SELL on a
//! death cross, both filtered by RSI to avoid buying overbought or selling
//! oversold.

use log::{error, info, warn};
use std::collections::HashMap;

use crate::domain::bar::Bar;
use crate::domain::signal::{Signal, SignalAction, SignalStrength};
use crate::domain::strategy::{check_columns, Strategy, StrategyState, DEFAULT_COOLDOWN_MINUTES};

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub cooldown_minutes: i64,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        MaCrossoverConfig {
            fast_period: 50,
            slow_period: 200,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossoverStrategy {
    config: MaCrossoverConfig,
    name: String,
    state: StrategyState,
}

impl MaCrossoverStrategy {
    pub fn new(config: MaCrossoverConfig) -> Self {
        let name = format!(
            "MA{}-{}_RSI{}",
            config.fast_period, config.slow_period, config.rsi_period
        );
        MaCrossoverStrategy {
            config,
            name,
            state: StrategyState::new(),
        }
    }

    pub fn config(&self) -> &MaCrossoverConfig {
        &self.config
    }

    fn fast_col(&self) -> String {
        format!("ma{}", self.config.fast_period)
    }

    fn slow_col(&self) -> String {
        format!("ma{}", self.config.slow_period)
    }

    fn rsi_col(&self) -> String {
        format!("rsi{}", self.config.rsi_period)
    }
}

impl Strategy for MaCrossoverStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signals(&mut self, bars: &[Bar]) -> Vec<Signal> {
        if bars.is_empty() {
            warn!("{}: empty bar series, no signals generated", self.name);
            return Vec::new();
        }

        let fast_col = self.fast_col();
        let slow_col = self.slow_col();
        let rsi_col = self.rsi_col();
        let required = [fast_col.clone(), slow_col.clone(), rsi_col.clone()];
        if let Err(e) = check_columns(bars, &required) {
            error!("{}: {}", self.name, e);
            return Vec::new();
        }

        if bars.len() < self.config.slow_period {
            warn!(
                "{}: not enough bars ({}) for MA{}",
                self.name,
                bars.len(),
                self.config.slow_period
            );
            return Vec::new();
        }

        let mut signals = Vec::new();

        for i in 1..bars.len() {
            let bar = &bars[i];
            let prev = &bars[i - 1];

            let (Some(fast), Some(slow), Some(rsi)) = (
                bar.indicator(&fast_col),
                bar.indicator(&slow_col),
                bar.indicator(&rsi_col),
            ) else {
                continue;
            };
            let (Some(fast_prev), Some(slow_prev)) =
                (prev.indicator(&fast_col), prev.indicator(&slow_col))
            else {
                continue;
            };

            if i < self.config.slow_period {
                continue;
            }

            if !self
                .state
                .can_signal(&bar.ticker, bar.timestamp, self.config.cooldown_minutes)
            {
                continue;
            }

            // Strict inequalities on both bars; equality never triggers.
            let golden_cross = fast_prev < slow_prev && fast > slow;
            let death_cross = fast_prev > slow_prev && fast < slow;

            if golden_cross {
                if rsi < self.config.rsi_overbought {
                    let signal = Signal {
                        ticker: bar.ticker.clone(),
                        action: SignalAction::Buy,
                        strength: SignalStrength::Strong,
                        reason: format!(
                            "Golden Cross (MA{} crosses above MA{}) with RSI{}={:.1}",
                            self.config.fast_period,
                            self.config.slow_period,
                            self.config.rsi_period,
                            rsi
                        ),
                        timestamp: bar.timestamp,
                        price: bar.close,
                        metadata: HashMap::from([
                            ("fast_ma".to_string(), fast),
                            ("slow_ma".to_string(), slow),
                            ("rsi".to_string(), rsi),
                        ]),
                    };
                    self.state.record(&signal);
                    info!(
                        "{}: BUY {} at {} (Golden Cross)",
                        self.name, bar.ticker, bar.timestamp
                    );
                    signals.push(signal);
                } else {
                    info!(
                        "{}: filtered BUY for {} at {} (RSI too high: {:.1})",
                        self.name, bar.ticker, bar.timestamp, rsi
                    );
                }
            } else if death_cross {
                if rsi > self.config.rsi_oversold {
                    let signal = Signal {
                        ticker: bar.ticker.clone(),
                        action: SignalAction::Sell,
                        strength: SignalStrength::Strong,
                        reason: format!(
                            "Death Cross (MA{} crosses below MA{}) with RSI{}={:.1}",
                            self.config.fast_period,
                            self.config.slow_period,
                            self.config.rsi_period,
                            rsi
                        ),
                        timestamp: bar.timestamp,
                        price: bar.close,
                        metadata: HashMap::from([
                            ("fast_ma".to_string(), fast),
                            ("slow_ma".to_string(), slow),
                            ("rsi".to_string(), rsi),
                        ]),
                    };
                    self.state.record(&signal);
                    info!(
                        "{}: SELL {} at {} (Death Cross)",
                        self.name, bar.ticker, bar.timestamp
                    );
                    signals.push(signal);
                } else {
                    info!(
                        "{}: filtered SELL for {} at {} (RSI too low: {:.1})",
                        self.name, bar.ticker, bar.timestamp, rsi
                    );
                }
            }
        }

        signals
    }
}
