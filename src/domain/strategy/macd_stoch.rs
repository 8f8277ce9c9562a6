//! MACD crossover strategy confirmed by the stochastic oscillator.
//!
//! A buy needs the MACD line crossing above its signal line while %K sits in
//! the lower half of its range; the mirror holds for sells. A simultaneous
//! stochastic crossover out of an extreme upgrades the signal to STRONG.
//! Relaxed mode trades direction agreement instead of strict crossovers and
//! seeds a WEAK signal when the series starts near its extremes.

use log::{error, info, warn};
use std::collections::HashMap;

use crate::domain::bar::Bar;
use crate::domain::signal::{Signal, SignalAction, SignalStrength};
use crate::domain::strategy::{check_columns, Strategy, StrategyState, DEFAULT_COOLDOWN_MINUTES};

#[derive(Debug, Clone, PartialEq)]
pub struct MacdStochConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal_period: usize,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
    pub cooldown_minutes: i64,
    /// Trade on MACD/signal direction agreement instead of strict
    /// crossovers, and seed a WEAK signal when the series opens near its
    /// low-to-high extremes.
    pub relaxed_mode: bool,
}

impl Default for MacdStochConfig {
    fn default() -> Self {
        MacdStochConfig {
            fast: 12,
            slow: 26,
            signal_period: 9,
            stoch_k_period: 14,
            stoch_d_period: 3,
            stoch_overbought: 80.0,
            stoch_oversold: 20.0,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            relaxed_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MacdStochStrategy {
    config: MacdStochConfig,
    name: String,
    state: StrategyState,
}

impl MacdStochStrategy {
    pub fn new(config: MacdStochConfig) -> Self {
        let name = format!(
            "MACD{}_{}_{}_Stoch{}_{}",
            config.fast,
            config.slow,
            config.signal_period,
            config.stoch_k_period,
            config.stoch_d_period
        );
        MacdStochStrategy {
            config,
            name,
            state: StrategyState::new(),
        }
    }

    pub fn config(&self) -> &MacdStochConfig {
        &self.config
    }

    fn min_bars(&self) -> usize {
        self.config
            .slow
            .max(self.config.stoch_k_period + self.config.stoch_d_period)
    }

    fn k_col(&self) -> String {
        format!("stoch_k{}", self.config.stoch_k_period)
    }

    fn d_col(&self) -> String {
        format!("stoch_d{}", self.config.stoch_k_period)
    }

    fn make_signal(
        &self,
        bar: &Bar,
        action: SignalAction,
        strength: SignalStrength,
        reason: String,
        macd: f64,
        macd_signal: f64,
        macd_hist: f64,
        stoch_k: f64,
        stoch_d: f64,
    ) -> Signal {
        Signal {
            ticker: bar.ticker.clone(),
            action,
            strength,
            reason,
            timestamp: bar.timestamp,
            price: bar.close,
            metadata: HashMap::from([
                ("macd".to_string(), macd),
                ("macd_signal".to_string(), macd_signal),
                ("macd_hist".to_string(), macd_hist),
                ("stoch_k".to_string(), stoch_k),
                ("stoch_d".to_string(), stoch_d),
            ]),
        }
    }

    /// In relaxed mode, a series opening within 20% of its overall low (or
    /// high) seeds a WEAK directional signal before any crossover shows up.
    fn initial_bias(&self, bars: &[Bar], close: f64) -> Option<(SignalAction, String)> {
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range = high - low;
        if range <= 0.0 {
            return None;
        }
        let position = (close - low) / range;
        if position <= 0.2 {
            Some((
                SignalAction::Buy,
                format!("Price near series low ({:.0}% of range)", position * 100.0),
            ))
        } else if position >= 0.8 {
            Some((
                SignalAction::Sell,
                format!("Price near series high ({:.0}% of range)", position * 100.0),
            ))
        } else {
            None
        }
    }
}

impl Strategy for MacdStochStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signals(&mut self, bars: &[Bar]) -> Vec<Signal> {
        if bars.is_empty() {
            warn!("{}: empty bar series, no signals generated", self.name);
            return Vec::new();
        }

        let k_col = self.k_col();
        let d_col = self.d_col();
        let required = [
            "macd".to_string(),
            "macd_signal".to_string(),
            "macd_hist".to_string(),
            k_col.clone(),
            d_col.clone(),
        ];
        if let Err(e) = check_columns(bars, &required) {
            error!("{}: {}", self.name, e);
            return Vec::new();
        }

        let min_bars = self.min_bars();
        if bars.len() < min_bars {
            warn!(
                "{}: not enough bars ({}) for lookback {}",
                self.name,
                bars.len(),
                min_bars
            );
            return Vec::new();
        }

        let mut signals = Vec::new();

        // Seed a directional bias at the first fully-defined bar when the
        // series opens at an extreme.
        if self.config.relaxed_mode {
            let first_valid = bars.iter().find(|bar| {
                bar.indicator("macd").is_some()
                    && bar.indicator("macd_signal").is_some()
                    && bar.indicator("macd_hist").is_some()
                    && bar.indicator(&k_col).is_some()
                    && bar.indicator(&d_col).is_some()
            });
            if let Some(bar) = first_valid {
                if self.state.last_signal(&bar.ticker).is_none() {
                    if let Some((action, reason)) = self.initial_bias(bars, bar.close) {
                        let signal = self.make_signal(
                            bar,
                            action,
                            SignalStrength::Weak,
                            reason,
                            bar.indicator("macd").unwrap_or(f64::NAN),
                            bar.indicator("macd_signal").unwrap_or(f64::NAN),
                            bar.indicator("macd_hist").unwrap_or(f64::NAN),
                            bar.indicator(&k_col).unwrap_or(f64::NAN),
                            bar.indicator(&d_col).unwrap_or(f64::NAN),
                        );
                        self.state.record(&signal);
                        info!(
                            "{}: {} {} at {}",
                            self.name, signal.action, bar.ticker, bar.timestamp
                        );
                        signals.push(signal);
                    }
                }
            }
        }

        for i in 1..bars.len() {
            let bar = &bars[i];
            let prev = &bars[i - 1];

            let (Some(macd), Some(macd_sig), Some(macd_hist), Some(k), Some(d)) = (
                bar.indicator("macd"),
                bar.indicator("macd_signal"),
                bar.indicator("macd_hist"),
                bar.indicator(&k_col),
                bar.indicator(&d_col),
            ) else {
                continue;
            };
            let (Some(prev_macd), Some(prev_sig), Some(prev_k), Some(prev_d)) = (
                prev.indicator("macd"),
                prev.indicator("macd_signal"),
                prev.indicator(&k_col),
                prev.indicator(&d_col),
            ) else {
                continue;
            };

            if i < min_bars {
                continue;
            }

            if !self
                .state
                .can_signal(&bar.ticker, bar.timestamp, self.config.cooldown_minutes)
            {
                continue;
            }

            let macd_cross_up = prev_macd < prev_sig && macd > macd_sig;
            let macd_cross_down = prev_macd > prev_sig && macd < macd_sig;
            let buy_trigger = if self.config.relaxed_mode {
                macd > macd_sig
            } else {
                macd_cross_up
            };
            let sell_trigger = if self.config.relaxed_mode {
                macd < macd_sig
            } else {
                macd_cross_down
            };

            let stoch_cross_up = prev_k < prev_d && k > d;
            let stoch_cross_down = prev_k > prev_d && k < d;

            let signal = if buy_trigger && k < 50.0 {
                let strength = if stoch_cross_up && prev_k < self.config.stoch_oversold {
                    SignalStrength::Strong
                } else {
                    SignalStrength::Moderate
                };
                Some(self.make_signal(
                    bar,
                    SignalAction::Buy,
                    strength,
                    format!("MACD bullish crossover with Stoch %K={k:.1}"),
                    macd,
                    macd_sig,
                    macd_hist,
                    k,
                    d,
                ))
            } else if sell_trigger && k > 50.0 {
                let strength = if stoch_cross_down && prev_k > self.config.stoch_overbought {
                    SignalStrength::Strong
                } else {
                    SignalStrength::Moderate
                };
                Some(self.make_signal(
                    bar,
                    SignalAction::Sell,
                    strength,
                    format!("MACD bearish crossover with Stoch %K={k:.1}"),
                    macd,
                    macd_sig,
                    macd_hist,
                    k,
                    d,
                ))
            } else {
                None
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
