//! Event-driven portfolio simulation over a signal sequence.
//!
//! The backtester runs a strategy over a bar series, maps each emitted
//! signal onto the nearest bar, and simulates an all-in long-only account:
//! a buy converts the full cash balance into a position, a sell liquidates
//! it. Commission is charged on both sides.

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::Serialize;

use crate::domain::bar::Bar;
use crate::domain::error::SimulationAbort;
use crate::domain::metrics::Metrics;
use crate::domain::signal::{Signal, SignalAction};
use crate::domain::strategy::Strategy;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_COMMISSION: f64 = 0.001;

/// One bar of simulated account state. `total` is always `cash + holdings`.
#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub signal: i32,
    pub position: i32,
    pub cash: f64,
    pub holdings: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalCounts {
    pub total: usize,
    pub buys: usize,
    pub sells: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub ticker: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub signal_counts: SignalCounts,
    pub metrics: Metrics,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Clone, Copy)]
pub struct Backtester {
    pub initial_capital: f64,
    pub commission: f64,
}

impl Default for Backtester {
    fn default() -> Self {
        Backtester {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission: DEFAULT_COMMISSION,
        }
    }
}

impl Backtester {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Backtester {
            initial_capital,
            commission,
        }
    }

    /// Run `strategy` over `bars` and simulate the resulting trades.
    ///
    /// Bars must be sorted ascending by timestamp. An empty series or a
    /// signal-free run aborts instead of producing degenerate metrics.
    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        bars: &[Bar],
    ) -> Result<BacktestResult, SimulationAbort> {
        if bars.is_empty() {
            return Err(SimulationAbort::EmptyBars);
        }

        let signals = strategy.generate_signals(bars);
        if signals.is_empty() {
            warn!("{}: no signals generated, aborting backtest", strategy.name());
            return Err(SimulationAbort::NoSignals);
        }

        let signal_counts = SignalCounts {
            total: signals.len(),
            buys: signals
                .iter()
                .filter(|s| s.action == SignalAction::Buy)
                .count(),
            sells: signals
                .iter()
                .filter(|s| s.action == SignalAction::Sell)
                .count(),
        };

        let signal_col = map_signals_to_bars(&signals, bars);

        // Net cumulative exposure, clamped long-only to {0, 1}.
        let mut positions = vec![0i32; bars.len()];
        let mut pos = 0i32;
        for (i, sig) in signal_col.iter().enumerate() {
            pos = (pos + sig).clamp(0, 1);
            positions[i] = pos;
        }

        let equity_curve = self.simulate(bars, &signal_col, &positions);
        let metrics = Metrics::compute(&equity_curve, self.initial_capital);

        debug!(
            "{}: simulated {} bars, final equity {:.2}",
            strategy.name(),
            equity_curve.len(),
            equity_curve.last().map(|p| p.total).unwrap_or(0.0)
        );

        Ok(BacktestResult {
            strategy: strategy.name().to_string(),
            ticker: bars[0].ticker.clone(),
            start: bars[0].timestamp,
            end: bars[bars.len() - 1].timestamp,
            signal_counts,
            metrics,
            equity_curve,
        })
    }

    /// Walk the bar series tracking cash and the dollar value of holdings.
    ///
    /// Holdings are marked to market on the close-to-close return before any
    /// trade at the current bar executes. Trades fill at the bar close.
    fn simulate(&self, bars: &[Bar], signal_col: &[i32], positions: &[i32]) -> Vec<EquityPoint> {
        let mut cash = self.initial_capital;
        let mut holdings = 0.0f64;
        let mut curve = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            if i > 0 && holdings > 0.0 {
                holdings *= bar.close / bars[i - 1].close;
            }

            let prev_position = if i == 0 { 0 } else { positions[i - 1] };
            let position = positions[i];

            if prev_position == 0 && position == 1 {
                holdings = cash / (1.0 + self.commission);
                cash = 0.0;
            } else if prev_position == 1 && position == 0 {
                cash = holdings * (1.0 - self.commission);
                holdings = 0.0;
            }

            curve.push(EquityPoint {
                timestamp: bar.timestamp,
                price: bar.close,
                signal: signal_col[i],
                position,
                cash,
                holdings,
                total: cash + holdings,
            });
        }

        curve
    }
}

/// Map each signal onto the bar whose timestamp is nearest to it.
///
/// Ties resolve to the earlier bar; when several signals land on one bar the
/// last one wins. Buy maps to +1, sell to -1, hold to 0.
fn map_signals_to_bars(signals: &[Signal], bars: &[Bar]) -> Vec<i32> {
    let mut column = vec![0i32; bars.len()];

    for signal in signals {
        let mut best = 0usize;
        let mut best_delta = i64::MAX;
        for (i, bar) in bars.iter().enumerate() {
            let delta = (signal.timestamp - bar.timestamp).num_seconds().abs();
            if delta < best_delta {
                best_delta = delta;
                best = i;
            }
        }
        column[best] = match signal.action {
            SignalAction::Buy => 1,
            SignalAction::Sell => -1,
            SignalAction::Hold => 0,
        };
    }

    column
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::SignalStrength;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashMap;

    fn base_ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                ticker: "AAPL".into(),
                timestamp: base_ts() + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
                indicators: HashMap::new(),
            })
            .collect()
    }

    fn make_signal(action: SignalAction, timestamp: NaiveDateTime, price: f64) -> Signal {
        Signal {
            ticker: "AAPL".into(),
            action,
            strength: SignalStrength::Strong,
            reason: "scripted".into(),
            timestamp,
            price,
            metadata: HashMap::new(),
        }
    }

    /// Replays a fixed signal script regardless of the bars it sees.
    struct ScriptedStrategy {
        script: Vec<Signal>,
    }

    impl Strategy for ScriptedStrategy {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn generate_signals(&mut self, _bars: &[Bar]) -> Vec<Signal> {
            self.script.clone()
        }
    }

    #[test]
    fn empty_bars_aborts() {
        let backtester = Backtester::default();
        let mut strategy = ScriptedStrategy { script: vec![] };
        assert_eq!(
            backtester.run(&mut strategy, &[]).unwrap_err(),
            SimulationAbort::EmptyBars
        );
    }

    #[test]
    fn no_signals_aborts() {
        let backtester = Backtester::default();
        let mut strategy = ScriptedStrategy { script: vec![] };
        let bars = make_bars(&[100.0, 101.0]);
        assert_eq!(
            backtester.run(&mut strategy, &bars).unwrap_err(),
            SimulationAbort::NoSignals
        );
    }

    #[test]
    fn buy_and_hold_tracks_price() {
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 110.0, 100.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![make_signal(SignalAction::Buy, bars[0].timestamp, 100.0)],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        let totals: Vec<f64> = result.equity_curve.iter().map(|p| p.total).collect();
        for (total, expected) in totals.iter().zip([10_000.0, 11_000.0, 10_000.0]) {
            assert!((total - expected).abs() < 1e-6, "got {total}, want {expected}");
        }
        assert_eq!(result.equity_curve[0].position, 1);
    }

    #[test]
    fn round_trip_over_a_spike_ends_flat() {
        // Prices 100/110/100, buy at the first bar, sell at the last.
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 110.0, 100.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Sell, bars[2].timestamp, 100.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        let totals: Vec<f64> = result.equity_curve.iter().map(|p| p.total).collect();
        for (total, expected) in totals.iter().zip([10_000.0, 11_000.0, 10_000.0]) {
            assert!((total - expected).abs() < 1e-6, "got {total}, want {expected}");
        }
        assert!(result.metrics.total_return.abs() < 1e-12);
        assert_eq!(result.metrics.trades, 1);
        assert_eq!(result.metrics.win_rate, 0.0);
        assert!(result.metrics.profit_factor.is_infinite());
        assert!((result.metrics.max_drawdown + 1.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn zero_commission_round_trip_is_exact() {
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 100.0, 100.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Sell, bars[2].timestamp, 100.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        let last = result.equity_curve.last().unwrap();
        assert!((last.total - 10_000.0).abs() < 1e-9);
        assert_eq!(last.position, 0);
        assert!((last.holdings - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn commission_charged_both_sides() {
        let backtester = Backtester::new(10_000.0, 0.001);
        let bars = make_bars(&[100.0, 100.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Sell, bars[1].timestamp, 100.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        let expected = 10_000.0 / 1.001 * 0.999;
        let last = result.equity_curve.last().unwrap();
        assert!((last.total - expected).abs() < 1e-9);
        assert!(last.total < 10_000.0);
    }

    #[test]
    fn repeated_buys_keep_position_at_one() {
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 110.0, 121.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Buy, bars[1].timestamp, 110.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        assert!(result.equity_curve.iter().all(|p| p.position <= 1));
        let last = result.equity_curve.last().unwrap();
        assert!((last.total - 12_100.0).abs() < 1e-9);
    }

    #[test]
    fn sell_without_position_is_flat() {
        let backtester = Backtester::new(10_000.0, 0.001);
        let bars = make_bars(&[100.0, 90.0, 80.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![make_signal(SignalAction::Sell, bars[0].timestamp, 100.0)],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        for point in &result.equity_curve {
            assert_eq!(point.position, 0);
            assert!((point.total - 10_000.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn signal_maps_to_nearest_bar() {
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 110.0, 120.0]);
        // 1 hour after bar 1, far from bars 0 and 2.
        let ts = bars[1].timestamp + Duration::hours(1);
        let mut strategy = ScriptedStrategy {
            script: vec![make_signal(SignalAction::Buy, ts, 110.0)],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        assert_eq!(result.equity_curve[0].signal, 0);
        assert_eq!(result.equity_curve[1].signal, 1);
        assert_eq!(result.equity_curve[1].position, 1);
    }

    #[test]
    fn nearest_bar_tie_resolves_to_earlier() {
        let backtester = Backtester::new(10_000.0, 0.0);
        let bars = make_bars(&[100.0, 110.0]);
        // Exactly halfway between the two bars.
        let ts = bars[0].timestamp + Duration::hours(12);
        let mut strategy = ScriptedStrategy {
            script: vec![make_signal(SignalAction::Buy, ts, 100.0)],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        assert_eq!(result.equity_curve[0].signal, 1);
        assert_eq!(result.equity_curve[1].signal, 0);
    }

    #[test]
    fn last_signal_wins_on_shared_bar() {
        let bars = make_bars(&[100.0]);
        let signals = vec![
            make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
            make_signal(SignalAction::Sell, bars[0].timestamp, 100.0),
        ];
        let column = map_signals_to_bars(&signals, &bars);
        assert_eq!(column, vec![-1]);
    }

    #[test]
    fn equity_is_cash_plus_holdings() {
        let backtester = Backtester::default();
        let bars = make_bars(&[100.0, 105.0, 95.0, 102.0, 98.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Sell, bars[2].timestamp, 95.0),
                make_signal(SignalAction::Buy, bars[3].timestamp, 102.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        for point in &result.equity_curve {
            assert!((point.total - (point.cash + point.holdings)).abs() < 1e-9);
            assert!(point.cash >= 0.0);
            assert!(point.holdings >= 0.0);
        }
    }

    #[test]
    fn result_covers_bar_range() {
        let backtester = Backtester::default();
        let bars = make_bars(&[100.0, 110.0, 105.0]);
        let mut strategy = ScriptedStrategy {
            script: vec![
                make_signal(SignalAction::Buy, bars[0].timestamp, 100.0),
                make_signal(SignalAction::Sell, bars[2].timestamp, 105.0),
            ],
        };
        let result = backtester.run(&mut strategy, &bars).unwrap();

        assert_eq!(result.ticker, "AAPL");
        assert_eq!(result.start, bars[0].timestamp);
        assert_eq!(result.end, bars[2].timestamp);
        assert_eq!(result.signal_counts.total, 2);
        assert_eq!(result.signal_counts.buys, 1);
        assert_eq!(result.signal_counts.sells, 1);
        assert_eq!(result.equity_curve.len(), bars.len());
    }
}
