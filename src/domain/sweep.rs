//! Grid search over moving-average crossover parameters.

use log::{info, warn};
use serde::Serialize;

use crate::domain::backtest::Backtester;
use crate::domain::bar::Bar;
use crate::domain::strategy::{MaCrossoverConfig, MaCrossoverStrategy};

/// Parameter combinations to evaluate. The cartesian product is taken and
/// degenerate combinations (fast period not shorter than slow) are skipped.
#[derive(Debug, Clone)]
pub struct SweepGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    pub rsi_periods: Vec<usize>,
}

/// One row of sweep output, ready for CSV or JSON serialization.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub ticker: String,
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub total_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub trades: usize,
}

/// Backtest every valid combination in `grid` over `bars`.
///
/// Combinations that abort (no signals for those parameters) are logged and
/// skipped. Rows come back sorted by Sharpe ratio, best first.
pub fn parameter_sweep(grid: &SweepGrid, bars: &[Bar], backtester: &Backtester) -> Vec<SweepRow> {
    let mut rows = Vec::new();

    for &fast in &grid.fast_periods {
        for &slow in &grid.slow_periods {
            if fast >= slow {
                continue;
            }
            for &rsi in &grid.rsi_periods {
                let mut strategy = MaCrossoverStrategy::new(MaCrossoverConfig {
                    fast_period: fast,
                    slow_period: slow,
                    rsi_period: rsi,
                    ..Default::default()
                });

                match backtester.run(&mut strategy, bars) {
                    Ok(result) => {
                        info!(
                            "sweep fast={fast} slow={slow} rsi={rsi}: sharpe {:.2}, cagr {:.2}, win rate {:.2}",
                            result.metrics.sharpe_ratio,
                            result.metrics.cagr,
                            result.metrics.win_rate
                        );
                        rows.push(SweepRow {
                            ticker: result.ticker,
                            fast_period: fast,
                            slow_period: slow,
                            rsi_period: rsi,
                            total_return: result.metrics.total_return,
                            cagr: result.metrics.cagr,
                            max_drawdown: result.metrics.max_drawdown,
                            sharpe_ratio: result.metrics.sharpe_ratio,
                            win_rate: result.metrics.win_rate,
                            trades: result.metrics.trades,
                        });
                    }
                    Err(abort) => {
                        warn!("sweep fast={fast} slow={slow} rsi={rsi}: {abort}");
                    }
                }
            }
        }
    }

    rows.sort_by(|a, b| {
        b.sharpe_ratio
            .partial_cmp(&a.sharpe_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
