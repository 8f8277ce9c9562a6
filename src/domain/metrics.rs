//! Performance metrics over a simulated equity curve.

use serde::Serialize;

use crate::domain::backtest::EquityPoint;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Summary statistics of one backtest run.
///
/// `max_drawdown` is non-positive. `profit_factor` is infinite when no
/// completed trade lost money and zero when no trade completed at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trades: usize,
    pub years: f64,
}

impl Metrics {
    /// Compute the metric set from an equity curve sorted by timestamp.
    pub fn compute(curve: &[EquityPoint], initial_capital: f64) -> Metrics {
        let Some(last) = curve.last() else {
            return Metrics {
                initial_value: initial_capital,
                final_value: initial_capital,
                total_return: 0.0,
                cagr: 0.0,
                volatility: 0.0,
                max_drawdown: 0.0,
                sharpe_ratio: 0.0,
                win_rate: 0.0,
                profit_factor: 0.0,
                trades: 0,
                years: 0.0,
            };
        };

        let initial_value = initial_capital;
        let final_value = last.total;
        let total_return = final_value / initial_value - 1.0;

        let years = (last.timestamp - curve[0].timestamp).num_days() as f64 / DAYS_PER_YEAR;
        let cagr = if years > 0.0 {
            (final_value / initial_value).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let volatility = annualized_volatility(curve);
        let max_drawdown = max_drawdown(curve);
        let sharpe_ratio = if volatility > 0.0 {
            cagr / volatility
        } else {
            0.0
        };

        let trade_returns = pair_trades(curve);
        let trades = trade_returns.len();
        let (win_rate, profit_factor) = if trades > 0 {
            let wins = trade_returns.iter().filter(|r| **r > 0.0).count();
            let gross_profit: f64 = trade_returns.iter().filter(|r| **r > 0.0).sum();
            let gross_loss: f64 = trade_returns
                .iter()
                .filter(|r| **r < 0.0)
                .sum::<f64>()
                .abs();
            let profit_factor = if gross_loss > 0.0 {
                gross_profit / gross_loss
            } else {
                f64::INFINITY
            };
            (wins as f64 / trades as f64, profit_factor)
        } else {
            (0.0, 0.0)
        };

        Metrics {
            initial_value,
            final_value,
            total_return,
            cagr,
            volatility,
            max_drawdown,
            sharpe_ratio,
            win_rate,
            profit_factor,
            trades,
            years,
        }
    }
}

/// Sample standard deviation of bar-to-bar equity returns, scaled to a
/// trading year. Fewer than two returns gives zero.
fn annualized_volatility(curve: &[EquityPoint]) -> f64 {
    if curve.len() < 3 {
        return 0.0;
    }
    let returns: Vec<f64> = curve
        .windows(2)
        .map(|w| w[1].total / w[0].total - 1.0)
        .collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline of total equity, as a non-positive ratio.
fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for point in curve {
        peak = peak.max(point.total);
        let drawdown = (point.total - peak) / peak;
        worst = worst.min(drawdown);
    }
    worst
}

/// Returns of completed round trips, priced at the bars where the position
/// opened and closed. The position before the first bar is flat, so an entry
/// on the first bar opens a trade. An entry never closed is dropped.
fn pair_trades(curve: &[EquityPoint]) -> Vec<f64> {
    let mut returns = Vec::new();
    let mut prev_position = 0i32;
    let mut open_price: Option<f64> = None;

    for point in curve {
        if point.position - prev_position == 1 {
            open_price = Some(point.price);
        } else if point.position - prev_position == -1 {
            if let Some(open) = open_price.take() {
                returns.push(point.price / open - 1.0);
            }
        }
        prev_position = point.position;
    }

    returns
}
