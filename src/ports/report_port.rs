//! Backtest report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratsigError;

/// Port for persisting backtest results.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), StratsigError>;
}
