//! JSON report adapter.
//!
//! Serializes a full backtest result, equity curve included, to a
//! pretty-printed JSON file.

use std::fs;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratsigError;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), StratsigError> {
        let json = serde_json::to_string_pretty(result).map_err(|e| StratsigError::Report {
            reason: format!("serialization failed: {e}"),
        })?;
        fs::write(output_path, json).map_err(|e| StratsigError::Report {
            reason: format!("failed to write {output_path}: {e}"),
        })?;
        Ok(())
    }
}
