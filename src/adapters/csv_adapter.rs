//! CSV file data adapter.
//!
//! One file per ticker, named `<TICKER>.csv`, with a header row. The columns
//! `timestamp,open,high,low,close,volume` are required; every other column
//! is carried as an indicator keyed by its header name. Empty or unparsable
//! indicator cells become NaN so leading lookback rows survive the load.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::StratsigError;
use crate::ports::data_port::DataPort;

const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn parse_timestamp(value: &str, row: usize) -> Result<NaiveDateTime, StratsigError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|e| StratsigError::Data {
            reason: format!("row {row}: invalid timestamp {value:?}: {e}"),
        })
}

fn parse_price(value: &str, column: &str, row: usize) -> Result<f64, StratsigError> {
    value.parse().map_err(|e| StratsigError::Data {
        reason: format!("row {row}: invalid {column} value {value:?}: {e}"),
    })
}

fn parse_volume(value: &str, row: usize) -> Result<i64, StratsigError> {
    // Exported files sometimes carry volume as a float like "50000.0".
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    value
        .parse::<f64>()
        .map(|v| v as i64)
        .map_err(|e| StratsigError::Data {
            reason: format!("row {row}: invalid volume value {value:?}: {e}"),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>, StratsigError> {
        let path = self.csv_path(ticker);
        if !path.exists() {
            return Err(StratsigError::NoData {
                ticker: ticker.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| StratsigError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| StratsigError::Data {
                reason: format!("CSV header error: {e}"),
            })?
            .clone();

        let mut column_index = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            column_index.insert(name.to_string(), i);
        }
        for required in REQUIRED_COLUMNS {
            if !column_index.contains_key(required) {
                return Err(StratsigError::Data {
                    reason: format!("{}: missing column {required:?}", path.display()),
                });
            }
        }
        let indicator_columns: Vec<(String, usize)> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !REQUIRED_COLUMNS.contains(name))
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let field = |record: &csv::StringRecord, name: &str, row: usize| {
            record
                .get(column_index[name])
                .map(str::to_string)
                .ok_or_else(|| StratsigError::Data {
                    reason: format!("row {row}: short record"),
                })
        };

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| StratsigError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let timestamp = parse_timestamp(&field(&record, "timestamp", row)?, row)?;
            let open = parse_price(&field(&record, "open", row)?, "open", row)?;
            let high = parse_price(&field(&record, "high", row)?, "high", row)?;
            let low = parse_price(&field(&record, "low", row)?, "low", row)?;
            let close = parse_price(&field(&record, "close", row)?, "close", row)?;
            let volume = parse_volume(&field(&record, "volume", row)?, row)?;

            let mut indicators = HashMap::with_capacity(indicator_columns.len());
            for (name, index) in &indicator_columns {
                let value = record
                    .get(*index)
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                indicators.insert(name.clone(), value);
            }

            bars.push(Bar {
                ticker: ticker.to_string(),
                timestamp,
                open,
                high,
                low,
                close,
                volume,
                indicators,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsigError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratsigError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StratsigError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

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
