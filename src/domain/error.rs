//! Domain error types.
//!
//! Strategy and simulation failures are local and recoverable: strategies
//! degrade to an empty signal sequence, the backtester reports an abort kind,
//! and the caller moves on to the next unit of work.

/// Soft failures inside `generate_signals`. Logged at the failure site and
/// converted to an empty signal sequence, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("missing required indicator columns: {columns:?}")]
    MissingColumns { columns: Vec<String> },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },
}

/// Reasons a backtest yields no result instead of a metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimulationAbort {
    #[error("empty bar series")]
    EmptyBars,

    #[error("strategy produced no signals")]
    NoSignals,
}

/// Top-level error type for stratsig.
#[derive(Debug, thiserror::Error)]
pub enum StratsigError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratsigError> for std::process::ExitCode {
    fn from(err: &StratsigError) -> Self {
        let code: u8 = match err {
            StratsigError::Io(_) => 1,
            StratsigError::ConfigParse { .. } | StratsigError::InvalidParameter { .. } => 2,
            StratsigError::Data { .. } | StratsigError::NoData { .. } => 3,
            StratsigError::Report { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
