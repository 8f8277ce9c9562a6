//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{Backtester, DEFAULT_COMMISSION, DEFAULT_INITIAL_CAPITAL};
use crate::domain::bar::Bar;
use crate::domain::error::StratsigError;
use crate::domain::strategy::{
    BollingerConfig, BollingerMode, BollingerStrategy, MaCrossoverConfig, MaCrossoverStrategy,
    MacdStochConfig, MacdStochStrategy, Strategy,
};
use crate::domain::sweep::{parameter_sweep, SweepGrid};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stratsig", about = "Trading signal generator and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    MaCrossover,
    Bollinger,
    MacdStoch,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for one ticker
    Backtest {
        /// Directory of per-ticker CSV files
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long, value_enum, default_value = "ma-crossover")]
        strategy: StrategyKind,
        #[arg(long, default_value_t = 50)]
        fast_ma: usize,
        #[arg(long, default_value_t = 200)]
        slow_ma: usize,
        #[arg(long, default_value_t = 20)]
        bb_length: usize,
        #[arg(long, default_value_t = 2.0)]
        bb_std: f64,
        /// Trade middle-band breakouts instead of fading the outer bands
        #[arg(long)]
        bb_breakout: bool,
        #[arg(long, default_value_t = 14)]
        rsi_period: usize,
        #[arg(long, default_value_t = 70.0)]
        rsi_overbought: f64,
        #[arg(long, default_value_t = 30.0)]
        rsi_oversold: f64,
        /// Relax MACD entry conditions (direction agreement, initial bias)
        #[arg(long)]
        relaxed: bool,
        #[arg(long)]
        initial_capital: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Grid-search MA crossover parameters for one ticker
    Sweep {
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        ticker: String,
        /// Comma-separated fast MA periods
        #[arg(long, default_value = "10,20,50")]
        fast_periods: String,
        /// Comma-separated slow MA periods
        #[arg(long, default_value = "50,100,200")]
        slow_periods: String,
        /// Comma-separated RSI periods
        #[arg(long, default_value = "14")]
        rsi_periods: String,
        #[arg(long)]
        initial_capital: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write all rows as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show available tickers or the data range for one ticker
    Info {
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        ticker: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            data,
            ticker,
            strategy,
            fast_ma,
            slow_ma,
            bb_length,
            bb_std,
            bb_breakout,
            rsi_period,
            rsi_overbought,
            rsi_oversold,
            relaxed,
            initial_capital,
            commission,
            config,
            output,
        } => run_backtest(BacktestArgs {
            data,
            ticker,
            strategy,
            fast_ma,
            slow_ma,
            bb_length,
            bb_std,
            bb_breakout,
            rsi_period,
            rsi_overbought,
            rsi_oversold,
            relaxed,
            initial_capital,
            commission,
            config,
            output,
        }),
        Command::Sweep {
            data,
            ticker,
            fast_periods,
            slow_periods,
            rsi_periods,
            initial_capital,
            commission,
            config,
            output,
        } => run_sweep(
            data,
            &ticker,
            &fast_periods,
            &slow_periods,
            &rsi_periods,
            initial_capital,
            commission,
            config.as_ref(),
            output.as_ref(),
        ),
        Command::Info {
            data,
            ticker,
            config,
        } => run_info(data, ticker.as_deref(), config.as_ref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = StratsigError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Flag > config file > built-in default.
struct Settings {
    data_dir: PathBuf,
    initial_capital: f64,
    commission: f64,
}

fn resolve_settings(
    data: Option<PathBuf>,
    initial_capital: Option<f64>,
    commission: Option<f64>,
    config: Option<&FileConfigAdapter>,
) -> Settings {
    let data_dir = data.unwrap_or_else(|| {
        config
            .and_then(|c| c.get_string("data", "path"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"))
    });
    let initial_capital = initial_capital.unwrap_or_else(|| {
        config
            .map(|c| c.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL))
            .unwrap_or(DEFAULT_INITIAL_CAPITAL)
    });
    let commission = commission.unwrap_or_else(|| {
        config
            .map(|c| c.get_double("backtest", "commission", DEFAULT_COMMISSION))
            .unwrap_or(DEFAULT_COMMISSION)
    });
    Settings {
        data_dir,
        initial_capital,
        commission,
    }
}

fn validate_settings(settings: &Settings) -> Result<(), StratsigError> {
    if settings.initial_capital <= 0.0 {
        return Err(StratsigError::InvalidParameter {
            name: "initial_capital".into(),
            reason: "must be positive".into(),
        });
    }
    if !(0.0..1.0).contains(&settings.commission) {
        return Err(StratsigError::InvalidParameter {
            name: "commission".into(),
            reason: "must be in [0, 1)".into(),
        });
    }
    Ok(())
}

struct BacktestArgs {
    data: Option<PathBuf>,
    ticker: String,
    strategy: StrategyKind,
    fast_ma: usize,
    slow_ma: usize,
    bb_length: usize,
    bb_std: f64,
    bb_breakout: bool,
    rsi_period: usize,
    rsi_overbought: f64,
    rsi_oversold: f64,
    relaxed: bool,
    initial_capital: Option<f64>,
    commission: Option<f64>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn build_strategy(args: &BacktestArgs) -> Result<Box<dyn Strategy>, StratsigError> {
    match args.strategy {
        StrategyKind::MaCrossover => {
            if args.fast_ma >= args.slow_ma {
                return Err(StratsigError::InvalidParameter {
                    name: "fast_ma".into(),
                    reason: format!(
                        "fast period {} must be shorter than slow period {}",
                        args.fast_ma, args.slow_ma
                    ),
                });
            }
            Ok(Box::new(MaCrossoverStrategy::new(MaCrossoverConfig {
                fast_period: args.fast_ma,
                slow_period: args.slow_ma,
                rsi_period: args.rsi_period,
                rsi_overbought: args.rsi_overbought,
                rsi_oversold: args.rsi_oversold,
                ..Default::default()
            })))
        }
        StrategyKind::Bollinger => Ok(Box::new(BollingerStrategy::new(BollingerConfig {
            length: args.bb_length,
            num_std: args.bb_std,
            rsi_period: args.rsi_period,
            rsi_overbought: args.rsi_overbought,
            rsi_oversold: args.rsi_oversold,
            mode: if args.bb_breakout {
                BollingerMode::Breakout
            } else {
                BollingerMode::MeanReversion
            },
            ..Default::default()
        }))),
        StrategyKind::MacdStoch => Ok(Box::new(MacdStochStrategy::new(MacdStochConfig {
            relaxed_mode: args.relaxed,
            ..Default::default()
        }))),
    }
}

fn fetch_bars(data_dir: &PathBuf, ticker: &str) -> Result<Vec<Bar>, StratsigError> {
    let adapter = CsvAdapter::new(data_dir.clone());
    let bars = adapter.fetch_bars(ticker)?;
    eprintln!("Loaded {} bars for {} from {}", bars.len(), ticker, data_dir.display());
    Ok(bars)
}

fn run_backtest(args: BacktestArgs) -> ExitCode {
    let config = match args.config.as_ref().map(load_config) {
        Some(Ok(adapter)) => Some(adapter),
        Some(Err(code)) => return code,
        None => None,
    };
    let settings = resolve_settings(
        args.data.clone(),
        args.initial_capital,
        args.commission,
        config.as_ref(),
    );
    if let Err(e) = validate_settings(&settings) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let mut strategy = match build_strategy(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let bars = match fetch_bars(&settings.data_dir, &args.ticker) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Running {} on {}...", strategy.name(), args.ticker);
    let backtester = Backtester::new(settings.initial_capital, settings.commission);
    let result = match backtester.run(strategy.as_mut(), &bars) {
        Ok(r) => r,
        Err(abort) => {
            eprintln!("Backtest aborted: {abort}");
            return ExitCode::SUCCESS;
        }
    };

    eprintln!("\n=== {} on {} ===", result.strategy, result.ticker);
    eprintln!("Period:           {} to {}", result.start, result.end);
    eprintln!(
        "Signals:          {} ({} buys, {} sells)",
        result.signal_counts.total, result.signal_counts.buys, result.signal_counts.sells
    );
    eprintln!(
        "Total Return:     {:.2}%",
        result.metrics.total_return * 100.0
    );
    eprintln!("CAGR:             {:.2}%", result.metrics.cagr * 100.0);
    eprintln!(
        "Volatility:       {:.2}%",
        result.metrics.volatility * 100.0
    );
    eprintln!(
        "Max Drawdown:     {:.2}%",
        result.metrics.max_drawdown * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", result.metrics.sharpe_ratio);
    eprintln!("Trades:           {}", result.metrics.trades);
    eprintln!("Win Rate:         {:.1}%", result.metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", result.metrics.profit_factor);

    if let Some(output) = args.output.as_ref() {
        let reporter = JsonReportAdapter::new();
        let path = output.display().to_string();
        if let Err(e) = reporter.write(&result, &path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nResult written to: {path}");
    }

    ExitCode::SUCCESS
}

fn parse_period_list(name: &str, value: &str) -> Result<Vec<usize>, StratsigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| StratsigError::InvalidParameter {
                name: name.to_string(),
                reason: format!("{s:?} is not a positive integer"),
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run_sweep(
    data: Option<PathBuf>,
    ticker: &str,
    fast_periods: &str,
    slow_periods: &str,
    rsi_periods: &str,
    initial_capital: Option<f64>,
    commission: Option<f64>,
    config_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> ExitCode {
    let config = match config_path.map(load_config) {
        Some(Ok(adapter)) => Some(adapter),
        Some(Err(code)) => return code,
        None => None,
    };
    let settings = resolve_settings(data, initial_capital, commission, config.as_ref());
    if let Err(e) = validate_settings(&settings) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let grid = match (
        parse_period_list("fast_periods", fast_periods),
        parse_period_list("slow_periods", slow_periods),
        parse_period_list("rsi_periods", rsi_periods),
    ) {
        (Ok(fast), Ok(slow), Ok(rsi)) => SweepGrid {
            fast_periods: fast,
            slow_periods: slow,
            rsi_periods: rsi,
        },
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let bars = match fetch_bars(&settings.data_dir, ticker) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let backtester = Backtester::new(settings.initial_capital, settings.commission);
    let rows = parameter_sweep(&grid, &bars, &backtester);

    if rows.is_empty() {
        eprintln!("No valid parameter combinations produced a result");
        return ExitCode::SUCCESS;
    }

    eprintln!("\n=== Sweep results for {ticker} (best first) ===");
    eprintln!("fast  slow  rsi   sharpe    cagr     maxdd   win%  trades");
    for row in &rows {
        eprintln!(
            "{:<5} {:<5} {:<5} {:>6.2} {:>7.2}% {:>7.2}% {:>5.1} {:>7}",
            row.fast_period,
            row.slow_period,
            row.rsi_period,
            row.sharpe_ratio,
            row.cagr * 100.0,
            row.max_drawdown * 100.0,
            row.win_rate * 100.0,
            row.trades
        );
    }

    if let Some(output) = output {
        if let Err(e) = write_sweep_csv(&rows, output) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nSweep rows written to: {}", output.display());
    }

    ExitCode::SUCCESS
}

fn write_sweep_csv(
    rows: &[crate::domain::sweep::SweepRow],
    output: &PathBuf,
) -> Result<(), StratsigError> {
    let mut writer = csv::Writer::from_path(output).map_err(|e| StratsigError::Report {
        reason: format!("failed to open {}: {}", output.display(), e),
    })?;
    for row in rows {
        writer.serialize(row).map_err(|e| StratsigError::Report {
            reason: format!("CSV write error: {e}"),
        })?;
    }
    writer.flush().map_err(|e| StratsigError::Report {
        reason: format!("CSV flush error: {e}"),
    })?;
    Ok(())
}

fn run_info(
    data: Option<PathBuf>,
    ticker: Option<&str>,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    let config = match config_path.map(load_config) {
        Some(Ok(adapter)) => Some(adapter),
        Some(Err(code)) => return code,
        None => None,
    };
    let settings = resolve_settings(data, None, None, config.as_ref());
    let adapter = CsvAdapter::new(settings.data_dir.clone());

    match ticker {
        Some(ticker) => match adapter.data_range(ticker) {
            Ok(Some((start, end, count))) => {
                println!("{ticker}: {count} bars, {start} to {end}");
                ExitCode::SUCCESS
            }
            Ok(None) => {
                println!("{ticker}: no rows");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        },
        None => match adapter.list_tickers() {
            Ok(tickers) => {
                for ticker in tickers {
                    println!("{ticker}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_period_list_accepts_spaced_values() {
        assert_eq!(
            parse_period_list("fast_periods", "10, 20 ,50").unwrap(),
            vec![10, 20, 50]
        );
    }

    #[test]
    fn parse_period_list_rejects_garbage() {
        assert!(parse_period_list("fast_periods", "10,abc").is_err());
    }

    #[test]
    fn build_strategy_rejects_inverted_ma_periods() {
        let args = BacktestArgs {
            data: None,
            ticker: "AAPL".into(),
            strategy: StrategyKind::MaCrossover,
            fast_ma: 200,
            slow_ma: 50,
            bb_length: 20,
            bb_std: 2.0,
            bb_breakout: false,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            relaxed: false,
            initial_capital: None,
            commission: None,
            config: None,
            output: None,
        };
        assert!(matches!(
            build_strategy(&args),
            Err(StratsigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn settings_prefer_flags_over_defaults() {
        let settings = resolve_settings(
            Some(PathBuf::from("/srv/bars")),
            Some(50_000.0),
            Some(0.0),
            None,
        );
        assert_eq!(settings.data_dir, PathBuf::from("/srv/bars"));
        assert_eq!(settings.initial_capital, 50_000.0);
        assert_eq!(settings.commission, 0.0);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn settings_fall_back_to_config() {
        let config = FileConfigAdapter::from_string(
            "[data]\npath = /srv/bars\n[backtest]\ninitial_capital = 25000\ncommission = 0.002\n",
        )
        .unwrap();
        let settings = resolve_settings(None, None, None, Some(&config));
        assert_eq!(settings.data_dir, PathBuf::from("/srv/bars"));
        assert_eq!(settings.initial_capital, 25_000.0);
        assert_eq!(settings.commission, 0.002);
    }

    #[test]
    fn negative_capital_is_rejected() {
        let settings = Settings {
            data_dir: PathBuf::from("./data"),
            initial_capital: -1.0,
            commission: 0.001,
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn cli_parses_backtest_command() {
        let cli = Cli::try_parse_from([
            "stratsig",
            "backtest",
            "--ticker",
            "AAPL",
            "--strategy",
            "macd-stoch",
            "--relaxed",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                ticker,
                strategy,
                relaxed,
                ..
            } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(strategy, StrategyKind::MacdStoch);
                assert!(relaxed);
            }
            _ => panic!("expected backtest command"),
        }
    }

    #[test]
    fn cli_parses_sweep_defaults() {
        let cli = Cli::try_parse_from(["stratsig", "sweep", "--ticker", "MSFT"]).unwrap();
        match cli.command {
            Command::Sweep {
                ticker,
                fast_periods,
                slow_periods,
                ..
            } => {
                assert_eq!(ticker, "MSFT");
                assert_eq!(fast_periods, "10,20,50");
                assert_eq!(slow_periods, "50,100,200");
            }
            _ => panic!("expected sweep command"),
        }
    }
}
