//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::{
    parse_optional_date, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::SteptraderError;
use crate::domain::feature::FeatureKind;
use crate::domain::metrics::Metrics;
use crate::domain::signal::SignalKind;
use crate::domain::sizer::PositionSizer;
use crate::domain::strategy::{FixedWeightStrategy, LayeredStrategy, Strategy, StrategyState};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

/// Environment variable that overrides `--log-level`.
pub const LOG_ENV: &str = "STEPTRADER_LOG";

const DEFAULT_OUTPUT_DIR: &str = "report";

#[derive(Parser, Debug)]
#[command(name = "steptrader", about = "Single-instrument daily backtester")]
pub struct Cli {
    /// Log filter, e.g. `info` or `steptrader=debug`
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding `<SYMBOL>.csv` files
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file and its strategy wiring
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, data.as_deref(), symbol.as_deref())
            } else {
                run_backtest(&config, data.as_deref(), symbol.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the global fmt subscriber on stderr. `STEPTRADER_LOG` wins over
/// `log_level`. A second call keeps the first subscriber.
pub fn init_tracing(log_level: &str) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SteptraderError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    Ok(adapter)
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
    output_override: Option<&Path>,
) -> Result<(), SteptraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let mut strategy = build_strategy(&adapter)?;
    let initial_state = build_initial_state(&adapter);

    let symbol = resolve_symbol(symbol_override, &adapter)?;
    let data_port = CsvAdapter::new(resolve_data_dir(data_override, &adapter));
    let output_dir = resolve_output_dir(output_override, &adapter);
    let report_port = CsvReportAdapter::new();
    let report: Option<&dyn ReportPort> = if adapter.get_bool("report", "enabled", true) {
        Some(&report_port)
    } else {
        None
    };

    run_backtest_pipeline(
        &data_port,
        report,
        strategy.as_mut(),
        initial_state,
        &bt_config,
        &symbol,
        &output_dir,
    )?;
    Ok(())
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SteptraderError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        start_date: parse_optional_date(adapter, "start_date")?,
        end_date: parse_optional_date(adapter, "end_date")?,
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        fee_rate: adapter.get_double("backtest", "fee_rate", defaults.fee_rate),
        slippage: adapter.get_double("backtest", "slippage", defaults.slippage),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    })
}

pub fn build_initial_state(adapter: &dyn ConfigPort) -> StrategyState {
    StrategyState::new(adapter.get_double("strategy", "initial_weight", 0.0))
}

/// Build the strategy named by `[strategy] preset`. Every feature, signal
/// and sizer reference is resolved here, so wiring mistakes surface before
/// any data is read.
pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Box<dyn Strategy>, SteptraderError> {
    let preset = adapter
        .get_string("strategy", "preset")
        .map(|p| p.trim().to_lowercase())
        .unwrap_or_else(|| "momentum".to_string());
    let name = adapter
        .get_string("strategy", "name")
        .filter(|s| !s.trim().is_empty());

    let strategy: Box<dyn Strategy> = match preset.as_str() {
        "momentum" => {
            let window = get_window(adapter, "strategy", "window", Some(20))?;
            let vol_filter = match adapter.get_string("strategy", "vol_threshold") {
                Some(_) => Some((
                    get_window(adapter, "strategy", "vol_window", Some(20))?,
                    get_required_f64(adapter, "strategy", "vol_threshold")?,
                )),
                None => None,
            };
            let step = adapter.get_double("strategy", "step", 0.1);
            let s = LayeredStrategy::momentum(window, vol_filter, step)?;
            Box::new(match name {
                Some(n) => s.with_name(n),
                None => s,
            })
        }
        "dca" => {
            let window = get_window(adapter, "strategy", "window", Some(20))?;
            let step = adapter.get_double("strategy", "step", 0.04);
            let band = adapter.get_double("strategy", "band", 0.02);
            let s = LayeredStrategy::dca(window, step, band)?;
            Box::new(match name {
                Some(n) => s.with_name(n),
                None => s,
            })
        }
        "buy_and_hold" => {
            let weight = adapter.get_double("strategy", "weight", 1.0);
            let s = FixedWeightStrategy::new(weight)?;
            let n = name.unwrap_or_else(|| FixedWeightStrategy::buy_and_hold().name().to_string());
            Box::new(s.with_name(n))
        }
        "custom" => Box::new(build_custom_strategy(
            adapter,
            name.unwrap_or_else(|| "Custom".to_string()),
        )?),
        other => {
            return Err(SteptraderError::invalid(
                "strategy",
                "preset",
                format!("unknown preset '{}'", other),
            ));
        }
    };

    info!(strategy = strategy.name(), preset = %preset, "strategy built");
    Ok(strategy)
}

/// `[strategy] features`/`signals` list names whose definitions live in
/// `[feature.<name>]` and `[signal.<name>]` sections.
fn build_custom_strategy(
    adapter: &dyn ConfigPort,
    name: String,
) -> Result<LayeredStrategy, SteptraderError> {
    let features = adapter
        .get_list("strategy", "features")
        .into_iter()
        .map(|feature| {
            let kind = parse_feature(adapter, &feature)?;
            Ok((feature, kind))
        })
        .collect::<Result<Vec<_>, SteptraderError>>()?;

    let signals = adapter
        .get_list("strategy", "signals")
        .into_iter()
        .map(|signal| {
            let kind = parse_signal(adapter, &signal)?;
            Ok((signal, kind))
        })
        .collect::<Result<Vec<_>, SteptraderError>>()?;

    let directional = get_required_string(adapter, "strategy", "directional")?;
    let gate = adapter
        .get_string("strategy", "gate")
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());
    let step = adapter.get_double("strategy", "step", 0.1);
    let sizer = PositionSizer::new(directional, gate, step)?;

    LayeredStrategy::new(name, features, signals, sizer)
}

fn parse_feature(adapter: &dyn ConfigPort, name: &str) -> Result<FeatureKind, SteptraderError> {
    let section = format!("feature.{}", name);
    let kind = get_required_string(adapter, &section, "kind")?;
    let window = get_window(adapter, &section, "window", None)?;
    match kind.to_lowercase().as_str() {
        "sma" | "ma" | "moving_average" => Ok(FeatureKind::MovingAverage { window }),
        "stddev" | "volatility" => Ok(FeatureKind::Volatility { window }),
        other => Err(SteptraderError::invalid(
            &section,
            "kind",
            format!("unknown feature kind '{}', expected sma or stddev", other),
        )),
    }
}

fn parse_signal(adapter: &dyn ConfigPort, name: &str) -> Result<SignalKind, SteptraderError> {
    let section = format!("signal.{}", name);
    let kind = get_required_string(adapter, &section, "kind")?;
    let feature = get_required_string(adapter, &section, "feature")?;
    match kind.to_lowercase().as_str() {
        "momentum" => Ok(SignalKind::Momentum { feature }),
        "volatility_gate" => Ok(SignalKind::VolatilityGate {
            feature,
            threshold: get_required_f64(adapter, &section, "threshold")?,
        }),
        "mean_reversion" => Ok(SignalKind::MeanReversion {
            feature,
            band: adapter.get_double(&section, "band", 0.02),
        }),
        other => Err(SteptraderError::invalid(
            &section,
            "kind",
            format!(
                "unknown signal kind '{}', expected momentum, volatility_gate or mean_reversion",
                other
            ),
        )),
    }
}

fn get_required_string(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, SteptraderError> {
    adapter
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SteptraderError::missing(section, key))
}

fn get_required_f64(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<f64, SteptraderError> {
    get_required_string(adapter, section, key)?;
    let value = adapter.get_double(section, key, f64::NAN);
    if value.is_nan() {
        return Err(SteptraderError::invalid(section, key, "expected a number"));
    }
    Ok(value)
}

fn get_window(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Option<usize>,
) -> Result<usize, SteptraderError> {
    if adapter.get_string(section, key).is_none() {
        return default.ok_or_else(|| SteptraderError::missing(section, key));
    }
    let raw = adapter.get_int(section, key, -1);
    usize::try_from(raw).map_err(|_| {
        SteptraderError::invalid(section, key, "window must be a non-negative integer")
    })
}

pub fn resolve_symbol(
    symbol_override: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<String, SteptraderError> {
    match symbol_override {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => get_required_string(adapter, "data", "symbol"),
    }
}

pub fn resolve_data_dir(data_override: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    data_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("data", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn resolve_output_dir(output_override: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    output_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Fetch bars, run the engine, print the summary and write the report.
/// Returns `None` when the source had no bars and no run was performed.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: Option<&dyn ReportPort>,
    strategy: &mut dyn Strategy,
    initial_state: StrategyState,
    bt_config: &BacktestConfig,
    symbol: &str,
    output_dir: &Path,
) -> Result<Option<Metrics>, SteptraderError> {
    let bars = data_port.fetch_ohlcv(symbol, bt_config.start_date, bt_config.end_date)?;
    info!(symbol, bars = bars.len(), "bars loaded");

    let result = backtest_engine::run(bars, strategy, initial_state, bt_config)?;
    if result.is_empty() {
        println!("No bars for {} in the requested range; no run performed.", symbol);
        return Ok(None);
    }

    let metrics = Metrics::compute(&result, bt_config.risk_free_rate);

    println!("=== {} on {} ===", result.strategy_name, symbol);
    println!(
        "Period:           {} to {} ({} bars)",
        result.equity_curve[0].date,
        result.equity_curve[result.equity_curve.len() - 1].date,
        result.equity_curve.len()
    );
    println!("Initial Capital:  {:.2}", result.initial_capital);
    println!("Final Equity:     {:.2}", metrics.final_equity);
    println!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    println!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    println!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    println!(
        "Max Drawdown:     -{:.1}% ({} bars)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    println!(
        "Total Trades:     {} ({} buys, {} sells)",
        metrics.total_trades, metrics.buys, metrics.sells
    );
    println!("Total Fees:       {:.2}", metrics.total_fees);
    println!("Turnover:         {:.2}x", metrics.turnover);
    println!("Final Weight:     {:.2}", result.final_state.target_weight);

    if let Some(report) = report_port {
        report.write(&result, &metrics, output_dir)?;
        println!("\nReport written to: {}", output_dir.display());
    }

    Ok(Some(metrics))
}

fn run_dry_run(
    config_path: &Path,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
) -> Result<(), SteptraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let strategy = build_strategy(&adapter)?;
    let initial_state = build_initial_state(&adapter);
    let symbol = resolve_symbol(symbol_override, &adapter)?;
    let data_dir = resolve_data_dir(data_override, &adapter);

    println!("Strategy: {}", strategy.name());
    for line in strategy.describe() {
        println!("  {}", line);
    }
    println!("Initial weight: {}", initial_state.target_weight);

    println!("\nData:");
    println!("  symbol: {}", symbol);
    println!("  file:   {}", data_dir.join(format!("{}.csv", symbol)).display());
    let range = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "open".into());
    println!(
        "  range:  {} to {}",
        range(bt_config.start_date),
        range(bt_config.end_date)
    );

    println!("\nCosts:");
    println!("  initial_capital: {:.2}", bt_config.initial_capital);
    println!("  fee_rate:        {}", bt_config.fee_rate);
    println!("  slippage:        {}", bt_config.slippage);

    println!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SteptraderError> {
    let adapter = load_config(config_path)?;
    build_backtest_config(&adapter)?;
    let strategy = build_strategy(&adapter)?;

    println!("Strategy: {}", strategy.name());
    for line in strategy.describe() {
        println!("  {}", line);
    }
    println!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, symbol_override: Option<&str>) -> Result<(), SteptraderError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let symbol = resolve_symbol(symbol_override, &adapter)?;
    let data_port = CsvAdapter::new(resolve_data_dir(None, &adapter));

    match data_port.get_data_range(&symbol)? {
        Some((first, last, count)) => {
            println!("{}: {} bars, {} to {}", symbol, count, first, last);
            Ok(())
        }
        None => Err(SteptraderError::NoData { symbol }),
    }
}
