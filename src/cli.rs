//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketDataAdapter;
use crate::adapters::csv_report_adapter::CsvResultWriter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocation::AllocationParams;
use crate::domain::config_validation::{configured_dates, configured_universe, validate_config};
use crate::domain::error::OverlayError;
use crate::domain::evaluation::EvaluationParams;
use crate::domain::market_data::load_market_data;
use crate::domain::metrics::PerformanceStats;
use crate::domain::overlay::OverlayParams;
use crate::domain::pipeline::{PipelineConfig, PipelineResult, run_pipeline};
use crate::domain::signals::SignalParams;
use crate::logging::{LogFormat, init_logging};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ResultSink;

pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(
    name = "overlaytrader",
    about = "Momentum allocation with volatility, crowding and liquidity overlays"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute monthly weights and evaluate the strategy against the benchmark
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of per-ticker CSV files (overrides [data] dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Output directory (overrides [output] dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range of every ticker in the data directory
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data_dir,
            output,
        } => run_overlay(&config, data_dir.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, data_dir } => run_info(&config, data_dir.as_deref()),
    }
}

fn fail(err: &OverlayError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Load and validate a configuration file, then start logging as it asks.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, OverlayError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    let level = adapter
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let format = adapter
        .get_string("logging", "format")
        .and_then(|f| f.parse().ok())
        .unwrap_or(LogFormat::Pretty);
    init_logging(&level, format);
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(adapter)
}

/// Parameter set from a validated configuration; absent keys take defaults.
pub fn build_pipeline_config(config: &dyn ConfigPort) -> PipelineConfig {
    let signals_default = SignalParams::default();
    let window = |key: &str, default: usize| config.get_int("signals", key, default as i64).max(1) as usize;
    let signals = SignalParams {
        momentum_long: window("momentum_long", signals_default.momentum_long),
        momentum_short: window("momentum_short", signals_default.momentum_short),
        z_window: window("z_window", signals_default.z_window),
        vol_window: window("vol_window", signals_default.vol_window),
        crowding_window: window("crowding_window", signals_default.crowding_window),
    };

    let o = OverlayParams::default();
    let overlay = OverlayParams {
        target_vol: config.get_double("overlay", "target_vol", o.target_vol),
        vol_floor: config.get_double("overlay", "vol_floor", o.vol_floor),
        leverage_cap: config.get_double("overlay", "leverage_cap", o.leverage_cap),
        crowding_beta: config.get_double("overlay", "crowding_beta", o.crowding_beta),
        crowding_cap: config.get_double("overlay", "crowding_cap", o.crowding_cap),
        liquidity_alpha: config.get_double("overlay", "liquidity_alpha", o.liquidity_alpha),
        liquidity_cap: config.get_double("overlay", "liquidity_cap", o.liquidity_cap),
    };

    let default_cap = AllocationParams::default().cash_cap.unwrap_or(0.40);
    let allocation = AllocationParams {
        cash_cap: config
            .get_bool("allocation", "cash_cap_enabled", true)
            .then(|| config.get_double("allocation", "cash_cap", default_cap)),
    };

    let evaluation = EvaluationParams {
        periods_per_year: config.get_double(
            "evaluation",
            "periods_per_year",
            EvaluationParams::default().periods_per_year,
        ),
    };

    PipelineConfig {
        signals,
        overlay,
        allocation,
        evaluation,
    }
}

pub fn resolve_data_dir(data_dir: Option<&Path>, config: &dyn ConfigPort) -> Result<PathBuf, OverlayError> {
    data_dir
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .ok_or_else(|| OverlayError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

pub fn resolve_output_dir(output: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Load data through `port` and run the pipeline for a validated config.
pub fn run_overlay_pipeline(
    config: &dyn ConfigPort,
    port: &dyn MarketDataPort,
) -> Result<PipelineResult, OverlayError> {
    let universe = configured_universe(config)?;
    let (start, end) = configured_dates(config)?;
    let params = build_pipeline_config(config);

    tracing::info!(
        tickers = ?universe.tickers,
        cash = %universe.cash,
        benchmark = %universe.benchmark,
        %start,
        end = ?end,
        "starting run"
    );
    let market = load_market_data(port, &universe, start, end)?;
    run_pipeline(&market, &universe, &params)
}

fn run_overlay(config_path: &Path, data_dir: Option<&Path>, output: Option<&Path>) -> ExitCode {
    let result = load_config(config_path).and_then(|config| {
        let data_dir = resolve_data_dir(data_dir, &config)?;
        let output_dir = resolve_output_dir(output, &config);
        let port = CsvMarketDataAdapter::new(data_dir);
        let result = run_overlay_pipeline(&config, &port)?;
        CsvResultWriter::new().write(&result, &output_dir)?;
        Ok((result, output_dir))
    });

    match result {
        Ok((result, output_dir)) => {
            print_summary(&result);
            println!("Results written to {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn format_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn print_stats(title: &str, stats: &PerformanceStats) {
    println!("=== {title} ===");
    println!("CAGR   : {}", format_pct(stats.cagr));
    println!("Vol    : {}", format_pct(stats.volatility));
    println!(
        "Sharpe : {}",
        stats.sharpe.map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}"))
    );
    println!("MaxDD  : {}", format_pct(stats.max_drawdown));
}

fn print_summary(result: &PipelineResult) {
    print_stats("Strategy", &result.strategy.stats);
    print_stats("Benchmark", &result.benchmark.stats);
    let d = &result.diagnostics;
    println!(
        "Fallback months: {} / {} ({:.1}%)",
        d.fallback_periods,
        d.total_periods,
        d.fallback_ratio() * 100.0
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let universe = match configured_universe(&config) {
        Ok(u) => u,
        Err(e) => return fail(&e),
    };
    let params = build_pipeline_config(&config);
    tracing::info!(?universe, ?params, "configuration resolved");

    println!("Configuration OK");
    println!(
        "  universe : {} (cash {}, benchmark {})",
        universe.tickers.join(", "),
        universe.cash,
        universe.benchmark
    );
    println!(
        "  signals  : momentum {}/{}, z-window {}, vol window {}, crowding window {}",
        params.signals.momentum_long,
        params.signals.momentum_short,
        params.signals.z_window,
        params.signals.vol_window,
        params.signals.crowding_window
    );
    println!(
        "  cash cap : {}",
        params
            .allocation
            .cash_cap
            .map_or_else(|| "disabled".to_string(), |c| format!("{:.0}%", c * 100.0))
    );
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, data_dir: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data_dir = match resolve_data_dir(data_dir, &config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let port = CsvMarketDataAdapter::new(data_dir);

    let tickers = match port.list_tickers() {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    for ticker in &tickers {
        match port.get_data_range(ticker) {
            Ok(Some((first, last, count))) => {
                println!("{ticker}: {count} rows, {first} to {last}");
            }
            Ok(None) => println!("{ticker}: no data found"),
            Err(e) => eprintln!("error reading {ticker}: {e}"),
        }
    }

    if let Ok(universe) = configured_universe(&config) {
        for missing in universe.tickers.iter().filter(|t| !tickers.contains(*t)) {
            eprintln!("warning: universe ticker {missing} has no data file");
        }
    }
    ExitCode::SUCCESS
}
