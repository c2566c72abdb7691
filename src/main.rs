use anyhow::{Context, bail};
use backtester::BacktestEngine;
use chrono::{Local, NaiveDate, TimeDelta};
use clap::{Parser, Subcommand};
use configuration::{Config, MarketSegment, load_config};
use core_types::PriceHistory;
use engine::{Decision, ErrorPayload, PortfolioManager};
use market_data::{CsvPriceSource, PriceSource};
use rust_decimal::Decimal;
use screener::StockScreener;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_indicatif::span_ext::IndicatifSpanExt;

mod output;
mod telemetry;

/// The main entry point for the Quorum trading application.
fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only supplies QUORUM__* overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data.directory = dir.clone();
    }
    let _log_guard = telemetry::init(&config.logging, cli.show_reasoning)?;

    let source = CsvPriceSource::new(config.data.directory.clone());

    match &cli.command {
        Commands::Analyze(args) => handle_analyze(&cli, args, &config, &source),
        Commands::Backtest(args) => handle_backtest(&cli, args, config.clone(), &source),
        Commands::Screen(args) => handle_screen(&cli, args, &config, source),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Multi-analyzer trading decisions, backtests and stock screens.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./quorum.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding one <SYMBOL>.csv price table per symbol.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log every analyzer's reasoning and print per-analyzer breakdowns.
    #[arg(long, global = true)]
    show_reasoning: bool,

    /// Print machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Form a sized trading decision for each symbol from today's data.
    Analyze(AnalyzeArgs),
    /// Replay the decision process day by day over historical data.
    Backtest(BacktestArgs),
    /// Rank a market segment by potential upside.
    Screen(ScreenArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Symbols to analyze (e.g., "AAPL,MSFT").
    #[arg(long, value_delimiter = ',', required = true)]
    symbols: Vec<String>,

    /// Apply each decision to the in-session portfolio.
    #[arg(long)]
    execute: bool,

    /// The decision date (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Calendar days of history handed to the analyzers.
    #[arg(long, default_value_t = 365)]
    lookback_days: i64,

    /// Benchmark symbol for the risk analyzer's beta (e.g., "SPY").
    #[arg(long)]
    benchmark: Option<String>,
}

#[derive(Parser)]
struct BacktestArgs {
    /// Symbols to include in the simulated portfolio.
    #[arg(long, value_delimiter = ',', required = true)]
    symbols: Vec<String>,

    /// The first simulated day (format: YYYY-MM-DD). Defaults to backtest.start_date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// The last simulated day (format: YYYY-MM-DD). Defaults to backtest.end_date.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Overrides backtest.initial_capital.
    #[arg(long)]
    initial_capital: Option<Decimal>,

    /// Benchmark symbol for the risk analyzer's beta (e.g., "SPY").
    #[arg(long)]
    benchmark: Option<String>,
}

#[derive(Parser)]
struct ScreenArgs {
    /// The market segment to screen. Defaults to screener.default_segment.
    #[arg(long, value_enum)]
    segment: Option<MarketSegment>,

    /// How many symbols of the segment to screen. Defaults to screener.default_count.
    #[arg(long)]
    count: Option<usize>,

    /// Screen an explicit list instead of a built-in segment.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// The screening date (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// A per-symbol outcome of `analyze`, as printed in JSON mode.
#[derive(Serialize)]
#[serde(untagged)]
enum AnalyzeOutcome {
    Decision(Decision),
    Failed {
        symbol: String,
        #[serde(flatten)]
        payload: ErrorPayload,
    },
}

fn load_benchmark(
    source: &dyn PriceSource,
    symbol: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Option<PriceHistory>> {
    symbol
        .map(|s| {
            source
                .fetch_history(s, start, end)
                .with_context(|| format!("Failed to load benchmark {s}"))
        })
        .transpose()
}

/// The first day of a `lookback_days` window ending at `as_of`.
fn lookback_start(as_of: NaiveDate, lookback_days: i64) -> anyhow::Result<NaiveDate> {
    if lookback_days <= 0 {
        bail!("--lookback-days must be positive, got {lookback_days}");
    }
    let Some(start) = TimeDelta::try_days(lookback_days).and_then(|d| as_of.checked_sub_signed(d))
    else {
        bail!("--lookback-days {lookback_days} reaches before the earliest supported date");
    };
    Ok(start)
}

fn handle_analyze(
    cli: &Cli,
    args: &AnalyzeArgs,
    config: &Config,
    source: &CsvPriceSource,
) -> anyhow::Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let start = lookback_start(as_of, args.lookback_days)?;
    let benchmark = load_benchmark(source, args.benchmark.as_deref(), start, as_of)?;
    let mut manager = PortfolioManager::from_config(config, benchmark.as_ref())?;

    let span = tracing::info_span!("analyze");
    span.pb_set_length(args.symbols.len() as u64);
    let _enter = span.enter();

    let mut outcomes = Vec::with_capacity(args.symbols.len());
    for symbol in &args.symbols {
        let outcome = match source.fetch_history(symbol, start, as_of) {
            Ok(history) => match manager.decide(symbol, &history) {
                Ok(decision) => {
                    if args.execute && !manager.execute(&decision) {
                        tracing::warn!(symbol = %symbol, "Decision was not executed");
                    }
                    AnalyzeOutcome::Decision(decision)
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "Decision failed");
                    AnalyzeOutcome::Failed {
                        symbol: symbol.clone(),
                        payload: ErrorPayload::from(&e),
                    }
                }
            },
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Failed to load price data");
                AnalyzeOutcome::Failed {
                    symbol: symbol.clone(),
                    payload: ErrorPayload {
                        error: "data".to_string(),
                        message: e.to_string(),
                    },
                }
            }
        };
        outcomes.push(outcome);
        span.pb_inc(1);
    }

    if cli.json {
        return output::print_json(&outcomes);
    }

    let decisions: Vec<Decision> = outcomes
        .iter()
        .filter_map(|o| match o {
            AnalyzeOutcome::Decision(d) => Some(d.clone()),
            AnalyzeOutcome::Failed { .. } => None,
        })
        .collect();
    println!("{}", output::decisions_table(&decisions));
    if cli.show_reasoning {
        for decision in &decisions {
            println!("\n{}: {}", decision.symbol, decision.rationale);
            println!("{}", output::signals_table(decision));
        }
    }
    for outcome in &outcomes {
        if let AnalyzeOutcome::Failed { symbol, payload } = outcome {
            eprintln!("{symbol}: {} ({})", payload.message, payload.error);
        }
    }
    if args.execute {
        let ledger = manager.ledger();
        println!("Cash after execution: {:.2}", ledger.cash());
        for (symbol, position) in ledger.positions() {
            println!("  {symbol}: {} shares @ {:.2}", position.shares, position.cost_basis);
        }
    }
    Ok(())
}

fn handle_backtest(
    cli: &Cli,
    args: &BacktestArgs,
    mut config: Config,
    source: &CsvPriceSource,
) -> anyhow::Result<()> {
    let (Some(start), Some(end)) = (
        args.start.or(config.backtest.start_date),
        args.end.or(config.backtest.end_date),
    ) else {
        bail!("A backtest needs --start and --end (or backtest.start_date / backtest.end_date)");
    };
    if let Some(capital) = args.initial_capital {
        config.backtest.initial_capital = capital;
    }
    config.validate()?;

    let benchmark = load_benchmark(source, args.benchmark.as_deref(), start, end)?;
    let analyzers = analyzers::create_analyzers(&config, benchmark.as_ref())?;
    let engine = BacktestEngine::from_config(analyzers, &config.backtest)?.with_progress(!cli.json);

    let result = engine.run(&args.symbols, start, end, source)?;

    if cli.json {
        return output::print_json(&result);
    }
    println!("{}", output::backtest_table(&result));
    Ok(())
}

fn handle_screen(
    cli: &Cli,
    args: &ScreenArgs,
    config: &Config,
    source: CsvPriceSource,
) -> anyhow::Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let analyzers = analyzers::create_analyzers(config, None)?;
    let screener = StockScreener::new(analyzers, Arc::new(source), &config.screener, as_of)?
        .with_progress(!cli.json);

    let results = if args.symbols.is_empty() {
        let segment = args.segment.unwrap_or(config.screener.default_segment);
        let count = args.count.unwrap_or(config.screener.default_count);
        screener.screen(segment, count)?
    } else {
        screener.screen_symbols(&args.symbols)?
    };

    if cli.json {
        return output::print_json(&results);
    }
    println!("{}", output::screen_table(&results));
    if cli.show_reasoning {
        for r in &results {
            println!("\n{}:", r.symbol);
            for reason in &r.reasons {
                println!("  {reason}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn lookback_window_ends_at_the_decision_date() {
        let start = lookback_start(date(2024, 6, 30), 30).unwrap();
        assert_eq!(start, date(2024, 5, 31));
    }

    #[test]
    fn non_positive_lookback_is_rejected() {
        assert!(lookback_start(date(2024, 6, 30), 0).is_err());
        assert!(lookback_start(date(2024, 6, 30), -10).is_err());
    }

    #[test]
    fn huge_lookback_is_an_error_not_a_panic() {
        assert!(lookback_start(date(2024, 6, 30), i64::MAX).is_err());
        assert!(lookback_start(date(2024, 6, 30), 1_000_000_000).is_err());
    }
}
