use analyzers::create_analyzers;
use backtester::BacktestEngine;
use chrono::{Days, NaiveDate};
use configuration::{Config, load_config};
use core_types::Direction;
use engine::PortfolioManager;
use market_data::{CsvPriceSource, PriceSource};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::Write as _;
use std::path::Path;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// Writes `days` bars following `drift` per day with a small oscillation.
fn write_prices(dir: &Path, symbol: &str, base: f64, drift: f64, days: u64) {
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    for i in 0..days {
        let date = start() + Days::new(i);
        let close = base * (1.0 + drift * i as f64) + (i as f64 * 0.7).sin() * base * 0.01;
        writeln!(
            body,
            "{date},{:.2},{:.2},{:.2},{:.2},{}",
            close,
            close * 1.01,
            close * 0.99,
            close,
            100_000 + i * 10
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
}

fn price_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_prices(dir.path(), "AAPL", 150.0, 0.004, 120);
    write_prices(dir.path(), "MSFT", 300.0, -0.003, 120);
    write_prices(dir.path(), "SPY", 400.0, 0.001, 120);
    dir
}

#[test]
fn backtest_over_csv_data_keeps_the_books_balanced() {
    let dir = price_dir();
    let source = CsvPriceSource::new(dir.path());
    let config = Config::default();
    let analyzers = create_analyzers(&config, None).unwrap();
    let engine = BacktestEngine::from_config(analyzers, &config.backtest)
        .unwrap()
        .with_progress(false);

    let end = start() + Days::new(119);
    let symbols = vec!["AAPL".to_string(), "MSFT".to_string(), "NFLX".to_string()];
    let result = engine.run(&symbols, start(), end, &source).unwrap();

    assert_eq!(result.skipped_symbols, vec!["NFLX".to_string()]);
    assert_eq!(result.history.len(), 120);
    assert_eq!(result.report.trading_days, 120);
    for snapshot in &result.history {
        assert!(snapshot.cash >= Decimal::ZERO);
        assert_eq!(snapshot.total_value, snapshot.cash + snapshot.positions_value);
        assert_eq!(
            snapshot.positions_value,
            snapshot.holdings.values().copied().sum::<Decimal>()
        );
    }
    assert_eq!(
        result.report.final_value,
        result.history.last().unwrap().total_value
    );
    assert!(result.report.max_drawdown <= 0.0);
    assert!(result.trades.iter().all(|t| t.order.delta != 0));
}

#[test]
fn live_decision_is_consistent_and_executable() {
    let dir = price_dir();
    let source = CsvPriceSource::new(dir.path());
    let end = start() + Days::new(119);
    let benchmark = source.fetch_history("SPY", start(), end).unwrap();
    let history = source.fetch_history("AAPL", start(), end).unwrap();

    let mut manager = PortfolioManager::from_config(&Config::default(), Some(&benchmark)).unwrap();
    let decision = manager.decide("AAPL", &history).unwrap();

    assert_eq!(decision.direction, Direction::from_sign(decision.metadata.order_size));
    assert_eq!(decision.metadata.signals.len(), 3);
    assert!(decision.metadata.failures.is_empty());
    assert_eq!(decision.metadata.current_price, history.last().unwrap().close);
    assert_eq!(decision.metadata.portfolio.cash, dec!(1000000));
    assert_eq!(decision.rationale.lines().count(), 4);

    // A flat ledger can only be asked to buy or hold.
    assert!(decision.metadata.order_size >= 0);
    assert!(manager.execute(&decision));
    let expected = u64::try_from(decision.metadata.order_size).unwrap();
    assert_eq!(manager.ledger().shares("AAPL"), expected);
}

#[test]
fn configuration_file_drives_the_backtest() {
    let dir = price_dir();
    let config_path = dir.path().join("quorum.toml");
    std::fs::write(
        &config_path,
        "[backtest]\ninitial_capital = 50000\nmax_allocation = 0.2\n",
    )
    .unwrap();
    let config = load_config(Some(&config_path)).unwrap();
    assert_eq!(config.backtest.initial_capital, dec!(50000));

    let analyzers = create_analyzers(&config, None).unwrap();
    let engine = BacktestEngine::from_config(analyzers, &config.backtest)
        .unwrap()
        .with_progress(false);
    let source = CsvPriceSource::new(dir.path());
    let result = engine
        .run(&["AAPL".to_string()], start(), start() + Days::new(59), &source)
        .unwrap();

    assert_eq!(result.report.initial_value, dec!(50000));
    assert_eq!(result.history.len(), 60);
    // No buy may exceed 20 % of the configured capital at its fill price.
    assert!(
        result
            .trades
            .iter()
            .filter(|t| t.order.delta > 0)
            .all(|t| Decimal::from(t.order.delta.unsigned_abs()) * t.order.price <= dec!(10000))
    );
}
