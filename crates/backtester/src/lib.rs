use aggregator::SignalAggregator;
use analytics::{AnalyticsEngine, PerformanceReport};
use analyzers::Analyzer;
use chrono::NaiveDate;
use configuration::Backtest;
use core_types::{PriceHistory, TradeOrder, UnpricedValuation};
use executor::{PortfolioLedger, ValuationSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use market_data::PriceSource;
use risk::{PositionSizer, ThresholdSizer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

pub mod error;

pub use error::BacktestError;

/// An order that the ledger accepted during the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTrade {
    pub date: NaiveDate,
    pub order: TradeOrder,
}

/// Everything a finished simulation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: Uuid,
    /// Symbols that had data and took part in the run.
    pub symbols: Vec<String>,
    /// Symbols excluded because their fetch failed or returned no bars.
    pub skipped_symbols: Vec<String>,
    pub report: PerformanceReport,
    /// One valuation per calendar date.
    pub history: Vec<ValuationSnapshot>,
    pub trades: Vec<ExecutedTrade>,
    pub rejected_orders: usize,
}

/// The day-by-day multi-symbol simulator.
///
/// Every analyzer sees only the bars dated on or before the simulated day.
/// Failures are contained to one symbol on one day: a failed analyzer is
/// excluded, a symbol with no surviving analyzer is skipped, and a rejected
/// order leaves the ledger untouched.
pub struct BacktestEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
    aggregator: SignalAggregator,
    sizer: ThresholdSizer,
    initial_capital: Decimal,
    unpriced: UnpricedValuation,
    analytics_engine: AnalyticsEngine,
    show_progress: bool,
}

impl BacktestEngine {
    pub fn new(
        analyzers: Vec<Box<dyn Analyzer>>,
        sizer: ThresholdSizer,
        initial_capital: Decimal,
    ) -> Result<Self, BacktestError> {
        if analyzers.is_empty() {
            return Err(BacktestError::NoAnalyzers);
        }
        Ok(Self {
            analyzers,
            aggregator: SignalAggregator::equal_weight(),
            sizer,
            initial_capital,
            unpriced: UnpricedValuation::default(),
            analytics_engine: AnalyticsEngine::new(),
            show_progress: true,
        })
    }

    pub fn from_config(
        analyzers: Vec<Box<dyn Analyzer>>,
        params: &Backtest,
    ) -> Result<Self, BacktestError> {
        let sizer = ThresholdSizer::from_config(params)?;
        Ok(Self::new(analyzers, sizer, params.initial_capital)?
            .with_unpriced_valuation(params.unpriced_valuation))
    }

    pub fn with_unpriced_valuation(mut self, policy: UnpricedValuation) -> Self {
        self.unpriced = policy;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Runs the simulation over `start..=end` for every symbol with data.
    pub fn run(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        source: &dyn PriceSource,
    ) -> Result<BacktestResult, BacktestError> {
        if start > end {
            return Err(BacktestError::InvalidDateRange { start, end });
        }
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, symbols = symbols.len(), %start, %end, "Starting backtest");

        // --- 1. LOAD ALL DATA UP FRONT ---
        let mut histories = Vec::with_capacity(symbols.len());
        let mut skipped_symbols = Vec::new();
        for symbol in symbols {
            match source.fetch_history(symbol, start, end) {
                Ok(history) if !history.is_empty() => histories.push(history),
                Ok(_) => {
                    tracing::warn!(symbol = %symbol, "No price data in range, excluding symbol");
                    skipped_symbols.push(symbol.clone());
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Failed to load price data, excluding symbol");
                    skipped_symbols.push(symbol.clone());
                }
            }
        }
        if histories.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }

        let calendar: BTreeSet<NaiveDate> = histories.iter().flat_map(|h| h.dates()).collect();
        let mut ledger = PortfolioLedger::new(self.initial_capital)
            .with_unpriced_valuation(self.unpriced);
        let mut trades = Vec::new();
        let mut rejected_orders = 0;

        let progress_bar = self.progress_bar(calendar.len() as u64)?;

        // --- 2. THE DAY LOOP ---
        for &date in &calendar {
            let mut prices = HashMap::with_capacity(histories.len());

            for history in &histories {
                let Some(bar) = history.bar_on(date) else {
                    continue;
                };
                prices.insert(history.symbol().to_string(), bar.close);

                match self.order_for(history, date, bar.close, &ledger) {
                    Some(order) if order.delta != 0 => {
                        if ledger.execute(&order) {
                            tracing::debug!(symbol = %order.symbol, delta = order.delta, price = %order.price, %date, "Order filled");
                            trades.push(ExecutedTrade { date, order });
                        } else {
                            rejected_orders += 1;
                        }
                    }
                    _ => {}
                }
            }

            // --- 3. RECORD VALUATION ---
            let snapshot = ledger.record_snapshot(date, &prices);
            tracing::debug!(%date, total_value = %snapshot.total_value, cash = %snapshot.cash, "Recorded valuation");
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("Simulation complete. Analyzing results...");

        // --- 4. GENERATE FINAL REPORT ---
        let equity_curve: Vec<(NaiveDate, Decimal)> = ledger
            .history()
            .iter()
            .map(|s| (s.date, s.total_value))
            .collect();
        let report = self
            .analytics_engine
            .calculate(&equity_curve, self.initial_capital)?;

        tracing::info!(
            %run_id,
            total_return = report.total_return,
            trades = trades.len(),
            rejected_orders,
            "Backtest finished"
        );

        Ok(BacktestResult {
            run_id,
            symbols: histories.iter().map(|h| h.symbol().to_string()).collect(),
            skipped_symbols,
            report,
            history: ledger.history().to_vec(),
            trades,
            rejected_orders,
        })
    }

    /// Aggregates and sizes one symbol for one day. `None` skips the symbol
    /// for the day.
    fn order_for(
        &self,
        history: &PriceHistory,
        date: NaiveDate,
        price: Decimal,
        ledger: &PortfolioLedger,
    ) -> Option<TradeOrder> {
        let symbol = history.symbol();
        let consensus = match self
            .aggregator
            .aggregate(symbol, history.until(date), &self.analyzers)
        {
            Ok(consensus) => consensus,
            Err(e) => {
                tracing::warn!(symbol, %date, error = %e, "No consensus, skipping symbol for the day");
                return None;
            }
        };

        match self
            .sizer
            .target_delta(&consensus, price, ledger.shares(symbol))
        {
            Ok(delta) => Some(TradeOrder::new(symbol, delta, price)),
            Err(e) => {
                tracing::warn!(symbol, %date, error = %e, "Sizing failed, skipping symbol for the day");
                None
            }
        }
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar, BacktestError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let progress_bar = ProgressBar::new(len);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );
        Ok(progress_bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzers::AnalyzerError;
    use core_types::{Direction, PriceBar, Signal};
    use market_data::InMemoryPriceSource;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    struct Fixed(Direction, f64);

    impl Analyzer for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }
        fn analyze(&self, _symbol: &str, _history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
            Ok(Signal::new(self.0, self.1, "fixed")?)
        }
    }

    struct Failing;

    impl Analyzer for Failing {
        fn name(&self) -> &str {
            "Failing"
        }
        fn analyze(&self, symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
            Err(AnalyzerError::InsufficientData {
                symbol: symbol.to_string(),
                needed: 1000,
                available: history.len(),
            })
        }
    }

    /// Records the last date of every history it is shown.
    struct Probe(Arc<Mutex<Vec<NaiveDate>>>);

    impl Analyzer for Probe {
        fn name(&self) -> &str {
            "Probe"
        }
        fn analyze(&self, _symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
            if let Some(last) = history.last() {
                self.0.lock().unwrap().push(last.date);
            }
            Ok(Signal::new(Direction::Hold, 0.0, "probe")?)
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn history(symbol: &str, closes: &[(u32, Decimal)]) -> PriceHistory {
        let bars = closes
            .iter()
            .map(|&(d, close)| PriceBar {
                date: day(d),
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1000),
            })
            .collect();
        PriceHistory::new(symbol, bars).unwrap()
    }

    fn engine(analyzers: Vec<Box<dyn Analyzer>>) -> BacktestEngine {
        let sizer = ThresholdSizer::new(dec!(1000000), 0.1, 0.3, 0.3).unwrap();
        BacktestEngine::new(analyzers, sizer, dec!(1000000))
            .unwrap()
            .with_progress(false)
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn failing_analyzers_never_trade() {
        let source = InMemoryPriceSource::new()
            .with_history(history("AAPL", &[(2, dec!(100)), (3, dec!(101)), (4, dec!(99))]));
        let result = engine(vec![Box::new(Failing), Box::new(Failing), Box::new(Failing)])
            .run(&symbols(&["AAPL"]), day(1), day(31), &source)
            .unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.history.len(), 3);
        assert!(result.history.iter().all(|s| s.total_value == dec!(1000000)));
        assert_eq!(result.report.total_return, 0.0);
    }

    #[test]
    fn strong_buy_opens_once_and_holds() {
        let source = InMemoryPriceSource::new()
            .with_history(history("AAPL", &[(2, dec!(100)), (3, dec!(100)), (4, dec!(110))]));
        let result = engine(vec![Box::new(Fixed(Direction::Buy, 1.0))])
            .run(&symbols(&["AAPL"]), day(1), day(31), &source)
            .unwrap();

        // 1.0 x 1 000 000 x 0.1 / 100 = 1000 shares, already at target afterwards.
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].order.delta, 1000);
        let last = result.history.last().unwrap();
        assert_eq!(last.cash, dec!(900000));
        assert_eq!(last.total_value, dec!(1010000));
        assert_eq!(result.report.final_value, dec!(1010000));
    }

    #[test]
    fn surviving_analyzers_still_trade_when_others_fail() {
        let source = InMemoryPriceSource::new()
            .with_history(history("AAPL", &[(2, dec!(100)), (3, dec!(100)), (4, dec!(110))]));
        let result = engine(vec![
            Box::new(Failing),
            Box::new(Fixed(Direction::Buy, 1.0)),
            Box::new(Failing),
        ])
        .run(&symbols(&["AAPL"]), day(1), day(31), &source)
        .unwrap();

        // The failures carry no weight, so the lone survivor is a full-strength buy.
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].date, day(2));
        assert_eq!(result.trades[0].order.delta, 1000);
        assert_eq!(result.rejected_orders, 0);
        assert_eq!(result.history.last().unwrap().total_value, dec!(1010000));
    }

    #[test]
    fn strong_sell_without_position_is_a_no_op() {
        let source = InMemoryPriceSource::new().with_history(history("AAPL", &[(2, dec!(100))]));
        let result = engine(vec![Box::new(Fixed(Direction::Sell, 1.0))])
            .run(&symbols(&["AAPL"]), day(1), day(31), &source)
            .unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.rejected_orders, 0);
    }

    #[test]
    fn calendar_is_the_union_of_symbol_dates() {
        let source = InMemoryPriceSource::new()
            .with_history(history("AAPL", &[(2, dec!(100)), (4, dec!(100))]))
            .with_history(history("MSFT", &[(3, dec!(50)), (4, dec!(50))]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let result = engine(vec![Box::new(Probe(seen.clone()))])
            .run(&symbols(&["AAPL", "MSFT"]), day(1), day(31), &source)
            .unwrap();

        let dates: Vec<_> = result.history.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(4)]);
        // AAPL on 2nd and 4th, MSFT on 3rd and 4th; each sees only its past.
        assert_eq!(*seen.lock().unwrap(), vec![day(2), day(3), day(4), day(4)]);
    }

    #[test]
    fn symbols_without_data_are_skipped() {
        let source = InMemoryPriceSource::new().with_history(history("AAPL", &[(2, dec!(100))]));
        let result = engine(vec![Box::new(Fixed(Direction::Hold, 0.0))])
            .run(&symbols(&["AAPL", "NOPE"]), day(1), day(31), &source)
            .unwrap();
        assert_eq!(result.symbols, vec!["AAPL".to_string()]);
        assert_eq!(result.skipped_symbols, vec!["NOPE".to_string()]);
    }

    #[test]
    fn no_data_at_all_is_unavailable() {
        let source = InMemoryPriceSource::new().with_history(history("AAPL", &[(2, dec!(100))]));
        let err = engine(vec![Box::new(Fixed(Direction::Hold, 0.0))])
            .run(&symbols(&["AAPL"]), day(10), day(31), &source)
            .unwrap_err();
        assert!(matches!(err, BacktestError::DataUnavailable));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let source = InMemoryPriceSource::new();
        let err = engine(vec![Box::new(Fixed(Direction::Hold, 0.0))])
            .run(&symbols(&["AAPL"]), day(5), day(1), &source)
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidDateRange { .. }));
    }
}
