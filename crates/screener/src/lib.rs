use aggregator::SignalAggregator;
use analyzers::Analyzer;
use chrono::{NaiveDate, TimeDelta};
use configuration::{MarketSegment, Screener};
use indicatif::{ProgressBar, ProgressStyle};
use market_data::PriceSource;
use rayon::prelude::*;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod error;
pub mod segments;

pub use error::ScreenerError;
pub use segments::{segment_label, segment_symbols, universe};

/// One screened symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub symbol: String,
    pub segment: Option<MarketSegment>,
    pub current_price: f64,
    /// Exit price from the price-target analysis.
    pub target_price: f64,
    /// `(target_price / current_price - 1) × 100`.
    pub potential_upside: f64,
    /// Equal-weight mean of `direction × confidence` over surviving analyzers.
    pub aggregate_signal: f64,
    /// Mean confidence over surviving analyzers.
    pub confidence: f64,
    pub average_volume: f64,
    pub reasons: Vec<String>,
}

/// Runs every analyzer over a universe of symbols in parallel.
///
/// Work is bounded by a dedicated pool of `max_workers` threads. The screener
/// is read-only: it never sees a ledger. A symbol that fails for any reason is
/// logged and dropped from the results.
pub struct StockScreener {
    analyzers: Vec<Box<dyn Analyzer>>,
    source: Arc<dyn PriceSource>,
    aggregator: SignalAggregator,
    pool: rayon::ThreadPool,
    start: NaiveDate,
    as_of: NaiveDate,
    show_progress: bool,
}

impl StockScreener {
    pub fn new(
        analyzers: Vec<Box<dyn Analyzer>>,
        source: Arc<dyn PriceSource>,
        params: &Screener,
        as_of: NaiveDate,
    ) -> Result<Self, ScreenerError> {
        if params.max_workers == 0 {
            return Err(ScreenerError::InvalidParameters(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if params.lookback_days <= 0 {
            return Err(ScreenerError::InvalidParameters(
                "lookback_days must be positive".to_string(),
            ));
        }
        let start = TimeDelta::try_days(params.lookback_days)
            .and_then(|d| as_of.checked_sub_signed(d))
            .ok_or_else(|| {
                ScreenerError::InvalidParameters(format!(
                    "lookback_days {} is out of range",
                    params.lookback_days
                ))
            })?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.max_workers)
            .thread_name(|i| format!("screener-{i}"))
            .build()?;

        Ok(Self {
            analyzers,
            source,
            aggregator: SignalAggregator::equal_weight(),
            pool,
            start,
            as_of,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Screens the first `count` symbols of a built-in segment.
    pub fn screen(&self, segment: MarketSegment, count: usize) -> Result<Vec<ScreenResult>, ScreenerError> {
        let symbols = segment_symbols(segment, count);
        tracing::info!(segment = segment_label(segment), symbols = symbols.len(), "Screening segment");
        self.run(&symbols, Some(segment))
    }

    /// Screens an explicit list of symbols.
    pub fn screen_symbols(&self, symbols: &[String]) -> Result<Vec<ScreenResult>, ScreenerError> {
        self.run(symbols, None)
    }

    fn run(
        &self,
        symbols: &[String],
        segment: Option<MarketSegment>,
    ) -> Result<Vec<ScreenResult>, ScreenerError> {
        let progress_bar = self.progress_bar(symbols.len() as u64)?;

        let mut results: Vec<ScreenResult> = self.pool.install(|| {
            symbols
                .par_iter()
                .filter_map(|symbol| {
                    let outcome = self.analyze_symbol(symbol, segment);
                    progress_bar.inc(1);
                    match outcome {
                        Ok(result) => Some(result),
                        Err(e) => {
                            tracing::warn!(symbol = %symbol, error = %e, "Dropping symbol from screen");
                            None
                        }
                    }
                })
                .collect()
        });
        progress_bar.finish_with_message("Screening complete.");

        results.sort_by(|a, b| b.potential_upside.total_cmp(&a.potential_upside));
        tracing::info!(screened = results.len(), requested = symbols.len(), "Screen finished");
        Ok(results)
    }

    fn analyze_symbol(
        &self,
        symbol: &str,
        segment: Option<MarketSegment>,
    ) -> Result<ScreenResult, ScreenerError> {
        let history = self.source.fetch_history(symbol, self.start, self.as_of)?;
        let Some(last) = history.last() else {
            return Err(ScreenerError::NoData(symbol.to_string()));
        };
        let current_price = last.close_f64();
        if current_price.is_nan() || current_price <= 0.0 {
            return Err(ScreenerError::InvalidPrice {
                symbol: symbol.to_string(),
                price: current_price,
            });
        }

        let consensus = self
            .aggregator
            .aggregate(symbol, history.bars(), &self.analyzers)?;
        let target_price = consensus
            .signals
            .iter()
            .find_map(|s| s.signal.price_target())
            .map(|t| t.exit_price)
            .ok_or_else(|| ScreenerError::MissingPriceTarget(symbol.to_string()))?;

        let volumes: Vec<f64> = history
            .bars()
            .iter()
            .filter_map(|b| b.volume.to_f64())
            .collect();
        let average_volume = if volumes.is_empty() {
            0.0
        } else {
            volumes.iter().sum::<f64>() / volumes.len() as f64
        };

        Ok(ScreenResult {
            symbol: symbol.to_string(),
            segment,
            current_price,
            target_price,
            potential_upside: (target_price / current_price - 1.0) * 100.0,
            aggregate_signal: consensus.weighted_signal,
            confidence: consensus.weighted_confidence,
            average_volume,
            reasons: consensus
                .signals
                .iter()
                .filter(|s| !s.signal.rationale.is_empty())
                .map(|s| format!("{}: {}", s.analyzer, s.signal.rationale))
                .collect(),
        })
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar, ScreenerError> {
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
