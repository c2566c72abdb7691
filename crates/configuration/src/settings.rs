use chrono::NaiveDate;
use core_types::{AnalyzerId, UnpricedValuation};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so an empty file (or no file at
/// all) yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub aggregation: Aggregation,
    pub risk: RiskSettings,
    pub technicals: TechnicalsParams,
    pub price_target: PriceTargetParams,
    pub backtest: Backtest,
    pub screener: Screener,
    pub data: DataSettings,
    pub logging: Logging,
}

/// One row of the static analyzer weight table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyzerWeight {
    pub name: String,
    pub weight: f64,
}

impl AnalyzerWeight {
    fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

/// Parameters for combining analyzer signals into one consensus.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Aggregation {
    /// Which shipped analyzers to run.
    pub analyzers: Vec<AnalyzerId>,
    /// Static weight per analyzer name. Names missing here weigh 0.
    pub weights: Vec<AnalyzerWeight>,
    /// The analyzer whose signal carries the risk-derived position ceiling.
    pub risk_analyzer: String,
}

impl Aggregation {
    pub fn weight_map(&self) -> HashMap<String, f64> {
        self.weights
            .iter()
            .map(|w| (w.name.clone(), w.weight))
            .collect()
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Self {
            analyzers: AnalyzerId::ALL.to_vec(),
            weights: vec![
                AnalyzerWeight::new("Warren Buffett", 0.20),
                AnalyzerWeight::new("Bill Ackman", 0.15),
                AnalyzerWeight::new("Technical Analysis", 0.15),
                AnalyzerWeight::new("Sentiment Analysis", 0.10),
                AnalyzerWeight::new("Risk Manager", 0.40),
                AnalyzerWeight::new("Price Target Analysis", 0.0),
            ],
            risk_analyzer: "Risk Manager".to_string(),
        }
    }
}

/// Parameters for the risk analyzer and the live position ceiling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskSettings {
    /// Largest fraction of capital any one symbol may take.
    pub max_position_size: f64,
    pub stop_loss_threshold: f64,
    /// Annual risk-free rate used in the Sharpe calculation.
    pub risk_free_rate: f64,
    pub min_sharpe_ratio: f64,
    pub max_drawdown_limit: f64,
    pub beta_threshold: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_position_size: 0.20,
            stop_loss_threshold: 0.15,
            risk_free_rate: 0.02,
            min_sharpe_ratio: 1.0,
            max_drawdown_limit: 0.25,
            beta_threshold: 1.5,
        }
    }
}

/// Indicator windows for the technical analyzer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TechnicalsParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub stochastic_period: usize,
}

impl Default for TechnicalsParams {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            stochastic_period: 14,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceTargetParams {
    pub support_window: usize,
    pub volatility_window: usize,
    pub margin_of_safety: f64,
    pub profit_target: f64,
    pub stop_loss: f64,
}

impl Default for PriceTargetParams {
    fn default() -> Self {
        Self {
            support_window: 20,
            volatility_window: 20,
            margin_of_safety: 0.20,
            profit_target: 0.30,
            stop_loss: 0.15,
        }
    }
}

/// Contains parameters for a single backtest run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Backtest {
    /// The initial starting capital for the simulation.
    pub initial_capital: Decimal,
    /// Fraction of initial capital a full-strength signal may allocate.
    pub max_allocation: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub unpriced_valuation: UnpricedValuation,
    /// The default start date for the backtest period.
    pub start_date: Option<NaiveDate>,
    /// The default end date for the backtest period.
    pub end_date: Option<NaiveDate>,
}

impl Default for Backtest {
    fn default() -> Self {
        Self {
            initial_capital: dec!(1000000),
            max_allocation: 0.1,
            buy_threshold: 0.3,
            sell_threshold: 0.3,
            unpriced_valuation: UnpricedValuation::Zero,
            start_date: None,
            end_date: None,
        }
    }
}

/// The built-in stock universes the screener knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MarketSegment {
    Large,
    Mid,
    Small,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Screener {
    pub max_workers: usize,
    /// Calendar days of history fetched per symbol.
    pub lookback_days: i64,
    pub default_segment: MarketSegment,
    pub default_count: usize,
}

impl Default for Screener {
    fn default() -> Self {
        Self {
            max_workers: 5,
            lookback_days: 180,
            default_segment: MarketSegment::Large,
            default_count: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding one `<SYMBOL>.csv` file per symbol.
    pub directory: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

fn fraction(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

impl Config {
    /// Rejects settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for w in &self.aggregation.weights {
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "weight for '{}' must be a non-negative number, got {}",
                    w.name, w.weight
                )));
            }
        }
        if self.aggregation.analyzers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one analyzer must be enabled".to_string(),
            ));
        }

        fraction("risk.max_position_size", self.risk.max_position_size)?;
        fraction("risk.stop_loss_threshold", self.risk.stop_loss_threshold)?;
        fraction("risk.max_drawdown_limit", self.risk.max_drawdown_limit)?;
        fraction("backtest.max_allocation", self.backtest.max_allocation)?;
        fraction("backtest.buy_threshold", self.backtest.buy_threshold)?;
        fraction("backtest.sell_threshold", self.backtest.sell_threshold)?;

        if self.backtest.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "backtest.initial_capital must be positive".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start > end {
                return Err(ConfigError::ValidationError(format!(
                    "backtest.start_date {start} is after end_date {end}"
                )));
            }
        }
        if self.screener.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "screener.max_workers must be at least 1".to_string(),
            ));
        }
        if self.screener.lookback_days <= 0 {
            return Err(ConfigError::ValidationError(
                "screener.lookback_days must be positive".to_string(),
            ));
        }

        let t = &self.technicals;
        if t.short_window == 0 || t.short_window >= t.long_window {
            return Err(ConfigError::ValidationError(format!(
                "technicals.short_window ({}) must be positive and below long_window ({})",
                t.short_window, t.long_window
            )));
        }
        if t.macd_fast >= t.macd_slow {
            return Err(ConfigError::ValidationError(
                "technicals.macd_fast must be below macd_slow".to_string(),
            ));
        }
        Ok(())
    }
}
