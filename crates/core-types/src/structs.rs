use crate::enums::{Direction, OrderSide};
use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily OHLCV row of a price table.
///
/// Field names are PascalCase on the wire so that the common
/// `Date,Open,High,Low,Close,Volume` CSV layout deserializes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    /// The closing price as `f64`, for indicator libraries that work in floats.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }
}

/// A date-ordered price table for a single symbol.
///
/// Dates are unique and strictly ascending. Consumers receive bars as a shared
/// slice, so an analyzer can never mutate the history it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Builds a history, sorting the bars by date and rejecting duplicate dates.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Result<Self, CoreError> {
        let symbol = symbol.into();
        bars.sort_by_key(|bar| bar.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(CoreError::DuplicateDate {
                symbol,
                date: pair[0].date,
            });
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// All bars dated on or before `date`. This is the no-look-ahead view.
    pub fn until(&self, date: NaiveDate) -> &[PriceBar] {
        let end = self.bars.partition_point(|bar| bar.date <= date);
        &self.bars[..end]
    }

    /// The bar dated exactly `date`, if the symbol traded that day.
    pub fn bar_on(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.bars
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .map(|idx| &self.bars[idx])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|bar| bar.date)
    }
}

/// Analyzer-family specific detail attached to a [`Signal`].
///
/// The variant is the family tag. Consumers that need a contractual field (the
/// position sizer needs `position_size`) match on the variant instead of
/// looking up a loose key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum SignalDetails {
    #[default]
    None,
    Technical(TechnicalDetails),
    Risk(RiskAssessment),
    PriceTarget(PriceTargetDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub score: i32,
    pub max_score: i32,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub stoch_k: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
}

/// Output of the risk family. `position_size` is the maximum fraction of
/// initial capital the risk model allows for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: i32,
    pub max_score: i32,
    pub position_size: f64,
    pub stop_loss: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub beta: f64,
    pub var_95: f64,
    pub recent_volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargetDetails {
    pub current_price: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss_price: f64,
    pub support: f64,
    pub resistance: f64,
}

/// One analyzer's opinion for one symbol at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    /// Audit text only. Never used for control flow.
    pub rationale: String,
    pub details: SignalDetails,
}

impl Signal {
    /// Creates a signal, clamping `confidence` into `[0, 1]`.
    ///
    /// A NaN confidence is rejected rather than clamped, since it would poison
    /// every weighted sum it enters.
    pub fn new(
        direction: Direction,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if confidence.is_nan() {
            return Err(CoreError::InvalidInput(
                "confidence".to_string(),
                "must be a number".to_string(),
            ));
        }
        Ok(Self {
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            details: SignalDetails::None,
        })
    }

    pub fn with_details(mut self, details: SignalDetails) -> Self {
        self.details = details;
        self
    }

    /// `direction × confidence`, the per-analyzer contribution before weighting.
    pub fn score(&self) -> f64 {
        self.direction.value() * self.confidence
    }

    pub fn risk_assessment(&self) -> Option<&RiskAssessment> {
        match &self.details {
            SignalDetails::Risk(risk) => Some(risk),
            _ => None,
        }
    }

    pub fn price_target(&self) -> Option<&PriceTargetDetails> {
        match &self.details {
            SignalDetails::PriceTarget(target) => Some(target),
            _ => None,
        }
    }
}

/// A requested share movement. Positive `delta` buys, negative sells, zero is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub symbol: String,
    pub delta: i64,
    pub price: Decimal,
}

impl TradeOrder {
    pub fn new(symbol: impl Into<String>, delta: i64, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            delta,
            price,
        }
    }

    pub fn side(&self) -> Option<OrderSide> {
        match self.delta.signum() {
            1 => Some(OrderSide::Buy),
            -1 => Some(OrderSide::Sell),
            _ => None,
        }
    }

    /// Absolute number of shares moved.
    pub fn quantity(&self) -> u64 {
        self.delta.unsigned_abs()
    }
}

/// A held long position. Only exists while `shares > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub shares: u64,
    /// Weighted-average per-share acquisition cost.
    pub cost_basis: Decimal,
}

impl Position {
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.shares) * price
    }
}

/// A read-only copy of the ledger's cash and holdings at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub positions: BTreeMap<String, Position>,
}
