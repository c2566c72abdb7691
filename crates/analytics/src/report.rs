use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Return and risk statistics for one valuation history.
///
/// Fractions are plain ratios: a `total_return` of `0.05` is +5 %, a
/// `max_drawdown` of `-0.1` is a 10 % peak-to-trough loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trading_days: usize,

    // I. Profitability
    pub initial_value: Decimal,
    pub final_value: Decimal,
    pub total_net_profit: Decimal,
    /// `final_value / initial_value - 1`.
    pub total_return: f64,

    // II. Risk and Drawdown
    /// `√252 × mean / sample std` of daily returns, `None` when undefined.
    pub sharpe_ratio: Option<f64>,
    pub annualized_volatility: Option<f64>,
    /// `min(value / running_max - 1)`, zero or negative.
    pub max_drawdown: f64,
    /// Largest peak-to-trough loss in currency.
    pub max_drawdown_value: Decimal,
}

impl PerformanceReport {
    /// A flat report: nothing happened to `initial_value`.
    pub fn new(initial_value: Decimal) -> Self {
        Self {
            start_date: None,
            end_date: None,
            trading_days: 0,
            initial_value,
            final_value: initial_value,
            total_net_profit: Decimal::ZERO,
            total_return: 0.0,
            sharpe_ratio: None,
            annualized_volatility: None,
            max_drawdown: 0.0,
            max_drawdown_value: Decimal::ZERO,
        }
    }
}
