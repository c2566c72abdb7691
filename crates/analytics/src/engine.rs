use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A stateless calculator for deriving performance metrics from a value series.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `equity_curve` - Date-ordered portfolio values, one per trading day.
    /// * `initial_capital` - The starting capital the return is measured against.
    pub fn calculate(
        &self,
        equity_curve: &[(NaiveDate, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::DivisionByZero("total_return".to_string()));
        }
        let mut report = PerformanceReport::new(initial_capital);
        let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
            return Ok(report);
        };

        report.start_date = Some(first.0);
        report.end_date = Some(last.0);
        report.trading_days = equity_curve.len();

        self.calculate_profitability(last.1, initial_capital, &mut report)?;
        self.calculate_drawdown(equity_curve, &mut report)?;
        self.calculate_ratios(equity_curve, &mut report);

        tracing::debug!(
            total_return = report.total_return,
            sharpe = ?report.sharpe_ratio,
            max_drawdown = report.max_drawdown,
            "Performance calculated"
        );
        Ok(report)
    }

    fn calculate_profitability(
        &self,
        final_value: Decimal,
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        report.final_value = final_value;
        report.total_net_profit = final_value - initial_capital;
        report.total_return = to_f64(report.total_net_profit / initial_capital, "total_return")?;
        Ok(())
    }

    /// Calculates the deepest fall from a running peak.
    fn calculate_drawdown(
        &self,
        equity_curve: &[(NaiveDate, Decimal)],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        let mut peak = equity_curve[0].1;
        let mut worst_ratio = Decimal::ZERO;
        let mut worst_value = Decimal::ZERO;

        for &(_date, value) in equity_curve {
            if value > peak {
                peak = value;
            }
            if peak > Decimal::ZERO {
                worst_ratio = worst_ratio.min(value / peak - Decimal::ONE);
            }
            worst_value = worst_value.max(peak - value);
        }

        report.max_drawdown = to_f64(worst_ratio, "max_drawdown")?;
        report.max_drawdown_value = worst_value;
        Ok(())
    }

    /// Sharpe ratio and volatility from day-over-day returns.
    fn calculate_ratios(&self, equity_curve: &[(NaiveDate, Decimal)], report: &mut PerformanceReport) {
        let returns = daily_returns(equity_curve);
        if returns.len() < 2 {
            return;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let std = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

        if std.is_finite() {
            report.annualized_volatility = Some(std * TRADING_DAYS_PER_YEAR.sqrt());
        }
        if std > 0.0 && std.is_finite() {
            report.sharpe_ratio = Some(TRADING_DAYS_PER_YEAR.sqrt() * mean / std);
        }
    }
}

/// Fractional change between consecutive points. A zero prior value yields no return.
fn daily_returns(equity_curve: &[(NaiveDate, Decimal)]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| !w[0].1.is_zero())
        .filter_map(|w| (w[1].1 / w[0].1 - Decimal::ONE).to_f64())
        .collect()
}

fn to_f64(value: Decimal, metric: &str) -> Result<f64, AnalyticsError> {
    value
        .to_f64()
        .ok_or_else(|| AnalyticsError::Calculation(format!("{metric} is not representable")))
}
