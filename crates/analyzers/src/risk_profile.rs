use crate::Analyzer;
use crate::error::AnalyzerError;
use crate::stats::{self, TRADING_DAYS};
use configuration::RiskSettings;
use core_types::{Direction, PriceBar, PriceHistory, RiskAssessment, Signal, SignalDetails};
use std::collections::HashMap;

const MAX_SCORE: i32 = 5;
const RECENT_WINDOW: usize = 20;

/// Risk metrics for one symbol over the supplied window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub beta: f64,
    pub var_95: f64,
    pub recent_volatility: f64,
}

/// Grades a symbol's return profile and recommends a position ceiling.
///
/// The recommended `position_size` is the contract the live sizer depends on:
/// it starts at the configured maximum, is scaled down for each risk flag
/// raised, scaled by confidence and finally capped at the maximum again.
pub struct RiskAnalyzer {
    params: RiskSettings,
    benchmark: Option<PriceHistory>,
}

impl RiskAnalyzer {
    pub const NAME: &'static str = "Risk Manager";

    pub fn new(params: RiskSettings) -> Self {
        Self {
            params,
            benchmark: None,
        }
    }

    /// Beta is measured against this history. Without one, beta is taken as 1.
    pub fn with_benchmark(mut self, benchmark: PriceHistory) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    pub fn metrics(&self, history: &[PriceBar]) -> Result<RiskMetrics, AnalyzerError> {
        let closes = stats::closes(history)?;
        let returns = stats::pct_changes(&closes);

        let volatility = stats::annualized_volatility(&returns);
        let sharpe_ratio = if volatility != 0.0 {
            (stats::mean(&returns) * TRADING_DAYS - self.params.risk_free_rate) / volatility
        } else {
            0.0
        };

        let mut growth = 1.0;
        let mut peak = f64::MIN;
        let mut max_drawdown: f64 = 0.0;
        for r in &returns {
            growth *= 1.0 + r;
            peak = peak.max(growth);
            max_drawdown = max_drawdown.min(growth / peak - 1.0);
        }

        let recent = &returns[returns.len().saturating_sub(RECENT_WINDOW)..];

        Ok(RiskMetrics {
            volatility,
            sharpe_ratio,
            max_drawdown,
            beta: self.beta(history, &returns)?,
            var_95: stats::percentile(&returns, 5.0),
            recent_volatility: stats::annualized_volatility(recent),
        })
    }

    /// Covariance with the benchmark over the dates both series share,
    /// divided by the benchmark variance. Falls back to 1.
    fn beta(&self, history: &[PriceBar], returns: &[f64]) -> Result<f64, AnalyzerError> {
        let (Some(benchmark), Some(last)) = (&self.benchmark, history.last()) else {
            return Ok(1.0);
        };
        let bench_bars = benchmark.until(last.date);
        let bench_closes = stats::closes(bench_bars)?;
        let bench_returns: HashMap<_, _> = bench_bars
            .iter()
            .skip(1)
            .map(|b| b.date)
            .zip(stats::pct_changes(&bench_closes))
            .collect();

        let (stock, market): (Vec<f64>, Vec<f64>) = history
            .iter()
            .skip(1)
            .zip(returns)
            .filter_map(|(bar, r)| bench_returns.get(&bar.date).map(|m| (*r, *m)))
            .unzip();

        let market_var = stats::sample_std(&market).powi(2);
        if stock.len() < 2 || market_var == 0.0 {
            return Ok(1.0);
        }
        Ok(stats::sample_cov(&stock, &market) / market_var)
    }

    fn position_size(&self, m: &RiskMetrics, confidence: f64) -> f64 {
        let mut size = self.params.max_position_size;
        if m.volatility > 0.4 {
            size *= 0.5;
        } else if m.volatility > 0.3 {
            size *= 0.7;
        }
        if m.beta > self.params.beta_threshold {
            size *= 0.7;
        }
        if m.sharpe_ratio < self.params.min_sharpe_ratio {
            size *= 0.8;
        }
        if m.max_drawdown.abs() > self.params.max_drawdown_limit {
            size *= 0.6;
        }
        (size * confidence).min(self.params.max_position_size)
    }
}

impl Analyzer for RiskAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
        if history.len() < 2 {
            return Err(AnalyzerError::InsufficientData {
                symbol: symbol.to_string(),
                needed: 2,
                available: history.len(),
            });
        }
        let m = self.metrics(history)?;
        let p = &self.params;
        let mut score = 0;
        let mut reasons = Vec::with_capacity(MAX_SCORE as usize);

        if m.volatility < 0.2 {
            score += 1;
            reasons.push(format!("Low volatility ({:.1}%)", m.volatility * 100.0));
        } else if m.volatility > 0.4 {
            score -= 1;
            reasons.push(format!("High volatility ({:.1}%)", m.volatility * 100.0));
        } else {
            reasons.push(format!("Moderate volatility ({:.1}%)", m.volatility * 100.0));
        }

        if m.sharpe_ratio > p.min_sharpe_ratio {
            score += 1;
            reasons.push(format!(
                "Good risk-adjusted returns (Sharpe: {:.2})",
                m.sharpe_ratio
            ));
        } else {
            score -= 1;
            reasons.push(format!(
                "Poor risk-adjusted returns (Sharpe: {:.2})",
                m.sharpe_ratio
            ));
        }

        if m.max_drawdown.abs() < p.max_drawdown_limit {
            score += 1;
            reasons.push(format!("Acceptable drawdown ({:.1}%)", m.max_drawdown * 100.0));
        } else {
            score -= 1;
            reasons.push(format!("Excessive drawdown ({:.1}%)", m.max_drawdown * 100.0));
        }

        if m.beta < p.beta_threshold {
            score += 1;
            reasons.push(format!("Moderate market sensitivity (Beta: {:.2})", m.beta));
        } else {
            score -= 1;
            reasons.push(format!("High market sensitivity (Beta: {:.2})", m.beta));
        }

        if m.recent_volatility < m.volatility {
            score += 1;
            reasons.push("Decreasing volatility trend".to_string());
        } else if m.recent_volatility > m.volatility * 1.2 {
            score -= 1;
            reasons.push("Increasing volatility trend".to_string());
        } else {
            reasons.push("Stable volatility trend".to_string());
        }

        let normalized = f64::from(score) / f64::from(MAX_SCORE);
        let confidence = normalized.abs();
        let position_size = self.position_size(&m, confidence);

        let (direction, action) = if normalized > 0.3 && m.sharpe_ratio > p.min_sharpe_ratio {
            (Direction::Buy, "RISK ACCEPTABLE")
        } else if normalized < -0.3 || m.sharpe_ratio < 0.0 {
            (Direction::Sell, "HIGH RISK")
        } else {
            (Direction::Hold, "MODERATE RISK")
        };

        let rationale = format!(
            "{action} with {:.1}% confidence. Recommended position size: {:.1}%. {}",
            confidence * 100.0,
            position_size * 100.0,
            reasons.join(" ")
        );
        tracing::debug!(analyzer = Self::NAME, symbol, %rationale, "Analyzer reasoning");

        Ok(
            Signal::new(direction, confidence, rationale)?.with_details(SignalDetails::Risk(
                RiskAssessment {
                    score,
                    max_score: MAX_SCORE,
                    position_size,
                    stop_loss: p.stop_loss_threshold,
                    volatility: m.volatility,
                    sharpe_ratio: m.sharpe_ratio,
                    max_drawdown: m.max_drawdown,
                    beta: m.beta,
                    var_95: m.var_95,
                    recent_volatility: m.recent_volatility,
                },
            )),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars_from_closes;
    use approx::assert_relative_eq;

    /// Prices that alternately move by `up` and `down` as fractional returns.
    fn zigzag(len: usize, up: f64, down: f64) -> Vec<f64> {
        let mut closes = vec![100.0];
        for i in 1..len {
            let r = if i % 2 == 1 { up } else { down };
            let last = closes[i - 1];
            closes.push(last * (1.0 + r));
        }
        closes
    }

    fn assessment(signal: &Signal) -> &RiskAssessment {
        signal.risk_assessment().expect("risk details")
    }

    #[test]
    fn single_bar_is_insufficient() {
        let bars = bars_from_closes(&[100.0]);
        let err = RiskAnalyzer::new(RiskSettings::default())
            .analyze("AAPL", &bars)
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InsufficientData { needed: 2, .. }));
    }

    #[test]
    fn calm_uptrend_is_acceptable_and_sized_by_confidence() {
        let bars = bars_from_closes(&zigzag(60, 0.01, -0.001));
        let signal = RiskAnalyzer::new(RiskSettings::default())
            .analyze("AAPL", &bars)
            .unwrap();
        let risk = assessment(&signal);

        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(risk.score, 4);
        assert_relative_eq!(signal.confidence, 0.8);
        assert_relative_eq!(risk.position_size, 0.16, epsilon = 1e-9);
        assert_relative_eq!(risk.beta, 1.0);
    }

    #[test]
    fn volatile_decline_is_high_risk_with_every_haircut() {
        let bars = bars_from_closes(&zigzag(60, -0.05, 0.01));
        let signal = RiskAnalyzer::new(RiskSettings::default())
            .analyze("TSLA", &bars)
            .unwrap();
        let risk = assessment(&signal);

        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(risk.score, -2);
        assert!(risk.volatility > 0.4);
        assert!(risk.max_drawdown < -0.25);
        // 0.20 x 0.5 (volatility) x 0.8 (sharpe) x 0.6 (drawdown) x 0.4 (confidence)
        assert_relative_eq!(risk.position_size, 0.0192, epsilon = 1e-9);
    }

    #[test]
    fn position_size_never_exceeds_maximum() {
        let bars = bars_from_closes(&zigzag(80, 0.02, -0.002));
        let signal = RiskAnalyzer::new(RiskSettings::default())
            .analyze("AAPL", &bars)
            .unwrap();
        assert!(assessment(&signal).position_size <= 0.20);
    }

    #[test]
    fn beta_is_measured_against_benchmark() {
        let market = zigzag(40, 0.01, -0.008);
        let market_returns = stats::pct_changes(&market);
        let mut stock = vec![50.0];
        for r in &market_returns {
            let last = *stock.last().unwrap();
            stock.push(last * (1.0 + 2.0 * r));
        }
        let benchmark = PriceHistory::new("SPY", bars_from_closes(&market)).unwrap();
        let analyzer = RiskAnalyzer::new(RiskSettings::default()).with_benchmark(benchmark);

        let metrics = analyzer.metrics(&bars_from_closes(&stock)).unwrap();
        assert_relative_eq!(metrics.beta, 2.0, epsilon = 1e-6);
    }
}
