use crate::error::RiskError;
use crate::{PositionSizer, factor, shares_i64, whole_shares};
use aggregator::AggregatedSignal;
use configuration::Config;
use rust_decimal::Decimal;

/// Sizes a position as a fraction of initial capital, where the fraction is
/// the risk analyzer's recommended `position_size` scaled by consensus strength.
///
/// `target_value = initial_capital × position_size × |weighted_signal|`
#[derive(Debug, Clone)]
pub struct RiskCeilingSizer {
    initial_capital: Decimal,
    risk_analyzer: String,
}

impl RiskCeilingSizer {
    pub fn new(initial_capital: Decimal, risk_analyzer: impl Into<String>) -> Result<Self, RiskError> {
        if initial_capital <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "initial_capital must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            initial_capital,
            risk_analyzer: risk_analyzer.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RiskError> {
        Self::new(
            config.backtest.initial_capital,
            config.aggregation.risk_analyzer.clone(),
        )
    }

    pub fn risk_analyzer(&self) -> &str {
        &self.risk_analyzer
    }

    /// The risk analyzer's ceiling, clamped into [0, 1]. NaN reads as 0.
    fn ceiling(&self, consensus: &AggregatedSignal) -> Result<f64, RiskError> {
        let missing = || RiskError::MissingRiskSignal {
            symbol: consensus.symbol.clone(),
            analyzer: self.risk_analyzer.clone(),
        };
        let assessment = consensus
            .signal_for(&self.risk_analyzer)
            .and_then(|entry| entry.signal.risk_assessment())
            .ok_or_else(missing)?;

        let size = assessment.position_size;
        Ok(if size.is_nan() { 0.0 } else { size.clamp(0.0, 1.0) })
    }
}

impl PositionSizer for RiskCeilingSizer {
    fn target_delta(
        &self,
        consensus: &AggregatedSignal,
        price: Decimal,
        current_shares: u64,
    ) -> Result<i64, RiskError> {
        if price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice(price));
        }
        let ceiling = self.ceiling(consensus)?;
        let strength = consensus.weighted_signal.abs().min(1.0);

        let target_value = self.initial_capital * factor(ceiling)? * factor(strength)?;
        let target_shares = whole_shares(target_value, price)?;
        let delta = target_shares - shares_i64(current_shares)?;

        tracing::debug!(
            symbol = %consensus.symbol,
            ceiling,
            strength,
            %target_value,
            target_shares,
            delta,
            "Risk-ceiling sizing"
        );
        Ok(delta)
    }
}
