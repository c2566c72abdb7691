//! Position sizing: turning a consensus signal into a share delta.
//!
//! Two policies live here. `RiskCeilingSizer` is used on the live path and
//! caps allocation by the risk analyzer's recommendation. `ThresholdSizer` is
//! the backtest policy, with a fixed allocation cap, entry/exit thresholds and
//! whole-position exits.

use aggregator::AggregatedSignal;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

pub mod error;
pub mod risk_ceiling;
pub mod threshold;

pub use error::RiskError;
pub use risk_ceiling::RiskCeilingSizer;
pub use threshold::ThresholdSizer;

/// Computes how many shares to buy (positive) or sell (negative).
pub trait PositionSizer: Send + Sync {
    fn target_delta(
        &self,
        consensus: &AggregatedSignal,
        price: Decimal,
        current_shares: u64,
    ) -> Result<i64, RiskError>;
}

/// Converts a `[0, 1]` float factor into a `Decimal`, rounding away binary noise.
pub(crate) fn factor(value: f64) -> Result<Decimal, RiskError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(10))
        .ok_or_else(|| RiskError::Calculation(format!("cannot represent {value} as a decimal")))
}

/// `floor(value / price)` as a share count.
pub(crate) fn whole_shares(value: Decimal, price: Decimal) -> Result<i64, RiskError> {
    value
        .checked_div(price)
        .and_then(|shares| shares.floor().to_i64())
        .ok_or_else(|| RiskError::Calculation(format!("cannot size {value} at price {price}")))
}

pub(crate) fn shares_i64(shares: u64) -> Result<i64, RiskError> {
    i64::try_from(shares)
        .map_err(|_| RiskError::Calculation(format!("share count {shares} out of range")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use aggregator::{AggregatedSignal, WeightedSignal};
    use core_types::{Direction, RiskAssessment, Signal, SignalDetails};

    pub fn risk_signal(position_size: f64) -> Signal {
        Signal::new(Direction::Hold, 0.5, "risk")
            .unwrap()
            .with_details(SignalDetails::Risk(RiskAssessment {
                score: 0,
                max_score: 5,
                position_size,
                stop_loss: 0.15,
                volatility: 0.2,
                sharpe_ratio: 1.0,
                max_drawdown: -0.1,
                beta: 1.0,
                var_95: -0.02,
                recent_volatility: 0.2,
            }))
    }

    pub fn consensus(weighted_signal: f64, entries: Vec<(&str, Signal)>) -> AggregatedSignal {
        AggregatedSignal {
            symbol: "AAPL".to_string(),
            signals: entries
                .into_iter()
                .map(|(name, signal)| WeightedSignal {
                    analyzer: name.to_string(),
                    signal,
                    weight: 1.0,
                    normalized_weight: 1.0,
                })
                .collect(),
            failures: Vec::new(),
            weighted_signal,
            weighted_confidence: weighted_signal.abs(),
        }
    }
}
