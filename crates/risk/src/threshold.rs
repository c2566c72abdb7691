use crate::error::RiskError;
use crate::{PositionSizer, factor, shares_i64, whole_shares};
use aggregator::AggregatedSignal;
use configuration::Backtest;
use rust_decimal::Decimal;

/// The backtest sizing policy.
///
/// Above the buy threshold the position is topped up to
/// `|scalar| × initial_capital × max_allocation` (never reduced). Below the
/// negative sell threshold the entire position is sold. Anything in between
/// is a no-op.
#[derive(Debug, Clone)]
pub struct ThresholdSizer {
    initial_capital: Decimal,
    max_allocation: f64,
    buy_threshold: f64,
    sell_threshold: f64,
}

impl ThresholdSizer {
    pub fn new(
        initial_capital: Decimal,
        max_allocation: f64,
        buy_threshold: f64,
        sell_threshold: f64,
    ) -> Result<Self, RiskError> {
        if initial_capital <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "initial_capital must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("max_allocation", max_allocation),
            ("buy_threshold", buy_threshold),
            ("sell_threshold", sell_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RiskError::InvalidParameters(format!(
                    "{name} must be between 0 and 1"
                )));
            }
        }
        Ok(Self {
            initial_capital,
            max_allocation,
            buy_threshold,
            sell_threshold,
        })
    }

    pub fn from_config(params: &Backtest) -> Result<Self, RiskError> {
        Self::new(
            params.initial_capital,
            params.max_allocation,
            params.buy_threshold,
            params.sell_threshold,
        )
    }

    /// Sizing from a bare scalar in [-1, 1].
    pub fn delta_for_scalar(
        &self,
        scalar: f64,
        price: Decimal,
        current_shares: u64,
    ) -> Result<i64, RiskError> {
        if price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice(price));
        }
        let current = shares_i64(current_shares)?;

        if scalar > self.buy_threshold {
            let strength = factor(scalar.min(1.0))?;
            let target_value = strength * self.initial_capital * factor(self.max_allocation)?;
            let target_shares = whole_shares(target_value, price)?;
            Ok((target_shares - current).max(0))
        } else if scalar < -self.sell_threshold {
            Ok(-current)
        } else {
            Ok(0)
        }
    }
}

impl PositionSizer for ThresholdSizer {
    fn target_delta(
        &self,
        consensus: &AggregatedSignal,
        price: Decimal,
        current_shares: u64,
    ) -> Result<i64, RiskError> {
        self.delta_for_scalar(consensus.weighted_signal, price, current_shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::consensus;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sizer() -> ThresholdSizer {
        ThresholdSizer::new(dec!(1000000), 0.1, 0.3, 0.3).unwrap()
    }

    #[test]
    fn strong_buy_targets_ten_percent_of_capital() {
        // 0.5 x 1 000 000 x 0.1 = 50 000 at 100 = 500 shares
        assert_eq!(sizer().delta_for_scalar(0.5, dec!(100), 0).unwrap(), 500);
    }

    #[test]
    fn buy_tops_up_but_never_trims() {
        assert_eq!(sizer().delta_for_scalar(0.5, dec!(100), 200).unwrap(), 300);
        assert_eq!(sizer().delta_for_scalar(0.5, dec!(100), 800).unwrap(), 0);
    }

    #[test]
    fn strong_sell_exits_everything() {
        assert_eq!(sizer().delta_for_scalar(-0.31, dec!(100), 742).unwrap(), -742);
        assert_eq!(sizer().delta_for_scalar(-0.9, dec!(100), 0).unwrap(), 0);
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(sizer().delta_for_scalar(0.3, dec!(100), 0).unwrap(), 0);
        assert_eq!(sizer().delta_for_scalar(-0.3, dec!(100), 10).unwrap(), 0);
    }

    #[test]
    fn trait_reads_weighted_signal() {
        let c = consensus(0.6, Vec::new());
        assert_eq!(sizer().target_delta(&c, dec!(200), 0).unwrap(), 300);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(ThresholdSizer::new(dec!(0), 0.1, 0.3, 0.3).is_err());
        assert!(ThresholdSizer::new(dec!(1000), 1.5, 0.3, 0.3).is_err());
    }

    proptest! {
        #[test]
        fn never_sells_more_than_held(
            scalar in -1.0f64..=1.0,
            price_cents in 1u32..1_000_000,
            held in 0u64..100_000,
        ) {
            let price = Decimal::from(price_cents) / dec!(100);
            let delta = sizer().delta_for_scalar(scalar, price, held).unwrap();
            prop_assert!(delta >= -(held as i64));
        }
    }
}
