use crate::Analyzer;
use crate::error::AnalyzerError;
use crate::stats::{self, to_f64};
use configuration::PriceTargetParams;
use core_types::{Direction, PriceBar, PriceTargetDetails, Signal, SignalDetails};

/// Blend weights for the technical, value and volatility targets.
const TECHNICAL_WEIGHT: f64 = 0.3;
const VALUE_WEIGHT: f64 = 0.5;
const VOLATILITY_WEIGHT: f64 = 0.2;

/// Derives entry and exit prices and signals when the close crosses them.
///
/// Three target pairs are blended: support/resistance from local extrema,
/// value targets around the current price (fundamental data is not available
/// to this analyzer), and annualized-volatility bands.
pub struct PriceTargetAnalyzer {
    params: PriceTargetParams,
}

impl PriceTargetAnalyzer {
    pub const NAME: &'static str = "Price Target Analysis";

    pub fn new(params: PriceTargetParams) -> Result<Self, AnalyzerError> {
        if params.support_window == 0 || params.volatility_window == 0 {
            return Err(AnalyzerError::InvalidParameters(
                "Price target windows cannot be zero".to_string(),
            ));
        }
        Ok(Self { params })
    }

    /// Recency-weighted average of strict local extrema (two bars each side).
    /// Falls back to the window's absolute low and high.
    fn support_resistance(&self, history: &[PriceBar]) -> Result<(f64, f64), AnalyzerError> {
        let recent = &history[history.len().saturating_sub(self.params.support_window)..];
        let highs: Vec<f64> = recent
            .iter()
            .map(|b| to_f64(b.high, "high"))
            .collect::<Result<_, _>>()?;
        let lows: Vec<f64> = recent
            .iter()
            .map(|b| to_f64(b.low, "low"))
            .collect::<Result<_, _>>()?;

        let mut resistance_levels = Vec::new();
        let mut support_levels = Vec::new();
        for i in 2..recent.len().saturating_sub(2) {
            let neighbours = [i - 2, i - 1, i + 1, i + 2];
            if neighbours.iter().all(|&j| highs[i] > highs[j]) {
                resistance_levels.push(highs[i]);
            }
            if neighbours.iter().all(|&j| lows[i] < lows[j]) {
                support_levels.push(lows[i]);
            }
        }

        let support = recency_weighted(&support_levels)
            .unwrap_or_else(|| lows.iter().copied().fold(f64::INFINITY, f64::min));
        let resistance = recency_weighted(&resistance_levels)
            .unwrap_or_else(|| highs.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        Ok((support, resistance))
    }

    fn value_targets(&self, price: f64) -> (f64, f64) {
        (
            price * (1.0 - self.params.margin_of_safety),
            price * (1.0 + self.params.profit_target),
        )
    }

    fn volatility_bands(&self, closes: &[f64], price: f64) -> (f64, f64) {
        let window = &closes[closes.len().saturating_sub(self.params.volatility_window)..];
        let vol = stats::annualized_volatility(&stats::pct_changes(window));
        (price * (1.0 - vol), price * (1.0 + vol))
    }
}

/// Weights 1..=n, so later levels count more.
fn recency_weighted(levels: &[f64]) -> Option<f64> {
    if levels.is_empty() {
        return None;
    }
    let (sum, weights) = levels
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(s, w), (i, level)| {
            let weight = (i + 1) as f64;
            (s + level * weight, w + weight)
        });
    Some(sum / weights)
}

impl Analyzer for PriceTargetAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
        let Some(last) = history.last() else {
            return Err(AnalyzerError::InsufficientData {
                symbol: symbol.to_string(),
                needed: 1,
                available: 0,
            });
        };
        let price = to_f64(last.close, "close")?;
        let closes = stats::closes(history)?;

        let (support, resistance) = self.support_resistance(history)?;
        let (value_entry, value_exit) = self.value_targets(price);
        let (vol_entry, vol_exit) = self.volatility_bands(&closes, price);

        let entry_price = TECHNICAL_WEIGHT * support
            + VALUE_WEIGHT * value_entry
            + VOLATILITY_WEIGHT * vol_entry;
        let exit_price = TECHNICAL_WEIGHT * resistance
            + VALUE_WEIGHT * value_exit
            + VOLATILITY_WEIGHT * vol_exit;
        let stop_loss_price = entry_price * (1.0 - self.params.stop_loss);

        let direction = if price <= entry_price {
            Direction::Buy
        } else if price >= exit_price {
            Direction::Sell
        } else {
            Direction::Hold
        };

        let range = exit_price - entry_price;
        let confidence = match direction {
            Direction::Buy if range > 0.0 => ((entry_price - price) / range + 0.5).min(1.0),
            Direction::Sell if range > 0.0 => ((price - exit_price) / range + 0.5).min(1.0),
            _ => 0.5,
        };

        let mut reasons = vec![
            format!("Current price: ${price:.2}"),
            format!(
                "Entry target: ${entry_price:.2} (Support: ${support:.2}, Value: ${value_entry:.2}, Vol: ${vol_entry:.2})"
            ),
            format!(
                "Exit target: ${exit_price:.2} (Resistance: ${resistance:.2}, Value: ${value_exit:.2}, Vol: ${vol_exit:.2})"
            ),
            format!("Stop loss: ${stop_loss_price:.2}"),
        ];
        match direction {
            Direction::Buy => reasons.push(format!(
                "Potential upside: {:.1}%",
                (exit_price / price - 1.0) * 100.0
            )),
            Direction::Sell => reasons.push(format!(
                "Potential downside: {:.1}%",
                (entry_price / price - 1.0) * 100.0
            )),
            Direction::Hold => {}
        }

        let rationale = format!(
            "{direction} recommendation with {:.1}% confidence. {}",
            confidence * 100.0,
            reasons.join(" ")
        );
        tracing::debug!(analyzer = Self::NAME, symbol, %rationale, "Analyzer reasoning");

        Ok(
            Signal::new(direction, confidence, rationale)?.with_details(SignalDetails::PriceTarget(
                PriceTargetDetails {
                    current_price: price,
                    entry_price,
                    exit_price,
                    stop_loss_price,
                    support,
                    resistance,
                },
            )),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bar, bars_from_closes};
    use approx::assert_relative_eq;

    fn analyzer(params: PriceTargetParams) -> PriceTargetAnalyzer {
        PriceTargetAnalyzer::new(params).unwrap()
    }

    #[test]
    fn empty_history_is_insufficient() {
        let err = analyzer(PriceTargetParams::default())
            .analyze("AAPL", &[])
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InsufficientData { .. }));
    }

    #[test]
    fn flat_prices_sit_between_targets() {
        let bars = bars_from_closes(&[100.0; 30]);
        let signal = analyzer(PriceTargetParams::default())
            .analyze("AAPL", &bars)
            .unwrap();
        let target = signal.price_target().unwrap();

        // 0.3 x 100 + 0.5 x 80 + 0.2 x 100
        assert_relative_eq!(target.entry_price, 90.0, epsilon = 1e-9);
        // 0.3 x 100 + 0.5 x 130 + 0.2 x 100
        assert_relative_eq!(target.exit_price, 115.0, epsilon = 1e-9);
        assert_relative_eq!(target.stop_loss_price, 76.5, epsilon = 1e-9);
        assert_eq!(signal.direction, Direction::Hold);
        assert_relative_eq!(signal.confidence, 0.5);
    }

    #[test]
    fn close_under_weighted_support_is_a_buy() {
        let mut bars = Vec::new();
        for day in 0..20u32 {
            let low = if matches!(day, 2 | 7 | 12) { 100.0 } else { 110.0 };
            bars.push(bar(day, 110.0, 120.0, low));
        }
        bars.push(bar(20, 70.0, 120.0, 70.0));
        let params = PriceTargetParams {
            volatility_window: 2,
            ..PriceTargetParams::default()
        };

        let signal = analyzer(params).analyze("AAPL", &bars).unwrap();
        let target = signal.price_target().unwrap();

        assert_relative_eq!(target.support, 100.0, epsilon = 1e-9);
        assert_relative_eq!(target.resistance, 120.0, epsilon = 1e-9);
        assert_relative_eq!(target.entry_price, 72.0, epsilon = 1e-9);
        assert_relative_eq!(target.exit_price, 95.5, epsilon = 1e-9);
        assert_eq!(signal.direction, Direction::Buy);
        assert_relative_eq!(signal.confidence, 2.0 / 23.5 + 0.5, epsilon = 1e-9);
    }
}
