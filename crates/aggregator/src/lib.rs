use analyzers::{Analyzer, AnalyzerError};
use configuration::Aggregation;
use core_types::{PriceBar, Signal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod error;

pub use error::AggregationError;

/// How each surviving analyzer's weight is chosen before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightScheme {
    /// Fixed weight per analyzer name. Unlisted analyzers weigh 0.
    Static(HashMap<String, f64>),
    /// Every surviving analyzer weighs the same.
    Equal,
}

/// A signal annotated with the weight it carried in the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSignal {
    pub analyzer: String,
    pub signal: Signal,
    pub weight: f64,
    /// `weight / Σ surviving weights`.
    pub normalized_weight: f64,
}

/// An analyzer that errored and was left out of the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub analyzer: String,
    pub error: String,
}

/// The combined opinion of all surviving analyzers for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSignal {
    pub symbol: String,
    pub signals: Vec<WeightedSignal>,
    pub failures: Vec<AnalyzerFailure>,
    /// `Σ direction × confidence × normalized_weight`, within [-1, 1].
    pub weighted_signal: f64,
    /// `Σ confidence × normalized_weight`, within [0, 1].
    pub weighted_confidence: f64,
}

impl AggregatedSignal {
    pub fn signal_for(&self, analyzer: &str) -> Option<&WeightedSignal> {
        self.signals.iter().find(|s| s.analyzer == analyzer)
    }
}

/// Merges independent analyzer opinions into one weighted consensus.
///
/// A failing analyzer is logged and excluded: it contributes neither a signal
/// nor weight, and the remaining weights are renormalized. The aggregation
/// only fails when nothing with positive weight survives.
#[derive(Debug, Clone)]
pub struct SignalAggregator {
    scheme: WeightScheme,
}

impl SignalAggregator {
    pub fn new(weights: HashMap<String, f64>) -> Result<Self, AggregationError> {
        if let Some((name, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(AggregationError::InvalidWeight {
                analyzer: name.clone(),
                weight: *w,
            });
        }
        Ok(Self {
            scheme: WeightScheme::Static(weights),
        })
    }

    pub fn from_config(config: &Aggregation) -> Result<Self, AggregationError> {
        Self::new(config.weight_map())
    }

    /// Plain mean of `direction × confidence` over the survivors.
    pub fn equal_weight() -> Self {
        Self {
            scheme: WeightScheme::Equal,
        }
    }

    pub fn scheme(&self) -> &WeightScheme {
        &self.scheme
    }

    fn weight_of(&self, analyzer: &str) -> f64 {
        match &self.scheme {
            WeightScheme::Static(weights) => weights.get(analyzer).copied().unwrap_or(0.0),
            WeightScheme::Equal => 1.0,
        }
    }

    /// Runs every analyzer on `history` and combines the outcomes.
    pub fn aggregate(
        &self,
        symbol: &str,
        history: &[PriceBar],
        analyzers: &[Box<dyn Analyzer>],
    ) -> Result<AggregatedSignal, AggregationError> {
        let outcomes = analyzers
            .iter()
            .map(|a| (a.name().to_string(), a.analyze(symbol, history)))
            .collect();
        self.combine(symbol, outcomes)
    }

    /// Combines already-computed analyzer outcomes, keyed by analyzer name.
    pub fn combine(
        &self,
        symbol: &str,
        outcomes: Vec<(String, Result<Signal, AnalyzerError>)>,
    ) -> Result<AggregatedSignal, AggregationError> {
        let mut survivors = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (analyzer, outcome) in outcomes {
            match outcome {
                Ok(signal) => {
                    let weight = self.weight_of(&analyzer);
                    survivors.push((analyzer, signal, weight));
                }
                Err(e) => {
                    tracing::warn!(symbol, analyzer = %analyzer, error = %e, "Analyzer failed, excluding it from consensus");
                    failures.push(AnalyzerFailure {
                        analyzer,
                        error: e.to_string(),
                    });
                }
            }
        }

        let total_weight: f64 = survivors.iter().map(|(_, _, w)| w).sum();
        if total_weight <= 0.0 {
            return Err(AggregationError::NoValidSignals {
                symbol: symbol.to_string(),
                failures: failures.len(),
            });
        }

        let signals: Vec<WeightedSignal> = survivors
            .into_iter()
            .map(|(analyzer, signal, weight)| WeightedSignal {
                analyzer,
                signal,
                weight,
                normalized_weight: weight / total_weight,
            })
            .collect();

        let weighted_signal = signals
            .iter()
            .map(|s| s.signal.score() * s.normalized_weight)
            .sum::<f64>()
            .clamp(-1.0, 1.0);
        let weighted_confidence = signals
            .iter()
            .map(|s| s.signal.confidence * s.normalized_weight)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        tracing::debug!(
            symbol,
            survivors = signals.len(),
            failed = failures.len(),
            weighted_signal,
            weighted_confidence,
            "Signals aggregated"
        );

        Ok(AggregatedSignal {
            symbol: symbol.to_string(),
            signals,
            failures,
            weighted_signal,
            weighted_confidence,
        })
    }
}
