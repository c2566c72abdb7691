use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No price data provided for {0}")]
    EmptyHistory(String),

    #[error("Analyzer setup error: {0}")]
    Analyzer(#[from] analyzers::AnalyzerError),

    #[error("Signal aggregation error: {0}")]
    Aggregation(#[from] aggregator::AggregationError),

    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),
}

impl EngineError {
    /// A stable, machine-readable name for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::EmptyHistory(_) => "empty_history",
            EngineError::Analyzer(_) => "analyzer",
            EngineError::Aggregation(aggregator::AggregationError::NoValidSignals { .. }) => {
                "no_valid_signals"
            }
            EngineError::Aggregation(_) => "aggregation",
            EngineError::Risk(risk::RiskError::MissingRiskSignal { .. }) => "missing_risk_signal",
            EngineError::Risk(risk::RiskError::InvalidPrice(_)) => "invalid_price",
            EngineError::Risk(_) => "risk",
        }
    }
}

/// The shape an engine failure takes at a service boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub message: String,
}

impl From<&EngineError> for ErrorPayload {
    fn from(error: &EngineError) -> Self {
        Self {
            error: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}
