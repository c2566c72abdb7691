use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Not enough price data for {symbol}: need {needed} bars, got {available}")]
    InsufficientData {
        symbol: String,
        needed: usize,
        available: usize,
    },

    #[error("An error occurred during indicator calculation: {0}")]
    IndicatorError(String),

    #[error("Analyzer produced an invalid signal: {0}")]
    InvalidSignal(#[from] CoreError),
}
