use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Risk parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("The provided price ({0}) is zero or negative.")]
    InvalidPrice(Decimal),

    /// The configured risk analyzer produced no usable position ceiling.
    #[error("No risk signal from '{analyzer}' for {symbol}")]
    MissingRiskSignal { symbol: String, analyzer: String },

    #[error("A calculation error occurred: {0}")]
    Calculation(String),
}
