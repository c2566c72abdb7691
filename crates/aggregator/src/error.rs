use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// Every analyzer failed, or every survivor carries zero weight.
    #[error("No valid signals for {symbol}: {failures} analyzer(s) failed and no weighted signal survived")]
    NoValidSignals { symbol: String, failures: usize },

    #[error("Invalid weight {weight} for analyzer '{analyzer}'")]
    InvalidWeight { analyzer: String, weight: f64 },
}
