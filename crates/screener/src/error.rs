use indicatif::style::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Screener parameters are invalid: {0}")]
    InvalidParameters(String),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Market data error: {0}")]
    Data(#[from] market_data::DataError),

    #[error("Signal aggregation error: {0}")]
    Aggregation(#[from] aggregator::AggregationError),

    #[error("No price data in the lookback window for {0}")]
    NoData(String),

    #[error("Last close {price} for {symbol} must be greater than 0")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("No price target was produced for {0}")]
    MissingPriceTarget(String),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<TemplateError> for ScreenerError {
    fn from(error: TemplateError) -> Self {
        ScreenerError::ProgressBarTemplate(error.to_string())
    }
}
