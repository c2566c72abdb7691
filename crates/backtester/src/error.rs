use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),

    #[error("Backtest start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("No analyzers were supplied to the backtest")]
    NoAnalyzers,

    #[error("Historical data for the requested range is incomplete or missing.")]
    DataUnavailable,
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
