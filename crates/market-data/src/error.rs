use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read price data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse price table: {0}")]
    Csv(#[from] csv::Error),

    #[error("No price data found for {0}")]
    NotFound(String),

    #[error("Invalid price data: {0}")]
    Invalid(#[from] CoreError),
}
