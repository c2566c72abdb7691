use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Price history for {symbol} contains more than one bar dated {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}
