use rust_decimal::Decimal;
use thiserror::Error;

/// Why the ledger refused an order. A refused order never mutates state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Not enough cash to buy {symbol}. Required: {required}, Available: {available}")]
    InsufficientCash {
        symbol: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Cannot sell {requested} shares of {symbol}, only {held} held")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("Position not found for symbol: {0}")]
    NoPosition(String),

    #[error("Order for {0} exceeds the representable cash range")]
    Overflow(String),

    #[error("Invalid price {price} for {symbol}: must be greater than 0")]
    InvalidPrice { symbol: String, price: Decimal },
}
