//! # Quorum Executor Crate
//!
//! Owns the simulated account: cash, long positions and the valuation history.
//!
//! `PortfolioLedger` is the only writer. Every mutation goes through
//! `apply`/`execute`, which validate the whole order before touching state, so
//! a rejected order leaves the ledger exactly as it was.
//!
//! ## Public API
//!
//! - `PortfolioLedger`: the in-memory state machine for one account.
//! - `ValuationSnapshot`: one dated entry of the valuation history.
//! - `LedgerError`: why an order was refused.

pub mod error;
pub mod ledger;

pub use core_types::UnpricedValuation;
pub use error::LedgerError;
pub use ledger::{PortfolioLedger, ValuationSnapshot};
