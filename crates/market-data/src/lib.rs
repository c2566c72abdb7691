//! # Quorum Market Data Crate
//!
//! This crate is the system's window onto historical prices. Nothing else in
//! the workspace touches files or feeds directly.
//!
//! ## Architectural Principles
//!
//! - **Adapter Boundary:** Every source implements [`PriceSource`] and returns a
//!   validated [`core_types::PriceHistory`], so consumers never see raw rows.
//! - **Range Semantics:** Both ends of a requested range are inclusive. An empty
//!   result is an `Ok` empty history; a missing symbol is `DataError::NotFound`.
//! - **Shareable:** Sources are `Send + Sync` so the screener can fan requests
//!   out across worker threads.
//!
//! ## Public API
//!
//! - `PriceSource`: The trait every data adapter implements.
//! - `CsvPriceSource`: Reads `<dir>/<SYMBOL>.csv` price tables.
//! - `InMemoryPriceSource`: A map-backed source for tests and embedding.
//! - `DataError`: The specific error types that can be returned from this crate.

pub mod error;
pub mod source;

pub use error::DataError;
pub use source::{CsvPriceSource, InMemoryPriceSource, PriceSource};
