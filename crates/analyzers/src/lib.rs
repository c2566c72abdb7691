//! # Quorum Analyzer Library
//!
//! This crate contains the opinion-forming logic of the system. It defines the
//! universal `Analyzer` trait and ships three price-only implementations.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no I/O, no ledger access. An analyzer sees a borrowed,
//!   date-ordered slice of bars ending at the evaluation date and nothing else.
//! - **Analyzer agnostic callers:** the aggregator, backtester and screener
//!   operate on `dyn Analyzer` and never know which implementation they hold.
//! - **Extensibility:** a new analyzer is a new module implementing `Analyzer`,
//!   plus an `AnalyzerId` variant and a factory arm.

pub mod error;
pub mod factory;
pub mod price_target;
pub mod risk_profile;
pub mod stats;
pub mod technicals;

pub use error::AnalyzerError;
pub use factory::{create_analyzer, create_analyzers};
pub use price_target::PriceTargetAnalyzer;
pub use risk_profile::{RiskAnalyzer, RiskMetrics};
pub use technicals::TechnicalsAnalyzer;

pub use core_types::AnalyzerId;

use core_types::{PriceBar, Signal};

/// The capability every opinion source implements.
///
/// `Send + Sync` lets the screener share analyzers across its worker pool.
pub trait Analyzer: Send + Sync {
    /// Stable display name. It is also the analyzer's key in the weight table.
    fn name(&self) -> &str;

    /// Forms an opinion on `symbol` from `history`, whose last bar is "today".
    ///
    /// The slice is borrowed immutably, so an analyzer cannot alter the data
    /// other analyzers will see.
    fn analyze(&self, symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Days, NaiveDate};
    use core_types::PriceBar;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn date(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(u64::from(offset)))
            .unwrap()
    }

    pub fn bar(offset: u32, close: f64, high: f64, low: f64) -> PriceBar {
        PriceBar {
            date: date(offset),
            open: Decimal::from_f64(close).unwrap(),
            high: Decimal::from_f64(high).unwrap(),
            low: Decimal::from_f64(low).unwrap(),
            close: Decimal::from_f64(close).unwrap(),
            volume: Decimal::from(1_000),
        }
    }

    pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i as u32, *c, *c, *c))
            .collect()
    }
}
