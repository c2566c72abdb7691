//! # Quorum Analytics Engine
//!
//! Turns a dated portfolio-value series into a `PerformanceReport`.
//!
//! - **Pure logic:** no knowledge of the ledger or the backtester; input is a
//!   slice of `(date, total_value)` points.
//! - **Stateless calculation:** `AnalyticsEngine` holds no state between calls.
//!
//! Ratios that are undefined for the given data (a Sharpe ratio with zero
//! variance, for instance) are reported as `None` instead of failing.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
