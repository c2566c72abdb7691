pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AnalyzerId, Direction, OrderSide, UnpricedValuation};
pub use error::CoreError;
pub use structs::{
    PortfolioSnapshot, Position, PriceBar, PriceHistory, PriceTargetDetails, RiskAssessment,
    Signal, SignalDetails, TechnicalDetails, TradeOrder,
};
