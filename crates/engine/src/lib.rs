use aggregator::{AnalyzerFailure, SignalAggregator, WeightedSignal};
use analyzers::{Analyzer, create_analyzers};
use configuration::Config;
use core_types::{Direction, PortfolioSnapshot, PriceHistory, TradeOrder};
use executor::PortfolioLedger;
use risk::{PositionSizer, RiskCeilingSizer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{EngineError, ErrorPayload};

/// Supporting detail for a [`Decision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    /// Every surviving analyzer's signal and the weight it carried.
    pub signals: Vec<WeightedSignal>,
    pub failures: Vec<AnalyzerFailure>,
    /// Shares to buy (positive) or sell (negative).
    pub order_size: i64,
    pub current_price: Decimal,
    /// Ledger state at the time of the decision, before any execution.
    pub portfolio: PortfolioSnapshot,
}

/// The final, sized trading decision for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    /// The sign of `metadata.order_size`.
    pub direction: Direction,
    pub confidence: f64,
    pub rationale: String,
    pub metadata: DecisionMetadata,
}

impl Decision {
    pub fn order(&self) -> TradeOrder {
        TradeOrder::new(
            self.symbol.clone(),
            self.metadata.order_size,
            self.metadata.current_price,
        )
    }
}

/// The central orchestrator for the live decision path.
///
/// One call to [`decide`](Self::decide) is one iteration of the backtest loop
/// over today's data, except that the consensus uses the configured static
/// weights and the sizing is bounded by the risk analyzer's ceiling. Decisions
/// never mutate the ledger; only [`execute`](Self::execute) does.
pub struct PortfolioManager {
    analyzers: Vec<Box<dyn Analyzer>>,
    aggregator: SignalAggregator,
    sizer: Box<dyn PositionSizer>,
    ledger: PortfolioLedger,
}

impl PortfolioManager {
    pub fn new(
        analyzers: Vec<Box<dyn Analyzer>>,
        aggregator: SignalAggregator,
        sizer: Box<dyn PositionSizer>,
        ledger: PortfolioLedger,
    ) -> Self {
        Self {
            analyzers,
            aggregator,
            sizer,
            ledger,
        }
    }

    /// Wires the configured analyzers, static weights and risk-ceiling sizer
    /// to a fresh ledger funded with `backtest.initial_capital`.
    pub fn from_config(config: &Config, benchmark: Option<&PriceHistory>) -> Result<Self, EngineError> {
        let analyzers = create_analyzers(config, benchmark)?;
        let aggregator = SignalAggregator::from_config(&config.aggregation)?;
        let sizer = RiskCeilingSizer::from_config(config)?;
        let ledger = PortfolioLedger::new(config.backtest.initial_capital)
            .with_unpriced_valuation(config.backtest.unpriced_valuation);

        tracing::info!(
            analyzers = analyzers.len(),
            risk_analyzer = sizer.risk_analyzer(),
            initial_capital = %ledger.initial_capital(),
            "Portfolio manager ready"
        );
        Ok(Self::new(analyzers, aggregator, Box::new(sizer), ledger))
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    pub fn analyzers(&self) -> &[Box<dyn Analyzer>] {
        &self.analyzers
    }

    /// Forms a sized decision for `symbol` from its full history.
    ///
    /// The last bar's close is the decision price.
    pub fn decide(&self, symbol: &str, history: &PriceHistory) -> Result<Decision, EngineError> {
        let Some(last) = history.last() else {
            return Err(EngineError::EmptyHistory(symbol.to_string()));
        };
        let current_price = last.close;

        let consensus = self
            .aggregator
            .aggregate(symbol, history.bars(), &self.analyzers)?;
        let order_size =
            self.sizer
                .target_delta(&consensus, current_price, self.ledger.shares(symbol))?;

        let direction = Direction::from_sign(order_size);
        let action = match direction {
            Direction::Buy => format!("BUY {order_size} shares"),
            Direction::Sell => format!("SELL {} shares", order_size.unsigned_abs()),
            Direction::Hold => "HOLD position".to_string(),
        };
        let confidence = consensus.weighted_confidence;

        let mut rationale = format!("{action} with {:.1}% confidence.\n", confidence * 100.0);
        let reasons: Vec<String> = consensus
            .signals
            .iter()
            .map(|s| format!("{}: {}", s.analyzer, s.signal.rationale))
            .collect();
        rationale.push_str(&reasons.join("\n"));

        tracing::info!(symbol, %direction, order_size, %current_price, confidence, "Decision formed");
        tracing::debug!(symbol, %rationale, "Decision reasoning");

        Ok(Decision {
            symbol: symbol.to_string(),
            direction,
            confidence,
            rationale,
            metadata: DecisionMetadata {
                signals: consensus.signals,
                failures: consensus.failures,
                order_size,
                current_price,
                portfolio: self.ledger.snapshot(),
            },
        })
    }

    /// Applies the decision's order to the ledger. A rejection is logged and
    /// leaves the ledger unchanged.
    pub fn execute(&mut self, decision: &Decision) -> bool {
        self.ledger.execute(&decision.order())
    }
}
