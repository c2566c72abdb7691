use crate::error::LedgerError;
use chrono::NaiveDate;
use core_types::{OrderSide, PortfolioSnapshot, Position, TradeOrder, UnpricedValuation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One dated entry of the valuation history.
///
/// `total_value == cash + positions_value` and `positions_value` is the sum of
/// `holdings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub cash: Decimal,
    pub positions_value: Decimal,
    pub holdings: BTreeMap<String, Decimal>,
}

/// Manages the state of a simulated long-only account.
///
/// Invariants: cash never goes negative, every stored position has at least
/// one share, and the history only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLedger {
    initial_capital: Decimal,
    cash: Decimal,
    positions: BTreeMap<String, Position>,
    history: Vec<ValuationSnapshot>,
    unpriced: UnpricedValuation,
    last_prices: BTreeMap<String, Decimal>,
}

impl PortfolioLedger {
    /// Creates a new ledger with a given amount of starting capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            history: Vec::new(),
            unpriced: UnpricedValuation::default(),
            last_prices: BTreeMap::new(),
        }
    }

    pub fn with_unpriced_valuation(mut self, policy: UnpricedValuation) -> Self {
        self.unpriced = policy;
        self
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Shares held, zero when there is no position.
    pub fn shares(&self, symbol: &str) -> u64 {
        self.positions.get(symbol).map_or(0, |p| p.shares)
    }

    pub fn history(&self) -> &[ValuationSnapshot] {
        &self.history
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            cash: self.cash,
            positions: self.positions.clone(),
        }
    }

    /// Validates and applies one order. On error nothing has changed.
    pub fn apply(&mut self, order: &TradeOrder) -> Result<(), LedgerError> {
        let Some(side) = order.side() else {
            return Ok(());
        };
        if order.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                symbol: order.symbol.clone(),
                price: order.price,
            });
        }
        let quantity = order.quantity();

        match side {
            OrderSide::Buy => {
                // An unrepresentable cost can never be covered by cash.
                let cost = Decimal::from(quantity)
                    .checked_mul(order.price)
                    .ok_or_else(|| LedgerError::InsufficientCash {
                        symbol: order.symbol.clone(),
                        required: Decimal::MAX,
                        available: self.cash,
                    })?;
                if cost > self.cash {
                    return Err(LedgerError::InsufficientCash {
                        symbol: order.symbol.clone(),
                        required: cost,
                        available: self.cash,
                    });
                }

                let (held, basis) = self
                    .positions
                    .get(&order.symbol)
                    .map_or((0, Decimal::ZERO), |p| (p.shares, p.cost_basis));
                let new_shares = held
                    .checked_add(quantity)
                    .ok_or_else(|| LedgerError::Overflow(order.symbol.clone()))?;
                let cost_basis = basis
                    .checked_mul(Decimal::from(held))
                    .and_then(|v| v.checked_add(cost))
                    .and_then(|v| v.checked_div(Decimal::from(new_shares)))
                    .ok_or_else(|| LedgerError::Overflow(order.symbol.clone()))?;

                self.cash -= cost;
                self.positions.insert(
                    order.symbol.clone(),
                    Position {
                        shares: new_shares,
                        cost_basis,
                    },
                );
            }
            OrderSide::Sell => {
                let Some(position) = self.positions.get_mut(&order.symbol) else {
                    return Err(LedgerError::NoPosition(order.symbol.clone()));
                };
                if quantity > position.shares {
                    return Err(LedgerError::InsufficientShares {
                        symbol: order.symbol.clone(),
                        requested: quantity,
                        held: position.shares,
                    });
                }

                let cash = Decimal::from(quantity)
                    .checked_mul(order.price)
                    .and_then(|proceeds| self.cash.checked_add(proceeds))
                    .ok_or_else(|| LedgerError::Overflow(order.symbol.clone()))?;

                self.cash = cash;
                position.shares -= quantity;
                if position.shares == 0 {
                    self.positions.remove(&order.symbol);
                }
            }
        }

        tracing::debug!(
            symbol = %order.symbol,
            delta = order.delta,
            price = %order.price,
            cash = %self.cash,
            "Order executed"
        );
        Ok(())
    }

    /// Applies an order, logging and swallowing a rejection.
    ///
    /// Returns whether the order was applied.
    pub fn execute(&mut self, order: &TradeOrder) -> bool {
        match self.apply(order) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(symbol = %order.symbol, delta = order.delta, error = %e, "Order rejected");
                false
            }
        }
    }

    /// Revalues every holding at `prices` and appends the result to the history.
    ///
    /// A holding absent from `prices` is valued by the ledger's
    /// [`UnpricedValuation`] policy for this snapshot only.
    pub fn record_snapshot(
        &mut self,
        date: NaiveDate,
        prices: &HashMap<String, Decimal>,
    ) -> &ValuationSnapshot {
        for (symbol, price) in prices {
            self.last_prices.insert(symbol.clone(), *price);
        }

        let holdings: BTreeMap<String, Decimal> = self
            .positions
            .iter()
            .map(|(symbol, position)| {
                let price = match prices.get(symbol) {
                    Some(price) => *price,
                    None => self.fallback_price(symbol, date),
                };
                (symbol.clone(), position.market_value(price))
            })
            .collect();
        let positions_value: Decimal = holdings.values().sum();

        self.history.push(ValuationSnapshot {
            date,
            total_value: self.cash + positions_value,
            cash: self.cash,
            positions_value,
            holdings,
        });
        &self.history[self.history.len() - 1]
    }

    fn fallback_price(&self, symbol: &str, date: NaiveDate) -> Decimal {
        let price = match self.unpriced {
            UnpricedValuation::Zero => Decimal::ZERO,
            UnpricedValuation::LastKnown => {
                self.last_prices.get(symbol).copied().unwrap_or(Decimal::ZERO)
            }
        };
        tracing::debug!(symbol, %date, %price, policy = ?self.unpriced, "Holding has no price for snapshot");
        price
    }

    /// `cash + Σ shares × price` using only the supplied prices.
    pub fn total_value(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        self.cash
            + self
                .positions
                .iter()
                .filter_map(|(s, p)| prices.get(s).map(|price| p.market_value(*price)))
                .sum::<Decimal>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn prices(pairs: &[(&str, Decimal)]) -> HashMap<String, Decimal> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn oversell_is_rejected_without_mutation() {
        let mut ledger = PortfolioLedger::new(dec!(100000));
        ledger.apply(&TradeOrder::new("AAPL", 100, dec!(150))).unwrap();
        let before = ledger.clone();

        let err = ledger.apply(&TradeOrder::new("AAPL", -150, dec!(150))).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientShares {
                symbol: "AAPL".to_string(),
                requested: 150,
                held: 100
            }
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.shares("AAPL"), 100);
    }

    #[test]
    fn round_trip_at_same_price_restores_cash_exactly() {
        let mut ledger = PortfolioLedger::new(dec!(100000));
        assert!(ledger.execute(&TradeOrder::new("MSFT", 37, dec!(123.45))));
        assert!(ledger.execute(&TradeOrder::new("MSFT", -37, dec!(123.45))));
        assert_eq!(ledger.cash(), dec!(100000));
        assert!(ledger.position("MSFT").is_none());
    }

    #[test]
    fn buy_beyond_cash_is_rejected() {
        let mut ledger = PortfolioLedger::new(dec!(1000));
        let before = ledger.clone();
        assert!(matches!(
            ledger.apply(&TradeOrder::new("NVDA", 11, dec!(100))),
            Err(LedgerError::InsufficientCash { .. })
        ));
        assert_eq!(ledger, before);
        // Spending exactly all cash is allowed.
        ledger.apply(&TradeOrder::new("NVDA", 10, dec!(100))).unwrap();
        assert_eq!(ledger.cash(), Decimal::ZERO);
    }

    #[test]
    fn unrepresentable_buy_cost_is_rejected_without_mutation() {
        let mut ledger = PortfolioLedger::new(dec!(1000000));
        let before = ledger.clone();
        let order = TradeOrder::new("AAPL", i64::MAX, dec!(100000000000));

        assert!(matches!(
            ledger.apply(&order),
            Err(LedgerError::InsufficientCash { .. })
        ));
        assert!(!ledger.execute(&order));
        assert_eq!(ledger, before);
    }

    #[test]
    fn unrepresentable_sell_proceeds_are_rejected_without_mutation() {
        let mut ledger = PortfolioLedger::new(dec!(1000));
        ledger.apply(&TradeOrder::new("AAPL", 10, dec!(1))).unwrap();
        let before = ledger.clone();

        let err = ledger
            .apply(&TradeOrder::new("AAPL", -10, Decimal::MAX / dec!(2)))
            .unwrap_err();

        assert_eq!(err, LedgerError::Overflow("AAPL".to_string()));
        assert_eq!(ledger, before);
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let mut ledger = PortfolioLedger::new(dec!(1000));
        assert_eq!(
            ledger.apply(&TradeOrder::new("AMD", -1, dec!(10))),
            Err(LedgerError::NoPosition("AMD".to_string()))
        );
        assert!(!ledger.execute(&TradeOrder::new("AMD", -1, dec!(10))));
    }

    #[test]
    fn zero_delta_is_a_noop() {
        let mut ledger = PortfolioLedger::new(dec!(1000));
        let before = ledger.clone();
        ledger.apply(&TradeOrder::new("AMD", 0, dec!(0))).unwrap();
        assert_eq!(ledger, before);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn non_positive_price_is_invalid() {
        let mut ledger = PortfolioLedger::new(dec!(1000));
        assert!(matches!(
            ledger.apply(&TradeOrder::new("AMD", 1, dec!(-5))),
            Err(LedgerError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn cost_basis_is_share_weighted() {
        let mut ledger = PortfolioLedger::new(dec!(10000));
        ledger.apply(&TradeOrder::new("AAPL", 100, dec!(10))).unwrap();
        ledger.apply(&TradeOrder::new("AAPL", 300, dec!(20))).unwrap();
        let position = ledger.position("AAPL").unwrap();
        assert_eq!(position.shares, 400);
        assert_eq!(position.cost_basis, dec!(17.5));
        // Selling leaves the basis of the remainder untouched.
        ledger.apply(&TradeOrder::new("AAPL", -100, dec!(30))).unwrap();
        assert_eq!(ledger.position("AAPL").unwrap().cost_basis, dec!(17.5));
    }

    #[test]
    fn snapshot_values_holdings_at_given_prices() {
        let mut ledger = PortfolioLedger::new(dec!(10000));
        ledger.apply(&TradeOrder::new("AAPL", 10, dec!(100))).unwrap();
        let snap = ledger
            .record_snapshot(day(1), &prices(&[("AAPL", dec!(110))]))
            .clone();
        assert_eq!(snap.cash, dec!(9000));
        assert_eq!(snap.positions_value, dec!(1100));
        assert_eq!(snap.total_value, dec!(10100));
        assert_eq!(snap.holdings["AAPL"], dec!(1100));
    }

    #[test]
    fn unpriced_holding_counts_zero_by_default() {
        let mut ledger = PortfolioLedger::new(dec!(10000));
        ledger.apply(&TradeOrder::new("AAPL", 10, dec!(100))).unwrap();
        ledger.record_snapshot(day(1), &prices(&[("AAPL", dec!(100))]));
        let snap = ledger.record_snapshot(day(2), &HashMap::new());
        assert_eq!(snap.total_value, dec!(9000));
    }

    #[test]
    fn unpriced_holding_can_use_last_known_price() {
        let mut ledger = PortfolioLedger::new(dec!(10000))
            .with_unpriced_valuation(UnpricedValuation::LastKnown);
        ledger.apply(&TradeOrder::new("AAPL", 10, dec!(100))).unwrap();
        ledger.record_snapshot(day(1), &prices(&[("AAPL", dec!(105))]));
        let snap = ledger.record_snapshot(day(2), &HashMap::new());
        assert_eq!(snap.total_value, dec!(10050));
    }

    fn order_strategy() -> impl Strategy<Value = TradeOrder> {
        (
            prop_oneof![Just("AAPL"), Just("MSFT"), Just("TSLA")],
            -500i64..500,
            1u32..50_000,
        )
            .prop_map(|(symbol, delta, cents)| {
                TradeOrder::new(symbol, delta, Decimal::from(cents) / dec!(100))
            })
    }

    proptest! {
        #[test]
        fn cash_never_goes_negative_and_rejections_do_not_mutate(
            orders in prop::collection::vec(order_strategy(), 1..60)
        ) {
            let mut ledger = PortfolioLedger::new(dec!(50000));
            for order in &orders {
                let before = ledger.clone();
                if ledger.apply(order).is_err() {
                    prop_assert_eq!(&ledger, &before);
                }
                prop_assert!(ledger.cash() >= Decimal::ZERO);
                prop_assert!(ledger.positions().values().all(|p| p.shares > 0));
            }
        }

        #[test]
        fn snapshot_total_is_cash_plus_holdings(
            orders in prop::collection::vec(order_strategy(), 1..30)
        ) {
            let mut ledger = PortfolioLedger::new(dec!(50000));
            for order in &orders {
                ledger.execute(order);
            }
            let marks = prices(&[("AAPL", dec!(101)), ("MSFT", dec!(99.5)), ("TSLA", dec!(250))]);
            let expected = ledger.total_value(&marks);
            let snap = ledger.record_snapshot(day(1), &marks);
            prop_assert_eq!(snap.total_value, expected);
            prop_assert_eq!(snap.total_value, snap.cash + snap.positions_value);
        }
    }
}
