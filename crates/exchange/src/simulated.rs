//! The simulated exchange: the backtest core.
//!
//! Drives an internal order book from the market-data stream fed by the
//! session and matches strategy orders against it. Every request resolves
//! immediately, so the session handles responses synchronously and the
//! run is deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use book::OrderBook;
use market::{MarketItem, MarketPayload};
use tracing::debug;
use types::{
    Cash, ChangePolicy, Fill, Instant, Instrument, OrderCommand, OrderEvent, OrderEventKind,
    OrderId, Price, Side, Size,
};
use uuid::Uuid;

use crate::completion::Completion;
use crate::error::{ErrorNotice, ExchangeError, Response};
use crate::queues::ExchangeQueues;
use crate::rounding::{round_cash, Rounding};
use crate::{Exchange, FeeSchedule, Portfolio};

/// Configuration of a simulated exchange for one instrument.
#[derive(Debug, Clone)]
pub struct SimulatedExchangeConfig {
    pub instrument: Instrument,
    /// Asset names the portfolio reports under.
    pub base_asset: String,
    pub quote_asset: String,
    pub fees: FeeSchedule,
    /// Decimal places for base-asset amounts.
    pub base_precision: u32,
    /// Decimal places for quote-asset amounts.
    pub quote_precision: u32,
    pub lot_size: Option<Size>,
    /// Starting quote balance.
    pub starting_quote: Cash,
    pub rounding: Rounding,
    pub change_policy: ChangePolicy,
}

impl Default for SimulatedExchangeConfig {
    fn default() -> Self {
        Self {
            instrument: "btc_usd".to_string(),
            base_asset: "btc".to_string(),
            quote_asset: "usd".to_string(),
            fees: FeeSchedule::default(),
            base_precision: 8,
            quote_precision: 2,
            lot_size: None,
            starting_quote: Cash::from_float(1_000_000.0),
            rounding: Rounding::HalfDown,
            change_policy: ChangePolicy::AlwaysReinsert,
        }
    }
}

impl SimulatedExchangeConfig {
    pub fn new(instrument: impl Into<Instrument>) -> Self {
        let instrument = instrument.into();
        let (base, quote) = match instrument.split_once('_') {
            Some((b, q)) => (b.to_string(), q.to_string()),
            None => (instrument.clone(), "usd".to_string()),
        };
        Self {
            instrument,
            base_asset: base,
            quote_asset: quote,
            ..Self::default()
        }
    }

    pub fn fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn starting_quote(mut self, cash: f64) -> Self {
        self.starting_quote = Cash::from_float(cash);
        self
    }

    pub fn lot_size(mut self, lot: Size) -> Self {
        self.lot_size = Some(lot);
        self
    }
}

/// Backtest exchange matching strategy orders against a data-driven book.
pub struct SimulatedExchange {
    config: SimulatedExchangeConfig,
    book: OrderBook,
    queues: Arc<ExchangeQueues>,
    /// Exchange id -> client oid for our resting limit orders.
    own_orders: HashMap<OrderId, Uuid>,
    next_order_seq: u64,
    /// Instant of the last market-data item fed in.
    last_data_instant: Instant,
    /// Signed base position accumulated from fills.
    position: Size,
    /// Quote balance net of fills and fees.
    quote_balance: Cash,
}

impl SimulatedExchange {
    pub fn new(config: SimulatedExchangeConfig) -> Self {
        let book = OrderBook::with_change_policy(config.change_policy);
        let quote_balance = config.starting_quote;
        Self {
            config,
            book,
            queues: Arc::new(ExchangeQueues::new()),
            own_orders: HashMap::new(),
            next_order_seq: 1,
            last_data_instant: 0,
            position: Size::ZERO,
            quote_balance,
        }
    }

    /// Synthetic clock: the last market-data instant, or the last tick
    /// instant if later.
    pub fn synthetic_current_micros(&self) -> Instant {
        match self.queues.last_tick() {
            Some(tick) => self.last_data_instant.max(tick),
            None => self.last_data_instant,
        }
    }

    /// The internal book (visible for tests and diagnostics).
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Current signed base position.
    pub fn position(&self) -> Size {
        self.position
    }

    fn next_order_id(&mut self) -> OrderId {
        let id = format!("sim-{}", self.next_order_seq);
        self.next_order_seq += 1;
        id
    }

    fn event(&self, client_oid: Uuid, order_id: &str, kind: OrderEventKind, at: Instant) {
        self.queues.push_event(OrderEvent {
            client_oid,
            order_id: order_id.to_string(),
            instrument: self.config.instrument.clone(),
            kind,
            instant: at,
        });
    }

    /// Emit fills (with taker fees) and settle them into the portfolio.
    fn emit_fills(
        &mut self,
        client_oid: Uuid,
        order_id: &str,
        side: Side,
        fills: &[(Price, Size)],
        at: Instant,
    ) {
        for (price, size) in fills {
            let notional = *price * *size;
            let fee = self.config.fees.taker_fee(notional);

            match side {
                Side::Buy => {
                    self.position += *size;
                    self.quote_balance -= notional + fee;
                }
                Side::Sell => {
                    self.position -= *size;
                    self.quote_balance += notional - fee;
                }
            }

            self.queues.push_fill(Fill {
                client_oid,
                order_id: order_id.to_string(),
                instrument: self.config.instrument.clone(),
                side,
                price: *price,
                size: *size,
                fee,
                instant: at,
            });
        }
    }

    fn check_instrument(&self, instrument: &Instrument) -> Result<(), ExchangeError> {
        if *instrument != self.config.instrument {
            return Err(ExchangeError::UnknownInstrument(instrument.clone()));
        }
        Ok(())
    }

    /// Whether a limit order at `price` would take liquidity.
    fn would_cross(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.book.best_ask().is_some_and(|ask| price >= ask),
            Side::Sell => self.book.best_bid().is_some_and(|bid| price <= bid),
        }
    }

    fn execute(&mut self, cmd: OrderCommand) -> Result<(), ExchangeError> {
        self.check_instrument(cmd.instrument())?;
        let at = self.synthetic_current_micros();

        match cmd {
            OrderCommand::Market {
                client_oid,
                side,
                size,
                ..
            } => {
                let order_id = self.next_order_id();
                let fills = self
                    .book
                    .fill(side, size, None)
                    .map_err(|e| ExchangeError::Internal(e.to_string()))?;
                self.emit_fills(client_oid, &order_id, side, &fills, at);
                self.event(client_oid, &order_id, OrderEventKind::Done, at);
                Ok(())
            }
            OrderCommand::Limit {
                client_oid,
                side,
                size,
                price,
                post_only,
                ..
            } => {
                let crosses = self.would_cross(side, price);
                if post_only && crosses {
                    return Err(ExchangeError::PostOnlyWouldCross);
                }

                let order_id = self.next_order_id();
                let fills = if crosses {
                    self.book
                        .fill(side, size, Some(price))
                        .map_err(|e| ExchangeError::Internal(e.to_string()))?
                } else {
                    Default::default()
                };
                self.emit_fills(client_oid, &order_id, side, &fills, at);

                let matched: Size = fills.iter().map(|(_, s)| *s).sum();
                let remainder = size.saturating_sub(matched);
                if remainder.is_positive() {
                    self.book.open(order_id.clone(), price, remainder, side);
                    self.own_orders.insert(order_id.clone(), client_oid);
                    self.event(
                        client_oid,
                        &order_id,
                        OrderEventKind::Opened {
                            price,
                            size: remainder,
                        },
                        at,
                    );
                } else {
                    self.event(client_oid, &order_id, OrderEventKind::Done, at);
                }
                Ok(())
            }
        }
    }

    fn execute_cancel(&mut self, id: &OrderId) -> Result<(), ExchangeError> {
        let at = self.synthetic_current_micros();
        match self.own_orders.remove(id) {
            Some(client_oid) => {
                self.book.done(id);
                self.event(client_oid, id, OrderEventKind::Canceled, at);
                Ok(())
            }
            None => Err(ExchangeError::OrderNotFound(id.clone())),
        }
    }
}

impl Exchange for SimulatedExchange {
    fn maker_fee(&self) -> f64 {
        self.config.fees.maker
    }

    fn taker_fee(&self) -> f64 {
        self.config.fees.taker
    }

    fn order(&mut self, cmd: OrderCommand) -> Completion<Response> {
        let response = match self.execute(cmd) {
            Ok(()) => Response::Ok,
            Err(error) => Response::Failed(error),
        };
        Completion::ready(response)
    }

    fn cancel(&mut self, id: &OrderId, instrument: &Instrument) -> Completion<Response> {
        let response = match self
            .check_instrument(instrument)
            .and_then(|()| self.execute_cancel(id))
        {
            Ok(()) => Response::Ok,
            Err(error) => Response::Failed(error),
        };
        Completion::ready(response)
    }

    fn fetch_portfolio(&mut self) -> Completion<Portfolio> {
        let mut balances = HashMap::new();
        balances.insert(
            self.config.quote_asset.clone(),
            round_cash(
                self.quote_balance,
                self.config.quote_precision,
                self.config.rounding,
            ),
        );
        balances.insert(
            self.config.base_asset.clone(),
            round_cash(
                Cash(self.position.0),
                self.config.base_precision,
                self.config.rounding,
            ),
        );

        let mut positions = HashMap::new();
        positions.insert(self.config.instrument.clone(), self.position);

        Completion::ready(Portfolio {
            balances,
            positions,
        })
    }

    fn base_asset_precision(&self, _instrument: &Instrument) -> u32 {
        self.config.base_precision
    }

    fn quote_asset_precision(&self, _instrument: &Instrument) -> u32 {
        self.config.quote_precision
    }

    fn lot_size(&self, _instrument: &Instrument) -> Option<Size> {
        self.config.lot_size
    }

    fn instruments(&self) -> HashSet<Instrument> {
        let mut set = HashSet::new();
        set.insert(self.config.instrument.clone());
        set
    }

    fn queues(&self) -> &Arc<ExchangeQueues> {
        &self.queues
    }

    fn feed(&mut self, item: &MarketItem) {
        self.last_data_instant = self.last_data_instant.max(item.instant);

        if item.path.instrument != self.config.instrument {
            return;
        }
        if let MarketPayload::Delta(delta) = &item.payload {
            if let Err(err) = self.book.update(delta.clone()) {
                debug!(%err, "rejected book delta");
                self.queues.push_error(ErrorNotice {
                    client_oid: None,
                    error: ExchangeError::InvalidDelta(err.to_string()),
                    instant: item.instant,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market::DataPath;
    use types::Delta;

    fn sim() -> SimulatedExchange {
        SimulatedExchange::new(SimulatedExchangeConfig::new("btc_usd").fees(FeeSchedule::free()))
    }

    fn delta_item(instant: Instant, delta: Delta) -> MarketItem {
        let path: DataPath = "sim/btc_usd/book".parse().unwrap();
        MarketItem::new(path, instant, MarketPayload::Delta(delta))
    }

    fn open(id: &str, price: f64, size: f64, side: Side) -> Delta {
        Delta::Open {
            id: id.to_string(),
            price: Price::from_float(price),
            size: Size::from_float(size),
            side,
        }
    }

    fn seed_book(sim: &mut SimulatedExchange) {
        sim.feed(&delta_item(1_000, open("a1", 100.0, 1.0, Side::Sell)));
        sim.feed(&delta_item(2_000, open("a2", 101.0, 2.0, Side::Sell)));
        sim.feed(&delta_item(3_000, open("b1", 99.0, 1.5, Side::Buy)));
    }

    #[test]
    fn test_market_order_fills_and_stamps_clock() {
        let mut sim = sim();
        seed_book(&mut sim);

        let response = sim
            .order(OrderCommand::market(
                Side::Buy,
                "btc_usd",
                Size::from_float(2.5),
            ))
            .wait()
            .unwrap();
        assert_eq!(response, Response::Ok);

        let out = sim.queues().collect();
        assert_eq!(out.fills.len(), 2);
        assert_eq!(out.fills[0].price, Price::from_float(100.0));
        assert_eq!(out.fills[0].size, Size::from_float(1.0));
        assert_eq!(out.fills[1].price, Price::from_float(101.0));
        assert_eq!(out.fills[1].size, Size::from_float(1.5));
        // Fills are stamped with the synthetic clock (last data instant).
        assert_eq!(out.fills[0].instant, 3_000);

        assert_eq!(sim.position(), Size::from_float(2.5));
        assert_eq!(
            sim.book().order("a2").unwrap().amount,
            Size::from_float(0.5)
        );
    }

    #[test]
    fn test_taker_fees_charged_on_notional() {
        let mut sim = SimulatedExchange::new(
            SimulatedExchangeConfig::new("btc_usd").fees(FeeSchedule::new(0.001, 0.002)),
        );
        seed_book(&mut sim);

        sim.order(OrderCommand::market(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.0),
        ));

        let out = sim.queues().collect();
        // 1.0 @ 100 with 0.2% taker = 0.2
        assert_eq!(out.fills[0].fee, Cash::from_float(0.2));
    }

    #[test]
    fn test_post_only_would_cross_rejected() {
        let mut sim = sim();
        seed_book(&mut sim);

        // Best ask is 100; a post-only buy at 100 would take it.
        let cmd = OrderCommand::limit(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.0),
            Price::from_float(100.0),
            true,
        );
        let response = sim.order(cmd).wait().unwrap();
        assert_eq!(
            response,
            Response::Failed(ExchangeError::PostOnlyWouldCross)
        );
        // Nothing filled, nothing rested.
        assert!(sim.queues().collect().fills.is_empty());
    }

    #[test]
    fn test_post_only_below_ask_rests() {
        let mut sim = sim();
        seed_book(&mut sim);

        let cmd = OrderCommand::limit(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.0),
            Price::from_float(99.5),
            true,
        );
        assert_eq!(sim.order(cmd).wait().unwrap(), Response::Ok);

        let out = sim.queues().collect();
        assert!(matches!(
            out.events.last().unwrap().kind,
            OrderEventKind::Opened { .. }
        ));
        assert_eq!(sim.book().best_bid(), Some(Price::from_float(99.5)));
    }

    #[test]
    fn test_limit_fills_then_rests_remainder() {
        let mut sim = sim();
        seed_book(&mut sim);

        // Crosses the 100 ask for 1.0, remainder 0.5 rests at 100.
        let cmd = OrderCommand::limit(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.5),
            Price::from_float(100.0),
            false,
        );
        assert_eq!(sim.order(cmd).wait().unwrap(), Response::Ok);

        let out = sim.queues().collect();
        assert_eq!(out.fills.len(), 1);
        assert_eq!(out.fills[0].size, Size::from_float(1.0));
        assert!(matches!(
            out.events.last().unwrap().kind,
            OrderEventKind::Opened { size, .. } if size == Size::from_float(0.5)
        ));
        assert_eq!(sim.book().best_bid(), Some(Price::from_float(100.0)));
    }

    #[test]
    fn test_cancel_resting_then_unknown() {
        let mut sim = sim();
        seed_book(&mut sim);

        let cmd = OrderCommand::limit(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.0),
            Price::from_float(98.0),
            true,
        );
        sim.order(cmd);
        let opened = sim.queues().collect();
        let order_id = opened.events.last().unwrap().order_id.clone();

        let instrument = "btc_usd".to_string();
        assert_eq!(
            sim.cancel(&order_id, &instrument).wait().unwrap(),
            Response::Ok
        );
        assert_eq!(
            sim.cancel(&order_id, &instrument).wait().unwrap(),
            Response::Failed(ExchangeError::OrderNotFound(order_id))
        );
    }

    #[test]
    fn test_unknown_instrument_rejected() {
        let mut sim = sim();
        let response = sim
            .order(OrderCommand::market(Side::Buy, "eth_usd", Size::ONE))
            .wait()
            .unwrap();
        assert!(matches!(
            response,
            Response::Failed(ExchangeError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_invalid_delta_queued_as_error() {
        let mut sim = sim();
        sim.feed(&delta_item(
            1_000,
            Delta::Change {
                id: "ghost".to_string(),
                new_size: Size::ONE,
            },
        ));

        let out = sim.queues().collect();
        assert_eq!(out.errors.len(), 1);
        assert!(matches!(
            out.errors[0].error,
            ExchangeError::InvalidDelta(_)
        ));
    }

    #[test]
    fn test_done_for_unknown_id_tolerated() {
        let mut sim = sim();
        sim.feed(&delta_item(
            1_000,
            Delta::Done {
                id: "ghost".to_string(),
            },
        ));
        assert!(sim.queues().collect().is_empty());
    }

    #[test]
    fn test_synthetic_clock_follows_ticks() {
        let mut sim = sim();
        seed_book(&mut sim);
        assert_eq!(sim.synthetic_current_micros(), 3_000);

        // A later tick advances the clock past the data stream.
        sim.queues().tick_now(10_000);
        assert_eq!(sim.synthetic_current_micros(), 10_000);
    }

    #[test]
    fn test_portfolio_snapshot_rounded() {
        let mut sim = sim();
        seed_book(&mut sim);
        sim.order(OrderCommand::market(
            Side::Buy,
            "btc_usd",
            Size::from_float(1.0),
        ));

        let portfolio = sim.fetch_portfolio().wait().unwrap();
        assert_eq!(
            portfolio.positions.get("btc_usd"),
            Some(&Size::from_float(1.0))
        );
        // 1,000,000 - 100, reported at quote precision.
        assert_eq!(
            portfolio.balances.get("usd"),
            Some(&Cash::from_float(999_900.0))
        );
    }
}
