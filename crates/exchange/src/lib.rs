//! Exchange: the uniform surface a trading session composes against.
//!
//! An exchange exposes fee rates, async order/cancel/portfolio requests,
//! precision queries, and three concurrent queues (fills, events, errors)
//! drained by the session. Concrete implementations are plugged in at
//! session build time; [`SimulatedExchange`] is the backtest core and
//! [`LiveExchange`] the shell a real adapter slots into.

mod completion;
mod error;
mod live;
mod queues;
mod rounding;
mod simulated;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use market::MarketItem;
use types::{Cash, Instrument, OrderCommand, OrderId, Size};

pub use completion::{Completion, CompletionStatus, Resolver};
pub use error::{ErrorNotice, ExchangeError, Response};
pub use live::{ExchangeTransport, LiveExchange, LiveExchangeConfig};
pub use queues::{wall_clock_micros, Collected, ExchangeQueues, TickSink};
pub use rounding::{round_cash, round_raw, round_to_lot, round_size, Rounding};
pub use simulated::{SimulatedExchange, SimulatedExchangeConfig};

// =============================================================================
// Fee Schedule
// =============================================================================

/// Constant maker/taker fee rates. Negative rates are rebates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub maker: f64,
    pub taker: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker: 0.001,
            taker: 0.002,
        }
    }
}

impl FeeSchedule {
    pub fn new(maker: f64, taker: f64) -> Self {
        Self { maker, taker }
    }

    /// Zero fees on both sides.
    pub fn free() -> Self {
        Self {
            maker: 0.0,
            taker: 0.0,
        }
    }

    /// Taker fee on a notional amount.
    pub fn taker_fee(&self, notional: Cash) -> Cash {
        Cash((notional.0 as f64 * self.taker).round() as i64)
    }

    /// Maker fee on a notional amount.
    pub fn maker_fee(&self, notional: Cash) -> Cash {
        Cash((notional.0 as f64 * self.maker).round() as i64)
    }
}

// =============================================================================
// Portfolio
// =============================================================================

/// Full balance/position snapshot returned by `fetch_portfolio`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    /// Asset balances, e.g. `"usd" -> 10_000`.
    pub balances: HashMap<String, Cash>,
    /// Signed positions per instrument (negative is short).
    pub positions: HashMap<Instrument, Size>,
}

// =============================================================================
// Exchange Capability Set
// =============================================================================

/// The capability set consumed by the trading session.
///
/// Request methods return [`Completion`]s. A completion that is already
/// resolved when it is returned must be handled synchronously by the
/// caller (and ticked immediately); the simulated exchange always takes
/// that path, which is what makes backtests deterministic.
pub trait Exchange: Send {
    /// Constant maker fee rate; negative permitted for rebates.
    fn maker_fee(&self) -> f64;

    /// Constant taker fee rate; negative permitted for rebates.
    fn taker_fee(&self) -> f64;

    /// Submit a limit or market order request.
    fn order(&mut self, cmd: OrderCommand) -> Completion<Response>;

    /// Cancel by exchange order id.
    fn cancel(&mut self, id: &OrderId, instrument: &Instrument) -> Completion<Response>;

    /// Fetch the full balances/positions snapshot.
    fn fetch_portfolio(&mut self) -> Completion<Portfolio>;

    /// Decimal places for rounding base-asset amounts.
    fn base_asset_precision(&self, instrument: &Instrument) -> u32;

    /// Decimal places for rounding quote-asset amounts.
    fn quote_asset_precision(&self, instrument: &Instrument) -> u32;

    /// Minimum size increment, if any.
    fn lot_size(&self, _instrument: &Instrument) -> Option<Size> {
        None
    }

    /// Known instruments; default empty.
    fn instruments(&self) -> HashSet<Instrument> {
        HashSet::new()
    }

    /// The fill/event/error queues this exchange shares with its session.
    fn queues(&self) -> &Arc<ExchangeQueues>;

    /// Feed one market-data item into the exchange.
    ///
    /// Only the simulated exchange consumes these (to drive its internal
    /// book and synthetic clock); live adapters ignore them.
    fn feed(&mut self, _item: &MarketItem) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_schedule() {
        let fees = FeeSchedule::new(0.001, 0.002);
        let notional = Cash::from_float(1_000.0);
        assert_eq!(fees.maker_fee(notional), Cash::from_float(1.0));
        assert_eq!(fees.taker_fee(notional), Cash::from_float(2.0));
    }

    #[test]
    fn test_rebate_is_negative_fee() {
        let fees = FeeSchedule::new(-0.0005, 0.002);
        let rebate = fees.maker_fee(Cash::from_float(1_000.0));
        assert!(rebate.is_negative());
        assert_eq!(rebate, Cash::from_float(-0.5));
    }
}
