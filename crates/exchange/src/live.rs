//! Live exchange shell.
//!
//! The REST/WebSocket wiring of a real venue is a client of the core and
//! lives outside it; this shell owns the queues, fee schedule, and
//! precision metadata, and delegates requests to an injected transport.
//! The transport's delivery threads push fills/events/errors into the
//! shared queues and resolve request completions, which ticks the session
//! at wall-clock instants.

use std::collections::HashSet;
use std::sync::Arc;

use types::{Instrument, OrderCommand, OrderId, Size};

use crate::completion::Completion;
use crate::error::Response;
use crate::queues::ExchangeQueues;
use crate::{Exchange, FeeSchedule, Portfolio};

/// Venue adapter surface. Implementations may run threads internally;
/// their only channel back to the session is `queues` and the returned
/// completions.
pub trait ExchangeTransport: Send {
    fn submit(&mut self, cmd: &OrderCommand, queues: &Arc<ExchangeQueues>) -> Completion<Response>;

    fn cancel(
        &mut self,
        id: &OrderId,
        instrument: &Instrument,
        queues: &Arc<ExchangeQueues>,
    ) -> Completion<Response>;

    fn portfolio(&mut self) -> Completion<Portfolio>;

    fn instruments(&self) -> HashSet<Instrument> {
        HashSet::new()
    }
}

/// Static venue metadata for the shell.
#[derive(Debug, Clone)]
pub struct LiveExchangeConfig {
    pub fees: FeeSchedule,
    pub base_precision: u32,
    pub quote_precision: u32,
    pub lot_size: Option<Size>,
}

impl Default for LiveExchangeConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            base_precision: 8,
            quote_precision: 2,
            lot_size: None,
        }
    }
}

/// Exchange implementation backed by an injected transport.
pub struct LiveExchange {
    transport: Box<dyn ExchangeTransport>,
    config: LiveExchangeConfig,
    queues: Arc<ExchangeQueues>,
}

impl LiveExchange {
    pub fn new(transport: Box<dyn ExchangeTransport>, config: LiveExchangeConfig) -> Self {
        Self {
            transport,
            config,
            queues: Arc::new(ExchangeQueues::new()),
        }
    }
}

impl Exchange for LiveExchange {
    fn maker_fee(&self) -> f64 {
        self.config.fees.maker
    }

    fn taker_fee(&self) -> f64 {
        self.config.fees.taker
    }

    fn order(&mut self, cmd: OrderCommand) -> Completion<Response> {
        self.transport.submit(&cmd, &self.queues)
    }

    fn cancel(&mut self, id: &OrderId, instrument: &Instrument) -> Completion<Response> {
        self.transport.cancel(id, instrument, &self.queues)
    }

    fn fetch_portfolio(&mut self) -> Completion<Portfolio> {
        self.transport.portfolio()
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
        self.transport.instruments()
    }

    fn queues(&self) -> &Arc<ExchangeQueues> {
        &self.queues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Resolver;
    use crate::queues::wall_clock_micros;
    use types::Side;

    /// Transport that parks requests until the test resolves them.
    struct StubTransport {
        pending: Vec<Resolver<Response>>,
    }

    impl ExchangeTransport for StubTransport {
        fn submit(
            &mut self,
            _cmd: &OrderCommand,
            _queues: &Arc<ExchangeQueues>,
        ) -> Completion<Response> {
            let (resolver, completion) = Completion::pending();
            self.pending.push(resolver);
            completion
        }

        fn cancel(
            &mut self,
            _id: &OrderId,
            _instrument: &Instrument,
            _queues: &Arc<ExchangeQueues>,
        ) -> Completion<Response> {
            let (resolver, completion) = Completion::pending();
            self.pending.push(resolver);
            completion
        }

        fn portfolio(&mut self) -> Completion<Portfolio> {
            Completion::ready(Portfolio::default())
        }
    }

    #[test]
    fn test_requests_stay_pending_until_transport_resolves() {
        let transport = StubTransport {
            pending: Vec::new(),
        };
        let mut live = LiveExchange::new(Box::new(transport), LiveExchangeConfig::default());

        let completion = live.order(OrderCommand::market(
            Side::Buy,
            "btc_usd",
            Size::from_float(0.1),
        ));
        assert!(matches!(
            completion.poll(),
            crate::completion::CompletionStatus::Pending
        ));
    }

    #[test]
    fn test_wall_clock_is_plausible() {
        // Past 2020-01-01 in microseconds.
        assert!(wall_clock_micros() > 1_577_836_800_000_000);
    }
}
