//! The view of the session a strategy callback acts through.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use exchange::{
    Completion, CompletionStatus, ErrorNotice, Exchange, ExchangeError, ExchangeQueues, Portfolio,
    Response,
};
use types::{Instant, Instrument, OrderCommand, OrderId};
use uuid::Uuid;

use crate::session::SessionStats;

/// Identifier of a timer set through the context.
pub type TimerId = u64;

/// A request whose completion is still outstanding.
pub(crate) struct PendingRequest {
    pub client_oid: Option<Uuid>,
    pub completion: Completion<Response>,
}

/// Apply the response taxonomy: `Ok` ticks and nothing else; a failure is
/// recorded on the error queue (which also ticks).
pub(crate) fn settle_response(
    queues: &ExchangeQueues,
    client_oid: Option<Uuid>,
    response: Response,
    now: Instant,
) {
    match response {
        Response::Ok => queues.tick_now(now),
        Response::Failed(error) => queues.push_error(ErrorNotice {
            client_oid,
            error,
            instant: now,
        }),
    }
}

/// Mutable session surface handed to each strategy callback.
pub struct SessionContext<'a> {
    pub(crate) now: Instant,
    pub(crate) exchange: &'a mut dyn Exchange,
    pub(crate) pending: &'a mut Vec<PendingRequest>,
    pub(crate) timers: &'a mut BinaryHeap<Reverse<(Instant, TimerId)>>,
    pub(crate) next_timer_id: &'a mut TimerId,
    pub(crate) stats: &'a mut SessionStats,
}

impl SessionContext<'_> {
    /// Current session time in microseconds. Never goes backwards.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Read-only view of the exchange for fee/precision queries.
    pub fn exchange(&self) -> &dyn Exchange {
        &*self.exchange
    }

    /// Submit an order command.
    ///
    /// An already-complete response is handled synchronously and ticks
    /// immediately; anything else is polled by the loop between items.
    pub fn submit(&mut self, cmd: OrderCommand) {
        self.stats.orders_submitted += 1;
        let client_oid = cmd.client_oid();
        let completion = self.exchange.order(cmd);
        self.settle_or_defer(Some(client_oid), completion);
    }

    /// Cancel an order by exchange id.
    pub fn cancel(&mut self, id: &OrderId, instrument: &Instrument) {
        self.stats.cancels_submitted += 1;
        let completion = self.exchange.cancel(id, instrument);
        self.settle_or_defer(None, completion);
    }

    /// Request the full balances/positions snapshot.
    pub fn fetch_portfolio(&mut self) -> Completion<Portfolio> {
        self.exchange.fetch_portfolio()
    }

    /// Schedule an `on_timer` callback at the given instant.
    pub fn set_timer(&mut self, at: Instant) -> TimerId {
        let id = *self.next_timer_id;
        *self.next_timer_id += 1;
        self.timers.push(Reverse((at, id)));
        id
    }

    fn settle_or_defer(&mut self, client_oid: Option<Uuid>, completion: Completion<Response>) {
        match completion.poll() {
            CompletionStatus::Ready(response) => {
                settle_response(self.exchange.queues(), client_oid, response, self.now);
            }
            CompletionStatus::Pending => self.pending.push(PendingRequest {
                client_oid,
                completion,
            }),
            CompletionStatus::Dropped => {
                self.exchange.queues().push_error(ErrorNotice {
                    client_oid,
                    error: ExchangeError::Internal("request dropped before completion".to_string()),
                    instant: self.now,
                });
            }
        }
    }
}
