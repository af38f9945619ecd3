//! The tick loop: deterministic progression of session time.
//!
//! Each iteration selects the pending item with the smallest timestamp
//! across five sources; ties break in source order (market data, fills,
//! events, errors, timers). After dispatching one item the loop drains
//! the exchange queues and re-enters selection. In backtest the loop
//! terminates once the data source is exhausted and all queues are empty.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::iter::Peekable;
use std::sync::Arc;
use std::vec::IntoIter;

use exchange::{CompletionStatus, ErrorNotice, Exchange, ExchangeError};
use market::MarketItem;
use tracing::{debug, info, trace, warn};
use types::{Fill, Instant, OrderEvent};

use crate::context::{settle_response, PendingRequest, SessionContext, TimerId};
use crate::error::SessionError;
use crate::strategy::Strategy;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Market-data items dispatched to the strategy.
    pub items_dispatched: u64,
    /// Fills delivered.
    pub fills: u64,
    /// Order events delivered.
    pub events: u64,
    /// Recoverable errors delivered.
    pub errors: u64,
    /// Timers fired.
    pub timers_fired: u64,
    /// Orders submitted by the strategy.
    pub orders_submitted: u64,
    /// Cancels submitted by the strategy.
    pub cancels_submitted: u64,
    /// Final session time.
    pub last_instant: Instant,
}

/// Which source the next item comes from. Variant order is the tie order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Data,
    Fill,
    Event,
    Error,
    Timer,
}

const SOURCES: [Source; 5] = [
    Source::Data,
    Source::Fill,
    Source::Event,
    Source::Error,
    Source::Timer,
];

/// A single-strategy trading session over one exchange.
pub struct Session<S: Strategy> {
    strategy: S,
    exchange: Box<dyn Exchange>,
    data: Peekable<IntoIter<MarketItem>>,
    fills: VecDeque<Fill>,
    events: VecDeque<OrderEvent>,
    errors: VecDeque<ErrorNotice>,
    timers: BinaryHeap<Reverse<(Instant, TimerId)>>,
    pending: Vec<PendingRequest>,
    next_timer_id: TimerId,
    now: Instant,
    stats: SessionStats,
}

impl<S: Strategy> Session<S> {
    /// Build a backtest session over an in-memory item stream.
    ///
    /// Installs the session's tick callback into the exchange queues; the
    /// queue clock doubles as the simulated exchange's tick source, so no
    /// module-global state is involved.
    pub fn backtest(strategy: S, exchange: Box<dyn Exchange>, items: Vec<MarketItem>) -> Self {
        exchange
            .queues()
            .install_tick(Arc::new(|at| trace!(at, "tick")));

        Self {
            strategy,
            exchange,
            data: items.into_iter().peekable(),
            fills: VecDeque::new(),
            events: VecDeque::new(),
            errors: VecDeque::new(),
            timers: BinaryHeap::new(),
            pending: Vec::new(),
            next_timer_id: 1,
            now: i64::MIN,
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Tear down and hand the strategy back.
    pub fn into_strategy(self) -> S {
        self.strategy
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<SessionStats, SessionError> {
        info!(strategy = self.strategy.name(), "session start");

        loop {
            self.poll_pending();
            self.collect_exchange_output();

            let Some(source) = self.next_source() else {
                // Data exhausted and buffers empty; one final drain in case
                // a late completion pushed output.
                if self.collect_exchange_output() == 0 {
                    break;
                }
                continue;
            };

            // Timers do not keep a backtest alive: once the data source is
            // exhausted and the queues are drained, the loop ends and
            // unfired timers are discarded.
            if source == Source::Timer
                && self.data.peek().is_none()
                && self.fills.is_empty()
                && self.events.is_empty()
                && self.errors.is_empty()
                && self.exchange.queues().is_empty()
            {
                break;
            }

            self.dispatch(source)?;
        }

        self.shutdown();
        info!(
            items = self.stats.items_dispatched,
            fills = self.stats.fills,
            orders = self.stats.orders_submitted,
            "session end"
        );
        Ok(self.stats.clone())
    }

    /// Select the smallest-instant item; ties keep `SOURCES` order.
    fn next_source(&mut self) -> Option<Source> {
        let heads = [
            self.data.peek().map(|item| item.instant),
            self.fills.front().map(|fill| fill.instant),
            self.events.front().map(|event| event.instant),
            self.errors.front().map(|notice| notice.instant),
            self.timers.peek().map(|Reverse((at, _))| *at),
        ];

        let mut best: Option<(Instant, Source)> = None;
        for (head, source) in heads.into_iter().zip(SOURCES) {
            let Some(at) = head else { continue };
            let better = match best {
                Some((best_at, _)) => at < best_at,
                None => true,
            };
            if better {
                best = Some((at, source));
            }
        }
        best.map(|(_, source)| source)
    }

    fn dispatch(&mut self, source: Source) -> Result<(), SessionError> {
        match source {
            Source::Data => {
                let Some(item) = self.data.next() else {
                    return Ok(());
                };
                self.advance_clock(item.instant);
                self.stats.items_dispatched += 1;
                self.exchange.feed(&item);
                let mut ctx = SessionContext {
                    now: self.now,
                    exchange: self.exchange.as_mut(),
                    pending: &mut self.pending,
                    timers: &mut self.timers,
                    next_timer_id: &mut self.next_timer_id,
                    stats: &mut self.stats,
                };
                self.strategy.on_data(&mut ctx, &item)?;
            }
            Source::Fill => {
                let Some(fill) = self.fills.pop_front() else {
                    return Ok(());
                };
                self.advance_clock(fill.instant);
                self.stats.fills += 1;
                let mut ctx = SessionContext {
                    now: self.now,
                    exchange: self.exchange.as_mut(),
                    pending: &mut self.pending,
                    timers: &mut self.timers,
                    next_timer_id: &mut self.next_timer_id,
                    stats: &mut self.stats,
                };
                self.strategy.on_fill(&mut ctx, &fill)?;
            }
            Source::Event => {
                let Some(event) = self.events.pop_front() else {
                    return Ok(());
                };
                self.advance_clock(event.instant);
                self.stats.events += 1;
                let mut ctx = SessionContext {
                    now: self.now,
                    exchange: self.exchange.as_mut(),
                    pending: &mut self.pending,
                    timers: &mut self.timers,
                    next_timer_id: &mut self.next_timer_id,
                    stats: &mut self.stats,
                };
                self.strategy.on_event(&mut ctx, &event)?;
            }
            Source::Error => {
                let Some(notice) = self.errors.pop_front() else {
                    return Ok(());
                };
                self.advance_clock(notice.instant);
                self.stats.errors += 1;
                debug!(error = %notice.error, "forwarding exchange error");
                let mut ctx = SessionContext {
                    now: self.now,
                    exchange: self.exchange.as_mut(),
                    pending: &mut self.pending,
                    timers: &mut self.timers,
                    next_timer_id: &mut self.next_timer_id,
                    stats: &mut self.stats,
                };
                self.strategy.on_error(&mut ctx, &notice)?;
            }
            Source::Timer => {
                let Some(Reverse((at, id))) = self.timers.pop() else {
                    return Ok(());
                };
                self.advance_clock(at);
                self.stats.timers_fired += 1;
                let mut ctx = SessionContext {
                    now: self.now,
                    exchange: self.exchange.as_mut(),
                    pending: &mut self.pending,
                    timers: &mut self.timers,
                    next_timer_id: &mut self.next_timer_id,
                    stats: &mut self.stats,
                };
                self.strategy.on_timer(&mut ctx, id)?;
            }
        }
        Ok(())
    }

    /// Session time is monotonic non-decreasing: a late-stamped item is
    /// dispatched at the current clock, never behind it.
    fn advance_clock(&mut self, at: Instant) {
        if at > self.now {
            self.now = at;
        }
        self.stats.last_instant = self.now;
    }

    /// Drain the three exchange queues atomically into the local buffers.
    fn collect_exchange_output(&mut self) -> usize {
        let collected = self.exchange.queues().collect();
        let n = collected.len();
        self.fills.extend(collected.fills);
        self.events.extend(collected.events);
        self.errors.extend(collected.errors);
        n
    }

    /// Poll outstanding request completions; a dropped resolver becomes a
    /// wrapped internal error.
    fn poll_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let now = self.now;
        let outstanding = std::mem::take(&mut self.pending);
        for request in outstanding {
            match request.completion.poll() {
                CompletionStatus::Ready(response) => {
                    settle_response(self.exchange.queues(), request.client_oid, response, now);
                }
                CompletionStatus::Pending => self.pending.push(request),
                CompletionStatus::Dropped => {
                    self.exchange.queues().push_error(ErrorNotice {
                        client_oid: request.client_oid,
                        error: ExchangeError::Internal(
                            "request dropped before completion".to_string(),
                        ),
                        instant: now,
                    });
                }
            }
        }
    }

    /// Drain everything left after the loop ends; outstanding output is
    /// discarded, with a warning when fills are among it.
    fn shutdown(&mut self) {
        let leftover = self.exchange.queues().collect();
        if !leftover.fills.is_empty() {
            warn!(
                count = leftover.fills.len(),
                "discarding fills after shutdown"
            );
        }
        if !self.pending.is_empty() {
            warn!(count = self.pending.len(), "abandoning pending requests");
        }
        if !self.timers.is_empty() {
            debug!(count = self.timers.len(), "unfired timers at shutdown");
        }
    }
}
