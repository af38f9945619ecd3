//! The three concurrent queues every exchange shares with its session.
//!
//! Fills, events, and errors sit behind a single mutex so `collect`
//! drains all three atomically. Every push invokes the installed tick
//! sink with the instant of the pushed record, advancing the session's
//! action queue; the most recent tick instant is also retained for the
//! simulated exchange's synthetic clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use types::{Fill, Instant, OrderEvent};

use crate::error::ErrorNotice;

/// Callback invoked with the current instant whenever exchange output
/// lands. Installed by the session; absent means ticks are dropped.
pub type TickSink = Arc<dyn Fn(Instant) + Send + Sync>;

/// Current wall-clock time in microseconds since the epoch.
pub fn wall_clock_micros() -> Instant {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
struct Buffers {
    fills: VecDeque<Fill>,
    events: VecDeque<OrderEvent>,
    errors: VecDeque<ErrorNotice>,
}

/// Everything drained from the queues in one atomic pass.
#[derive(Debug, Default)]
pub struct Collected {
    pub fills: Vec<Fill>,
    pub events: Vec<OrderEvent>,
    pub errors: Vec<ErrorNotice>,
}

impl Collected {
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty() && self.events.is_empty() && self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fills.len() + self.events.len() + self.errors.len()
    }
}

/// Multi-producer queues mutated by the exchange, drained by the session.
pub struct ExchangeQueues {
    buffers: Mutex<Buffers>,
    tick: Mutex<Option<TickSink>>,
    last_tick: AtomicI64,
}

impl Default for ExchangeQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeQueues {
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(Buffers::default()),
            tick: Mutex::new(None),
            last_tick: AtomicI64::new(i64::MIN),
        }
    }

    /// Install the session's tick callback. Replaces any previous sink.
    pub fn install_tick(&self, sink: TickSink) {
        *self.tick.lock() = Some(sink);
    }

    /// Most recent instant passed to the tick sink, or `None` before the
    /// first tick.
    pub fn last_tick(&self) -> Option<Instant> {
        match self.last_tick.load(Ordering::Acquire) {
            i64::MIN => None,
            at => Some(at),
        }
    }

    /// Invoke the tick sink directly (response completions tick too).
    pub fn tick_now(&self, at: Instant) {
        self.last_tick.fetch_max(at, Ordering::AcqRel);
        let sink = self.tick.lock().clone();
        if let Some(sink) = sink {
            sink(at);
        }
    }

    pub fn push_fill(&self, fill: Fill) {
        let at = fill.instant;
        self.buffers.lock().fills.push_back(fill);
        self.tick_now(at);
    }

    pub fn push_event(&self, event: OrderEvent) {
        let at = event.instant;
        self.buffers.lock().events.push_back(event);
        self.tick_now(at);
    }

    pub fn push_error(&self, notice: ErrorNotice) {
        let at = notice.instant;
        self.buffers.lock().errors.push_back(notice);
        self.tick_now(at);
    }

    /// Atomically drain all three queues, FIFO order preserved.
    pub fn collect(&self) -> Collected {
        let mut buffers = self.buffers.lock();
        Collected {
            fills: buffers.fills.drain(..).collect(),
            events: buffers.events.drain(..).collect(),
            errors: buffers.errors.drain(..).collect(),
        }
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        let buffers = self.buffers.lock();
        buffers.fills.is_empty() && buffers.events.is_empty() && buffers.errors.is_empty()
    }
}
