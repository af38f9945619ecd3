//! The strategy callback contract.

use exchange::ErrorNotice;
use market::MarketItem;
use types::{Fill, OrderEvent};

use crate::context::{SessionContext, TimerId};
use crate::error::SessionError;

/// The narrow contract between the session and a trading strategy.
///
/// Exactly one callback runs at a time; callbacks must not block. Any
/// externally awaited work is scheduled through the exchange, whose
/// completion enqueues a tick. Returning an error aborts the session;
/// recoverable conditions arrive through [`on_error`](Self::on_error)
/// instead and do not terminate anything.
pub trait Strategy {
    /// A market-data item was dispatched.
    fn on_data(
        &mut self,
        ctx: &mut SessionContext<'_>,
        item: &MarketItem,
    ) -> Result<(), SessionError>;

    /// One of this strategy's orders was (partially) executed.
    fn on_fill(&mut self, _ctx: &mut SessionContext<'_>, _fill: &Fill) -> Result<(), SessionError> {
        Ok(())
    }

    /// An order lifecycle event arrived.
    fn on_event(
        &mut self,
        _ctx: &mut SessionContext<'_>,
        _event: &OrderEvent,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    /// A recoverable exchange error was drained from the error queue.
    fn on_error(
        &mut self,
        _ctx: &mut SessionContext<'_>,
        _notice: &ErrorNotice,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    /// A timer set through the context came due.
    fn on_timer(
        &mut self,
        _ctx: &mut SessionContext<'_>,
        _timer: TimerId,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "strategy"
    }
}
