//! Exchange error taxonomy and the queued error record.

use types::{Instant, OrderId};
use uuid::Uuid;

/// Errors surfaced by an exchange.
///
/// All variants here are recoverable: they are enqueued on the exchange's
/// error queue and forwarded to the strategy without terminating the
/// session. Fatal conditions (book invariant violations, corrupt
/// snapshots) live in their own crates' error types and abort the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExchangeError {
    /// A post-only limit order would have taken liquidity.
    #[error("post-only order would cross the book")]
    PostOnlyWouldCross,

    /// Cancel referenced an id the exchange does not know.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The exchange does not trade this instrument.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// A book delta referenced an unknown order id.
    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    /// Adapter-specific request failure.
    #[error("request failed: {0}")]
    Rejected(String),

    /// An awaited response failed unexpectedly and was wrapped.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Outcome of an order or cancel request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Request accepted; the handler ticks and nothing else.
    Ok,
    /// Request failed; the handler records the cause and ticks.
    Failed(ExchangeError),
}

/// An error queued for the session, stamped with when it occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNotice {
    /// The order the error relates to, when there is one.
    pub client_oid: Option<Uuid>,
    pub error: ExchangeError,
    pub instant: Instant,
}
