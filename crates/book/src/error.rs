//! Error types for book operations.

use types::{OrderId, Price};

/// Result type for book operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Errors that can occur while mutating or querying an order book.
///
/// `UnknownOrder` is recoverable at the feed layer; the other variants
/// indicate a corrupted delta stream and are fatal to the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookError {
    /// A `Change` referenced an order id that is not in the book.
    #[error("change for unknown order id: {0}")]
    UnknownOrder(OrderId),

    /// Best bid at or above best ask; the delta stream has corrupted the book.
    #[error("book is crossed: best bid {bid} >= best ask {ask}")]
    CrossedBook { bid: Price, ask: Price },

    /// An internal consistency check failed.
    #[error("book invariant violated: {0}")]
    InvariantViolation(String),
}
