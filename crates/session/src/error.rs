//! Session-fatal errors.
//!
//! Recoverable exchange errors travel through the error queue and reach
//! the strategy as callbacks; the variants here abort the run.

/// Errors that terminate a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A book invariant was violated (corrupted delta stream).
    #[error(transparent)]
    Book(#[from] book::BookError),

    /// Market-data addressing failed (unknown path, corrupt snapshot).
    #[error(transparent)]
    Market(#[from] market::MarketError),

    /// The strategy declared an unrecoverable condition.
    #[error("strategy aborted: {0}")]
    Strategy(String),
}
