//! Error types for the data-addressing layer.

/// Result type for market-data operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors raised while addressing or streaming market data.
///
/// `DataNotFound` is recoverable — clients fall back, e.g. deriving a
/// ladder from a raw book. A corrupt snapshot stream is fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    /// The requested pattern/range matched no data sets.
    #[error("no data matching {0}")]
    DataNotFound(String),

    /// A path or pattern string did not parse.
    #[error("invalid data path: {0}")]
    InvalidPath(String),

    /// A snapshot stream failed a consistency check.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}
