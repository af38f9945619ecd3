//! Market: the data-addressing layer.
//!
//! Market data is addressed by hierarchical `exchange/instrument/datatype`
//! paths. Patterns with wildcards expand against an in-memory index before
//! streaming; selections bound the instant range. Snapshot order records
//! rebuild a book from a `seq`-ordered stream.

mod error;
mod index;
mod path;
mod snapshot;

pub use error::{MarketError, Result};
pub use index::{DataIndex, MarketItem, MarketPayload};
pub use path::{DataPath, DataSelection, DataType, PathPattern};
pub use snapshot::{book_from_snapshot, snapshot_from_book, SnapshotOrder};
