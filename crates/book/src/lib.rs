//! Book: the incremental limit order book engine.
//!
//! This crate provides the delta-driven order book with price-time
//! priority matching, the fixed-depth ladder projection derived from it,
//! and the error types for invariant violations.

mod error;
mod ladder;
mod order_book;

pub use error::{BookError, Result};
pub use ladder::{Ladder, LadderLevel};
pub use order_book::{FillLevels, OrderBook};
