//! Core types for the tickfold trading framework.
//!
//! This crate provides the shared value types used across the workspace:
//! microsecond time primitives, fixed-point monetary values, order and
//! delta types, and market-data records (price points, candles, bars,
//! fills, order events).

mod market_data;
mod money;
mod order;
mod time;

pub use market_data::{Bar, Candle, Fill, OrderEvent, OrderEventKind, PricePoint, TradeTick};
pub use money::{Cash, Price, Size, SCALE};
pub use order::{BookOrder, ChangePolicy, Delta, Instrument, OrderCommand, OrderId, Side};
pub use time::{
    floor_to, format_duration, parse_duration, DurationMicros, Instant, TimeRange, MICROS_PER_DAY,
    MICROS_PER_HOUR, MICROS_PER_MINUTE, MICROS_PER_SECOND,
};
