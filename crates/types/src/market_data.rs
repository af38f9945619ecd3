//! Market-data value types: price points, trade ticks, candles, bars,
//! fills, and order events.
//!
//! Every record carries the microsecond instant at which it occurred; the
//! tick loop merges heterogeneous streams on that field.

use crate::money::{Cash, Price, Size};
use crate::order::{Instrument, OrderId, Side};
use crate::time::Instant;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Price Points and Trade Ticks
// =============================================================================

/// A bare timestamped price observation, e.g. from a synthetic tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub instant: Instant,
    pub price: Price,
}

impl PricePoint {
    pub fn new(instant: Instant, price: Price) -> Self {
        Self { instant, price }
    }
}

/// A sized trade print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTick {
    pub instant: Instant,
    pub price: Price,
    pub size: Size,
}

// =============================================================================
// OHLCV Candle
// =============================================================================

/// OHLCV bucket over a fixed interval.
///
/// `instant` is the start of the candle's interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub instant: Instant,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Size,
}

impl Candle {
    /// Create a new candle.
    pub fn new(
        instant: Instant,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Size,
    ) -> Self {
        Self {
            instant,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Get the typical price (HLC/3).
    #[inline]
    pub fn typical_price(&self) -> Price {
        Price((self.high.0 + self.low.0 + self.close.0) / 3)
    }

    /// Get the candle range (high - low).
    #[inline]
    pub fn range(&self) -> Price {
        self.high - self.low
    }

    /// Check if this is a bullish candle (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if this is a bearish candle (close < open).
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

// =============================================================================
// Bar
// =============================================================================

/// A candle paired with an explicit end time, suitable for indicator
/// libraries. For a bar derived with step `d`, `end = candle.instant + d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub candle: Candle,
    pub end: Instant,
}

impl Bar {
    pub fn new(candle: Candle, end: Instant) -> Self {
        Self { candle, end }
    }

    /// Start of the bar's interval.
    #[inline]
    pub fn begin(&self) -> Instant {
        self.candle.instant
    }
}

// =============================================================================
// Fills and Order Events
// =============================================================================

/// A single execution against one resting price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Client id of the order this fill belongs to.
    pub client_oid: Uuid,
    /// Exchange-assigned id of the aggressing order.
    pub order_id: OrderId,
    pub instrument: Instrument,
    pub side: Side,
    pub price: Price,
    pub size: Size,
    /// Fee charged for this fill, in quote currency.
    pub fee: Cash,
    pub instant: Instant,
}

impl Fill {
    /// Notional value of this fill before fees.
    pub fn notional(&self) -> Cash {
        self.price * self.size
    }
}

/// Lifecycle notification for a strategy-submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub client_oid: Uuid,
    pub order_id: OrderId,
    pub instrument: Instrument,
    pub kind: OrderEventKind,
    pub instant: Instant,
}

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEventKind {
    /// Request accepted by the exchange.
    Received,
    /// Remainder opened on the book at this price/size.
    Opened { price: Price, size: Size },
    /// Order fully consumed or otherwise finished.
    Done,
    /// Order cancelled on request.
    Canceled,
}
