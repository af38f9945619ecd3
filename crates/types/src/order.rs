//! Order, delta, and order-command types.
//!
//! `Delta` is the wire form for incremental book changes and `OrderCommand`
//! the wire form for strategy-submitted orders. Field order in the tagged
//! serializations is part of the interchange contract.

use crate::money::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Exchange-assigned order identifier.
pub type OrderId = String;

/// Instrument symbol (e.g. "btc_usd").
pub type Instrument = String;

// =============================================================================
// Side
// =============================================================================

/// Which side of the market an order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

// =============================================================================
// Resting Order
// =============================================================================

/// An order resting in (or bound for) a book.
///
/// `price` is `None` only for market orders in flight; every order resting
/// in a book carries a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOrder {
    pub id: OrderId,
    pub side: Side,
    pub amount: Size,
    pub price: Option<Price>,
}

impl BookOrder {
    /// Create a priced (restable) order.
    pub fn limit(id: impl Into<OrderId>, side: Side, amount: Size, price: Price) -> Self {
        Self {
            id: id.into(),
            side,
            amount,
            price: Some(price),
        }
    }
}

// =============================================================================
// Delta
// =============================================================================

/// A minimal incremental change to an order book.
///
/// Serialized internally tagged so the tag leads, then `id`, then the
/// variant fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Delta {
    /// Add a new resting order.
    Open {
        id: OrderId,
        price: Price,
        size: Size,
        side: Side,
    },
    /// Remove an order completely. Unknown ids are silently ignored.
    Done { id: OrderId },
    /// In-place size mutation at the same price bucket.
    Change { id: OrderId, new_size: Size },
}

impl Delta {
    /// The order id this delta refers to.
    pub fn order_id(&self) -> &OrderId {
        match self {
            Delta::Open { id, .. } | Delta::Done { id } | Delta::Change { id, .. } => id,
        }
    }
}

/// How a `Change` repositions the mutated order within its price queue.
///
/// The historical feed semantics re-append the changed order at the tail
/// regardless of direction; most venues preserve time priority on size
/// decreases. Replay equivalence requires the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Remove then append at the tail, always.
    #[default]
    AlwaysReinsert,
    /// Keep queue position when the size shrinks; reinsert on growth.
    PreserveOnDecrease,
}

// =============================================================================
// Order Commands
// =============================================================================

/// Strategy-submitted order request, in wire form.
///
/// `client_oid` is a client-generated UUID used for idempotent replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderCommand {
    Limit {
        client_oid: Uuid,
        side: Side,
        instrument: Instrument,
        size: Size,
        price: Price,
        post_only: bool,
    },
    Market {
        client_oid: Uuid,
        side: Side,
        instrument: Instrument,
        size: Size,
    },
}

impl OrderCommand {
    /// Convenience constructor for a limit order.
    pub fn limit(
        side: Side,
        instrument: impl Into<Instrument>,
        size: Size,
        price: Price,
        post_only: bool,
    ) -> Self {
        Self::Limit {
            client_oid: Uuid::new_v4(),
            side,
            instrument: instrument.into(),
            size,
            price,
            post_only,
        }
    }

    /// Convenience constructor for a market order.
    pub fn market(side: Side, instrument: impl Into<Instrument>, size: Size) -> Self {
        Self::Market {
            client_oid: Uuid::new_v4(),
            side,
            instrument: instrument.into(),
            size,
        }
    }

    pub fn client_oid(&self) -> Uuid {
        match self {
            Self::Limit { client_oid, .. } | Self::Market { client_oid, .. } => *client_oid,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Self::Limit { side, .. } | Self::Market { side, .. } => *side,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        match self {
            Self::Limit { instrument, .. } | Self::Market { instrument, .. } => instrument,
        }
    }

    pub fn size(&self) -> Size {
        match self {
            Self::Limit { size, .. } | Self::Market { size, .. } => *size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_delta_wire_form_tag_leads() {
        let delta = Delta::Open {
            id: "a1".to_string(),
            price: Price::from_float(100.0),
            size: Size::from_float(1.0),
            side: Side::Sell,
        };

        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.starts_with(r#"{"tag":"open","id":"a1""#), "{json}");

        let back: Delta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
    }

    #[test]
    fn test_delta_change_wire_form() {
        let delta = Delta::Change {
            id: "a1".to_string(),
            new_size: Size::from_float(2.0),
        };

        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.starts_with(r#"{"tag":"change","id":"a1""#), "{json}");
    }

    #[test]
    fn test_order_command_round_trip() {
        let cmd = OrderCommand::limit(
            Side::Buy,
            "btc_usd",
            Size::from_float(0.5),
            Price::from_float(30_000.0),
            true,
        );

        let json = serde_json::to_string(&cmd).unwrap();
        let back: OrderCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
        assert_eq!(back.client_oid(), cmd.client_oid());
    }
}
