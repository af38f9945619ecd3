//! Fixed-depth ladder projection.
//!
//! A ladder is the top-N price levels of a book per side with summed
//! queue amounts. It is a pure function of the book, recomputed on
//! demand; callers that want caching can key on `OrderBook::version`.

use serde::{Deserialize, Serialize};
use types::{Price, Size};

use crate::order_book::OrderBook;

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderLevel {
    pub price: Price,
    pub size: Size,
}

/// Fixed-depth aggregated view of a book: bids highest-first, asks
/// lowest-first, each at most `depth` levels long.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ladder {
    pub bids: Vec<LadderLevel>,
    pub asks: Vec<LadderLevel>,
}

impl Ladder {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint of best bid and ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price((bid.0 + ask.0) / 2)),
            _ => None,
        }
    }
}

impl OrderBook {
    /// Project the top `depth` levels of each side into a ladder.
    pub fn ladder(&self, depth: usize) -> Ladder {
        let level = |(price, size): (Price, Size)| LadderLevel { price, size };

        let bids = self
            .level_sizes(types::Side::Buy)
            .take(depth)
            .map(level)
            .collect();
        let asks = self
            .level_sizes(types::Side::Sell)
            .take(depth)
            .map(level)
            .collect();

        Ladder { bids, asks }
    }

    /// Aggregated (price, total size) per level, best-first.
    fn level_sizes(&self, side: types::Side) -> Box<dyn Iterator<Item = (Price, Size)> + '_> {
        let sum = move |(price, queue): (&Price, &std::collections::VecDeque<types::OrderId>)| {
            let total: Size = queue
                .iter()
                .filter_map(|id| self.order(id))
                .map(|o| o.amount)
                .sum();
            (*price, total)
        };

        match side {
            types::Side::Buy => Box::new(self.bid_level_iter().map(sum)),
            types::Side::Sell => Box::new(self.ask_level_iter().map(sum)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Side;

    fn seeded_book() -> OrderBook {
        let mut book = OrderBook::new();
        book.open("b1", Price::from_float(99.0), Size::from_float(1.0), Side::Buy);
        book.open("b2", Price::from_float(99.0), Size::from_float(0.5), Side::Buy);
        book.open("b3", Price::from_float(98.0), Size::from_float(2.0), Side::Buy);
        book.open("b4", Price::from_float(97.0), Size::from_float(4.0), Side::Buy);
        book.open("a1", Price::from_float(100.0), Size::from_float(1.5), Side::Sell);
        book.open("a2", Price::from_float(101.0), Size::from_float(3.0), Side::Sell);
        book
    }

    #[test]
    fn test_ladder_aggregates_levels() {
        let ladder = seeded_book().ladder(2);

        assert_eq!(ladder.bids.len(), 2);
        assert_eq!(ladder.asks.len(), 2);

        // Two bids at 99 sum into one level.
        assert_eq!(ladder.bids[0].price, Price::from_float(99.0));
        assert_eq!(ladder.bids[0].size, Size::from_float(1.5));
        assert_eq!(ladder.bids[1].price, Price::from_float(98.0));

        assert_eq!(ladder.asks[0].price, Price::from_float(100.0));
        assert_eq!(ladder.asks[1].price, Price::from_float(101.0));
    }

    #[test]
    fn test_ladder_depth_caps_levels() {
        let ladder = seeded_book().ladder(1);
        assert_eq!(ladder.bids.len(), 1);
        assert_eq!(ladder.asks.len(), 1);
        assert_eq!(ladder.spread(), Some(Price::from_float(1.0)));
        assert_eq!(ladder.mid_price(), Some(Price::from_float(99.5)));
    }

    #[test]
    fn test_ladder_of_empty_book() {
        let ladder = OrderBook::new().ladder(5);
        assert!(ladder.bids.is_empty());
        assert!(ladder.asks.is_empty());
        assert_eq!(ladder.spread(), None);
    }
}
