//! Order book implementation using BTreeMap for price-time priority.
//!
//! The book keeps three views over the same set of orders: an id index,
//! ask levels in ascending price order, and bid levels in descending
//! price order. Within a level, order ids queue in FIFO arrival order.
//! Empty levels are removed eagerly so the best level is always occupied.

use std::collections::{BTreeMap, HashMap, VecDeque};

use smallvec::SmallVec;
use types::{BookOrder, ChangePolicy, Delta, OrderId, Price, Side, Size};

use crate::error::{BookError, Result};

/// Fills produced by one matching pass: `(price, size)` per resting order
/// consumed, in match order.
pub type FillLevels = SmallVec<[(Price, Size); 4]>;

/// Delta-driven limit order book for a single instrument.
///
/// Mutations happen in place; a monotonic `version` lets observers detect
/// change between consistent states (the external contract is
/// copy-on-write, and no observer can see a mid-mutation state).
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Quick lookup of resting orders by id.
    by_id: HashMap<OrderId, BookOrder>,
    /// Sell levels, lowest price first when iterating forward.
    asks: BTreeMap<Price, VecDeque<OrderId>>,
    /// Buy levels, highest price first when iterating in reverse.
    bids: BTreeMap<Price, VecDeque<OrderId>>,
    /// Most recent delta applied through `update`.
    last_update: Option<Delta>,
    /// Bumped on every mutation.
    version: u64,
    change_policy: ChangePolicy,
}

impl OrderBook {
    /// Create a new empty order book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty book with an explicit change policy.
    pub fn with_change_policy(change_policy: ChangePolicy) -> Self {
        Self {
            change_policy,
            ..Self::default()
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Total number of resting orders.
    pub fn order_count(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the book has any orders.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look up a resting order by id.
    pub fn order(&self, id: &str) -> Option<&BookOrder> {
        self.by_id.get(id)
    }

    /// The most recent delta applied through [`update`](Self::update).
    pub fn last_update(&self) -> Option<&Delta> {
        self.last_update.as_ref()
    }

    /// Monotonic mutation counter; equal versions imply identical state.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn change_policy(&self) -> ChangePolicy {
        self.change_policy
    }

    /// Get the best bid (highest buy price).
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Get the best ask (lowest sell price).
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Spread between best ask and best bid.
    ///
    /// `None` when either side is empty. A crossed book (bid >= ask) is a
    /// corrupted delta stream and surfaces as a hard error.
    pub fn spread(&self) -> Result<Option<Price>> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                if bid >= ask {
                    Err(BookError::CrossedBook { bid, ask })
                } else {
                    Ok(Some(ask - bid))
                }
            }
            _ => Ok(None),
        }
    }

    /// Midpoint of best bid and ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price((bid.0 + ask.0) / 2)),
            _ => None,
        }
    }

    /// Total resting bid volume across the top `levels` price levels.
    pub fn bid_depth(&self, levels: usize) -> Size {
        self.bids
            .iter()
            .rev()
            .take(levels)
            .map(|(_, queue)| self.queue_volume(queue))
            .sum()
    }

    /// Total resting ask volume across the top `levels` price levels.
    pub fn ask_depth(&self, levels: usize) -> Size {
        self.asks
            .iter()
            .take(levels)
            .map(|(_, queue)| self.queue_volume(queue))
            .sum()
    }

    /// Total volume of all resting bids.
    pub fn total_bid_volume(&self) -> Size {
        self.bid_depth(usize::MAX)
    }

    /// Total volume of all resting asks.
    pub fn total_ask_volume(&self) -> Size {
        self.ask_depth(usize::MAX)
    }

    /// Number of occupied price levels on the bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of occupied price levels on the ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// All resting orders: asks best-first, then bids best-first, FIFO
    /// within each level. Deterministic, used for fold/snapshot streaming.
    pub fn orders(&self) -> impl Iterator<Item = &BookOrder> + '_ {
        let asks = self.asks.values().flat_map(|q| q.iter());
        let bids = self.bids.values().rev().flat_map(|q| q.iter());
        asks.chain(bids).filter_map(|id| self.by_id.get(id))
    }

    /// Bid levels best-first, for projections within the crate.
    pub(crate) fn bid_level_iter(
        &self,
    ) -> impl Iterator<Item = (&Price, &VecDeque<OrderId>)> + '_ {
        self.bids.iter().rev()
    }

    /// Ask levels best-first, for projections within the crate.
    pub(crate) fn ask_level_iter(
        &self,
    ) -> impl Iterator<Item = (&Price, &VecDeque<OrderId>)> + '_ {
        self.asks.iter()
    }

    fn queue_volume(&self, queue: &VecDeque<OrderId>) -> Size {
        queue
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .map(|o| o.amount)
            .sum()
    }

    fn side_levels(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<OrderId>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new resting order at the tail of its price level.
    ///
    /// Replaying an `Open` for an id already in the book is a caller bug;
    /// the stream contract guarantees unique open ids.
    pub fn open(&mut self, id: impl Into<OrderId>, price: Price, size: Size, side: Side) {
        let id = id.into();
        debug_assert!(!self.by_id.contains_key(&id), "open replayed for {id}");
        self.by_id
            .insert(id.clone(), BookOrder::limit(id.clone(), side, size, price));
        self.side_levels(side).entry(price).or_default().push_back(id);
        self.version += 1;
    }

    /// Remove an order completely. Unknown ids are tolerated: late `Done`
    /// events from exchanges are common.
    pub fn done(&mut self, id: &str) {
        let Some(order) = self.by_id.remove(id) else {
            return;
        };
        // Market orders never rest, so a stored order always has a price.
        if let Some(price) = order.price {
            self.remove_from_level(order.side, price, id);
        }
        self.version += 1;
    }

    /// Replace an order's size.
    ///
    /// Under the default [`ChangePolicy::AlwaysReinsert`], the order is
    /// removed from its level queue and re-appended at the tail, matching
    /// the historical feed semantics exactly. `PreserveOnDecrease` keeps
    /// queue position when the size shrinks.
    pub fn change(&mut self, id: &str, new_size: Size) -> Result<()> {
        let (side, price, old_size) = {
            let order = self
                .by_id
                .get(id)
                .ok_or_else(|| BookError::UnknownOrder(id.to_string()))?;
            (order.side, order.price, order.amount)
        };

        if let Some(order) = self.by_id.get_mut(id) {
            order.amount = new_size;
        }

        let reinsert = match self.change_policy {
            ChangePolicy::AlwaysReinsert => true,
            ChangePolicy::PreserveOnDecrease => new_size > old_size,
        };
        if reinsert {
            if let Some(price) = price {
                self.remove_from_level(side, price, id);
                self.side_levels(side)
                    .entry(price)
                    .or_default()
                    .push_back(id.to_string());
            }
        }

        self.version += 1;
        Ok(())
    }

    /// Apply a delta and record it as the book's `last_update`.
    pub fn update(&mut self, delta: Delta) -> Result<()> {
        match &delta {
            Delta::Open {
                id,
                price,
                size,
                side,
            } => self.open(id.clone(), *price, *size, *side),
            Delta::Done { id } => self.done(id),
            Delta::Change { id, new_size } => self.change(id, *new_size)?,
        }
        self.last_update = Some(delta);
        Ok(())
    }

    fn remove_from_level(&mut self, side: Side, price: Price, id: &str) {
        let levels = self.side_levels(side);
        if let Some(queue) = levels.get_mut(&price) {
            if let Some(pos) = queue.iter().position(|qid| qid.as_str() == id) {
                queue.remove(pos);
            }
            // No empty levels: the best level must always be occupied.
            if queue.is_empty() {
                levels.remove(&price);
            }
        }
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Match `quantity` for an aggressing `side` against the opposite side,
    /// walking price levels best-first and FIFO within a level.
    ///
    /// Fully consumed resting orders are removed; a partially consumed one
    /// is resized through [`change`](Self::change), inheriting its queue
    /// repositioning semantics. With `limit` set, matching halts once the
    /// best opposite price violates it. An exhausted opposite side returns
    /// the partial fills without error.
    pub fn fill(
        &mut self,
        side: Side,
        quantity: Size,
        limit: Option<Price>,
    ) -> Result<FillLevels> {
        let mut fills = FillLevels::new();
        let mut remaining = quantity;

        while remaining.is_positive() {
            let best = match side {
                Side::Buy => self
                    .asks
                    .iter()
                    .next()
                    .and_then(|(p, q)| q.front().map(|id| (*p, id.clone()))),
                Side::Sell => self
                    .bids
                    .iter()
                    .next_back()
                    .and_then(|(p, q)| q.front().map(|id| (*p, id.clone()))),
            };
            let Some((best_price, top_id)) = best else {
                break; // opposite side exhausted
            };

            if let Some(limit) = limit {
                let violates = match side {
                    Side::Buy => limit < best_price,
                    Side::Sell => limit > best_price,
                };
                if violates {
                    break;
                }
            }

            let top_amount = self
                .by_id
                .get(&top_id)
                .map(|o| o.amount)
                .ok_or_else(|| {
                    BookError::InvariantViolation(format!("queued id {top_id} missing from index"))
                })?;

            let consumed = remaining.min(top_amount);
            if consumed == top_amount {
                self.done(&top_id);
            } else {
                self.change(&top_id, top_amount - consumed)?;
            }

            fills.push((best_price, consumed));
            remaining -= consumed;
        }

        Ok(fills)
    }

    // =========================================================================
    // Fold / Unfold
    // =========================================================================

    /// Rebuild on top of a base state: replay every order of `overlay` as
    /// an `Open` against `self`.
    pub fn fold(mut self, overlay: &OrderBook) -> OrderBook {
        let orders: Vec<BookOrder> = overlay.orders().cloned().collect();
        for order in orders {
            if let Some(price) = order.price {
                self.open(order.id, price, order.amount, order.side);
            }
        }
        self
    }

    /// Pop one order into a singleton book, bounding snapshot chunk size.
    ///
    /// Returns `(self, None)` once the book holds one order or fewer.
    pub fn unfold(mut self) -> (OrderBook, Option<OrderBook>) {
        if self.order_count() <= 1 {
            return (self, None);
        }

        let next_id = self
            .asks
            .values()
            .next()
            .and_then(|q| q.front().cloned())
            .or_else(|| self.bids.values().next_back().and_then(|q| q.front().cloned()));

        let Some(id) = next_id else {
            return (self, None);
        };
        let Some(order) = self.by_id.get(&id).cloned() else {
            return (self, None);
        };
        self.done(&id);

        let mut single = OrderBook::with_change_policy(self.change_policy);
        if let Some(price) = order.price {
            single.open(order.id, price, order.amount, order.side);
        }
        (self, Some(single))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_delta(id: &str, price: f64, size: f64, side: Side) -> Delta {
        Delta::Open {
            id: id.to_string(),
            price: Price::from_float(price),
            size: Size::from_float(size),
            side,
        }
    }

    fn book_with(deltas: Vec<Delta>) -> OrderBook {
        let mut book = OrderBook::new();
        for delta in deltas {
            book.update(delta).unwrap();
        }
        book
    }

    #[test]
    fn test_new_book_empty() {
        let book = OrderBook::new();
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread().unwrap(), None);
        assert_eq!(book.last_update(), None);
    }

    #[test]
    fn test_open_orders_both_sides() {
        let book = book_with(vec![
            open_delta("b1", 99.0, 1.5, Side::Buy),
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 101.0, 2.0, Side::Sell),
        ]);

        assert_eq!(book.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(book.best_ask(), Some(Price::from_float(100.0)));
        assert_eq!(book.spread().unwrap(), Some(Price::from_float(1.0)));
        assert_eq!(book.ask_levels(), 2);
        assert_eq!(book.bid_levels(), 1);
        assert_eq!(book.order_count(), 3);
    }

    #[test]
    fn test_invariants_after_delta_stream() {
        let book = book_with(vec![
            open_delta("b1", 98.0, 1.0, Side::Buy),
            open_delta("b2", 99.0, 2.0, Side::Buy),
            open_delta("b3", 99.0, 0.5, Side::Buy),
            open_delta("a1", 101.0, 1.0, Side::Sell),
            open_delta("a2", 100.5, 3.0, Side::Sell),
            Delta::Done {
                id: "b1".to_string(),
            },
            Delta::Change {
                id: "b2".to_string(),
                new_size: Size::from_float(1.5),
            },
        ]);

        // I1: level queues and id index agree.
        let queued: usize = book.bid_levels() + book.ask_levels();
        assert!(queued > 0);
        assert_eq!(book.orders().count(), book.order_count());

        // I2: no empty level survives (b1 was alone at 98).
        assert_eq!(book.bid_levels(), 1);

        // I3: best prices are extremes and the book is not crossed.
        assert_eq!(book.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(book.best_ask(), Some(Price::from_float(100.5)));
        assert!(book.spread().unwrap().is_some());

        // I4: b3 kept its place until b2 was re-appended behind it.
        let ids: Vec<&str> = book
            .orders()
            .filter(|o| o.side == Side::Buy)
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b3", "b2"]);
    }

    #[test]
    fn test_done_unknown_id_is_noop() {
        let book = book_with(vec![open_delta("a1", 100.0, 1.0, Side::Sell)]);
        let before = book.order_count();

        let mut same = book.clone();
        same.update(Delta::Done {
            id: "missing".to_string(),
        })
        .unwrap();

        assert_eq!(same.order_count(), before);
        assert_eq!(same.best_ask(), book.best_ask());
    }

    #[test]
    fn test_done_then_done_again() {
        // Open an ask, remove it, spread collapses, repeat removal is a no-op.
        let mut book = book_with(vec![open_delta("a1", 100.0, 1.0, Side::Sell)]);

        book.update(Delta::Done {
            id: "a1".to_string(),
        })
        .unwrap();
        assert_eq!(book.spread().unwrap(), None);
        assert!(book.is_empty());

        book.update(Delta::Done {
            id: "a1".to_string(),
        })
        .unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_change_unknown_id_is_error() {
        let mut book = OrderBook::new();
        let result = book.change("ghost", Size::from_float(1.0));
        assert_eq!(result, Err(BookError::UnknownOrder("ghost".to_string())));
    }

    #[test]
    fn test_change_reinserts_at_tail() {
        let mut book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 100.0, 1.0, Side::Sell),
        ]);

        // Shrinking a1 still moves it behind a2 under the default policy.
        book.change("a1", Size::from_float(0.5)).unwrap();
        let ids: Vec<&str> = book.orders().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_change_preserve_on_decrease() {
        let mut book = OrderBook::with_change_policy(ChangePolicy::PreserveOnDecrease);
        book.open("a1", Price::from_float(100.0), Size::from_float(1.0), Side::Sell);
        book.open("a2", Price::from_float(100.0), Size::from_float(1.0), Side::Sell);

        // Decrease keeps position...
        book.change("a1", Size::from_float(0.5)).unwrap();
        let ids: Vec<&str> = book.orders().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);

        // ...growth loses it.
        book.change("a1", Size::from_float(2.0)).unwrap();
        let ids: Vec<&str> = book.orders().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_change_then_fill() {
        // Resize an ask upward, then a 2.0 buy consumes it in one fill.
        let mut book = book_with(vec![open_delta("a1", 100.0, 1.0, Side::Sell)]);
        book.update(Delta::Change {
            id: "a1".to_string(),
            new_size: Size::from_float(2.0),
        })
        .unwrap();

        let fills = book.fill(Side::Buy, Size::from_float(2.0), None).unwrap();
        assert_eq!(
            fills.as_slice(),
            &[(Price::from_float(100.0), Size::from_float(2.0))]
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_market_fill_walks_levels() {
        // Asks (100, 1.0) and (101, 2.0), bid (99, 1.5); buy 2.5 market.
        let mut book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 101.0, 2.0, Side::Sell),
            open_delta("b1", 99.0, 1.5, Side::Buy),
        ]);

        let fills = book.fill(Side::Buy, Size::from_float(2.5), None).unwrap();

        assert_eq!(
            fills.as_slice(),
            &[
                (Price::from_float(100.0), Size::from_float(1.0)),
                (Price::from_float(101.0), Size::from_float(1.5)),
            ]
        );
        // Remaining ask at 101 has size 0.5; the bid is untouched.
        let a2 = book.order("a2").unwrap();
        assert_eq!(a2.amount, Size::from_float(0.5));
        assert_eq!(book.best_bid(), Some(Price::from_float(99.0)));
    }

    #[test]
    fn test_fill_conservation_on_exhausted_side() {
        let mut book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 101.0, 0.5, Side::Sell),
        ]);

        let want = Size::from_float(5.0);
        let fills = book.fill(Side::Buy, want, None).unwrap();
        let matched: Size = fills.iter().map(|(_, s)| *s).sum();

        // Matched total never exceeds the request; the shortfall equals
        // whatever the opposite side could not supply.
        assert_eq!(matched, Size::from_float(1.5));
        assert!(matched <= want);
        assert_eq!(book.ask_levels(), 0);
    }

    #[test]
    fn test_fill_price_monotonicity() {
        let mut book = book_with(vec![
            open_delta("a1", 102.0, 1.0, Side::Sell),
            open_delta("a2", 100.0, 1.0, Side::Sell),
            open_delta("a3", 101.0, 1.0, Side::Sell),
            open_delta("b1", 99.0, 1.0, Side::Buy),
            open_delta("b2", 97.0, 1.0, Side::Buy),
            open_delta("b3", 98.0, 1.0, Side::Buy),
        ]);

        let buys = book.fill(Side::Buy, Size::from_float(3.0), None).unwrap();
        assert!(buys.windows(2).all(|w| w[0].0 <= w[1].0));

        let sells = book.fill(Side::Sell, Size::from_float(3.0), None).unwrap();
        assert!(sells.windows(2).all(|w| w[0].0 >= w[1].0));
    }

    #[test]
    fn test_fill_respects_limit() {
        let mut book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 105.0, 1.0, Side::Sell),
        ]);

        let fills = book
            .fill(Side::Buy, Size::from_float(2.0), Some(Price::from_float(102.0)))
            .unwrap();

        assert_eq!(
            fills.as_slice(),
            &[(Price::from_float(100.0), Size::from_float(1.0))]
        );
        assert_eq!(book.best_ask(), Some(Price::from_float(105.0)));
    }

    #[test]
    fn test_fill_limit_below_book_matches_nothing() {
        let mut book = book_with(vec![open_delta("a1", 100.0, 1.0, Side::Sell)]);
        let fills = book
            .fill(Side::Buy, Size::from_float(1.0), Some(Price::from_float(99.0)))
            .unwrap();
        assert!(fills.is_empty());
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 100.0, 1.0, Side::Sell),
        ]);

        book.fill(Side::Buy, Size::from_float(1.0), None).unwrap();

        // a1 arrived first, so a1 goes first.
        assert!(book.order("a1").is_none());
        assert!(book.order("a2").is_some());
    }

    #[test]
    fn test_spread_detects_crossed_book() {
        let book = book_with(vec![
            open_delta("b1", 101.0, 1.0, Side::Buy),
            open_delta("a1", 100.0, 1.0, Side::Sell),
        ]);

        assert!(matches!(
            book.spread(),
            Err(BookError::CrossedBook { .. })
        ));
    }

    #[test]
    fn test_last_update_recorded() {
        let mut book = OrderBook::new();
        let delta = open_delta("a1", 100.0, 1.0, Side::Sell);
        book.update(delta.clone()).unwrap();
        assert_eq!(book.last_update(), Some(&delta));
    }

    #[test]
    fn test_fold_replays_overlay() {
        let base = book_with(vec![open_delta("a1", 100.0, 1.0, Side::Sell)]);
        let overlay = book_with(vec![
            open_delta("a2", 101.0, 2.0, Side::Sell),
            open_delta("b1", 99.0, 1.0, Side::Buy),
        ]);

        let merged = base.fold(&overlay);
        assert_eq!(merged.order_count(), 3);
        assert_eq!(merged.best_ask(), Some(Price::from_float(100.0)));
        assert_eq!(merged.best_bid(), Some(Price::from_float(99.0)));
    }

    #[test]
    fn test_unfold_pops_until_one_left() {
        let book = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 101.0, 2.0, Side::Sell),
            open_delta("b1", 99.0, 1.5, Side::Buy),
        ]);

        let mut rest = book;
        let mut chunks = Vec::new();
        loop {
            let (next, chunk) = rest.unfold();
            rest = next;
            match chunk {
                Some(single) => {
                    assert_eq!(single.order_count(), 1);
                    chunks.push(single);
                }
                None => break,
            }
        }

        assert_eq!(chunks.len(), 2);
        assert_eq!(rest.order_count(), 1);
    }

    #[test]
    fn test_fold_unfold_round_trip() {
        let original = book_with(vec![
            open_delta("a1", 100.0, 1.0, Side::Sell),
            open_delta("a2", 101.0, 2.0, Side::Sell),
            open_delta("b1", 99.0, 1.5, Side::Buy),
        ]);

        // Stream the book out in singleton chunks, then fold them back.
        let mut rest = original.clone();
        let mut rebuilt = OrderBook::new();
        loop {
            let (next, chunk) = rest.unfold();
            rest = next;
            match chunk {
                Some(single) => rebuilt = rebuilt.fold(&single),
                None => break,
            }
        }
        rebuilt = rebuilt.fold(&rest);

        assert_eq!(rebuilt.order_count(), original.order_count());
        assert_eq!(rebuilt.best_bid(), original.best_bid());
        assert_eq!(rebuilt.best_ask(), original.best_ask());
    }
}
