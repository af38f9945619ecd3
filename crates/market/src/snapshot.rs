//! Book snapshot interchange records.
//!
//! A snapshot is a `seq`-ordered sequence of order records; replaying them
//! as opens rebuilds the book. Streaming a book out goes through
//! `OrderBook::unfold`, which bounds chunk size to one order.

use book::OrderBook;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use types::{Instrument, OrderId, Price, Side, Size};

use crate::error::{MarketError, Result};

/// One resting order in a book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOrder {
    pub product: Instrument,
    pub seq: u64,
    pub bid: bool,
    pub id: OrderId,
    pub price: Price,
    pub size: Size,
}

impl SnapshotOrder {
    pub fn side(&self) -> Side {
        if self.bid {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

/// Rebuild a book by replaying snapshot records in `seq` order.
///
/// A duplicate order id means the stream is corrupt; that is fatal to the
/// consuming session.
pub fn book_from_snapshot(records: &[SnapshotOrder]) -> Result<OrderBook> {
    let mut ordered: Vec<&SnapshotOrder> = records.iter().collect();
    ordered.sort_by_key(|r| r.seq);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut book = OrderBook::new();
    for record in ordered {
        if !seen.insert(record.id.as_str()) {
            return Err(MarketError::CorruptSnapshot(format!(
                "duplicate order id {} at seq {}",
                record.id, record.seq
            )));
        }
        book.open(record.id.clone(), record.price, record.size, record.side());
    }
    Ok(book)
}

/// Stream a book out as snapshot records, one chunk per order.
pub fn snapshot_from_book(book: &OrderBook, product: &Instrument) -> Vec<SnapshotOrder> {
    let mut records = Vec::with_capacity(book.order_count());
    let mut rest = book.clone();
    let mut seq = 0u64;

    let mut push = |chunk: &OrderBook, seq: &mut u64, records: &mut Vec<SnapshotOrder>| {
        for order in chunk.orders() {
            if let Some(price) = order.price {
                records.push(SnapshotOrder {
                    product: product.clone(),
                    seq: *seq,
                    bid: order.side == Side::Buy,
                    id: order.id.clone(),
                    price,
                    size: order.amount,
                });
                *seq += 1;
            }
        }
    };

    loop {
        let (next, chunk) = rest.unfold();
        rest = next;
        match chunk {
            Some(single) => push(&single, &mut seq, &mut records),
            None => break,
        }
    }
    push(&rest, &mut seq, &mut records);

    records
}
