//! In-memory index of market-data sets.
//!
//! Backtests register their data sets here; the session expands patterns
//! against the index and streams merged, range-bounded items from it.

use std::collections::HashMap;

use types::{Candle, Delta, Instant, Price, PricePoint, TradeTick};

use crate::error::{MarketError, Result};
use crate::path::{DataPath, DataSelection, PathPattern};

// =============================================================================
// Items
// =============================================================================

/// Payload of one timestamped market-data record.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketPayload {
    Trade(TradeTick),
    Point(PricePoint),
    Candle(Candle),
    Delta(Delta),
}

impl MarketPayload {
    /// A representative price, when the payload carries one.
    pub fn price(&self) -> Option<Price> {
        match self {
            MarketPayload::Trade(t) => Some(t.price),
            MarketPayload::Point(p) => Some(p.price),
            MarketPayload::Candle(c) => Some(c.close),
            MarketPayload::Delta(_) => None,
        }
    }
}

/// One record from one data set, tagged with its path and instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketItem {
    pub path: DataPath,
    pub instant: Instant,
    pub payload: MarketPayload,
}

impl MarketItem {
    pub fn new(path: DataPath, instant: Instant, payload: MarketPayload) -> Self {
        Self {
            path,
            instant,
            payload,
        }
    }
}

// =============================================================================
// Index
// =============================================================================

/// In-memory registry of data sets keyed by path.
#[derive(Debug, Default)]
pub struct DataIndex {
    sets: HashMap<DataPath, Vec<MarketItem>>,
}

impl DataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty data set (or leave an existing one untouched).
    pub fn register(&mut self, path: DataPath) {
        self.sets.entry(path).or_default();
    }

    /// Append an item to its path's data set, registering it if needed.
    ///
    /// Items are expected in non-decreasing instant order per path; the
    /// merge in `select` relies on it.
    pub fn push(&mut self, item: MarketItem) {
        self.sets.entry(item.path.clone()).or_default().push(item);
    }

    /// Append a whole batch for one path.
    pub fn extend(&mut self, path: &DataPath, items: impl IntoIterator<Item = MarketItem>) {
        self.sets.entry(path.clone()).or_default().extend(items);
    }

    /// All registered paths, in rendered-string order.
    pub fn paths(&self) -> Vec<DataPath> {
        let mut paths: Vec<DataPath> = self.sets.keys().cloned().collect();
        paths.sort_by_key(|p| p.to_string());
        paths
    }

    /// Expand a pattern against the registered paths.
    pub fn expand(&self, pattern: &PathPattern) -> Vec<DataPath> {
        self.paths()
            .into_iter()
            .filter(|p| pattern.matches(p))
            .collect()
    }

    /// Stream a selection: expand the pattern, bound each matched set to
    /// `[from, to)`, and merge by instant (ties keep path order).
    pub fn select(&self, selection: &DataSelection) -> Result<Vec<MarketItem>> {
        let matched = self.expand(&selection.path);
        if matched.is_empty() {
            return Err(MarketError::DataNotFound(selection.path.to_string()));
        }

        let from = selection.from_micros();
        let to = selection.to_micros();

        let mut items: Vec<MarketItem> = matched
            .iter()
            .filter_map(|path| self.sets.get(path))
            .flat_map(|set| {
                set.iter()
                    .filter(|item| from <= item.instant && item.instant < to)
                    .cloned()
            })
            .collect();

        // Stable sort: equal instants stay in expanded-path order.
        items.sort_by_key(|item| item.instant);
        Ok(items)
    }
}
