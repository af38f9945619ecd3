//! Series: time-series aggregation and synthetic price generation.
//!
//! The scan folds any stream of timestamped inputs into aligned,
//! fixed-interval candles or bars; the tap generates a reproducible
//! synthetic price walk for backtests without recorded data.

mod scan;
mod tap;

pub use scan::{scan, scan_vec, Bucket, Scan, ScanInput, ScanOptions, ScanOutput};
pub use tap::{PriceTap, TapConfig};
