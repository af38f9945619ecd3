//! Polymorphic fold of timestamped inputs into aligned buckets.
//!
//! The scan bucketizes an input stream into intervals `[kd, (k+1)d)` and
//! emits one output per occupied bucket. Inputs contribute through
//! [`ScanInput`] (price points count volume per observation, candles and
//! bars merge their OHLCV); outputs are rebuilt through [`ScanOutput`].
//!
//! The iterator is pull-based: it carries the open bucket accumulator and
//! a one-item lookahead, so it is finite and non-restartable unless the
//! source is buffered.

use std::marker::PhantomData;

use types::{floor_to, Bar, Candle, DurationMicros, Instant, Price, PricePoint, Size, TradeTick};

// =============================================================================
// Bucket Accumulator
// =============================================================================

/// Running OHLCV aggregate for one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Size,
}

// =============================================================================
// Input / Output Capabilities
// =============================================================================

/// An input the scan can bucketize: exposes its instant, seeds a fresh
/// bucket, and merges into an existing one.
pub trait ScanInput {
    fn instant(&self) -> Instant;

    /// Open a bucket from this item.
    fn seed(&self) -> Bucket;

    /// Fold this item into an already-open bucket.
    fn merge(&self, bucket: &mut Bucket);
}

impl ScanInput for PricePoint {
    fn instant(&self) -> Instant {
        self.instant
    }

    fn seed(&self) -> Bucket {
        Bucket {
            open: self.price,
            high: self.price,
            low: self.price,
            close: self.price,
            // Bare prices carry no size; volume counts observations.
            volume: Size::ONE,
        }
    }

    fn merge(&self, bucket: &mut Bucket) {
        bucket.high = bucket.high.max(self.price);
        bucket.low = bucket.low.min(self.price);
        bucket.close = self.price;
        bucket.volume += Size::ONE;
    }
}

impl ScanInput for TradeTick {
    fn instant(&self) -> Instant {
        self.instant
    }

    fn seed(&self) -> Bucket {
        Bucket {
            open: self.price,
            high: self.price,
            low: self.price,
            close: self.price,
            volume: self.size,
        }
    }

    fn merge(&self, bucket: &mut Bucket) {
        bucket.high = bucket.high.max(self.price);
        bucket.low = bucket.low.min(self.price);
        bucket.close = self.price;
        bucket.volume += self.size;
    }
}

impl ScanInput for Candle {
    fn instant(&self) -> Instant {
        self.instant
    }

    fn seed(&self) -> Bucket {
        Bucket {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }

    fn merge(&self, bucket: &mut Bucket) {
        bucket.high = bucket.high.max(self.high);
        bucket.low = bucket.low.min(self.low);
        bucket.close = self.close;
        bucket.volume += self.volume;
    }
}

impl ScanInput for Bar {
    fn instant(&self) -> Instant {
        self.candle.instant
    }

    // Bar end times are discarded; aggregation goes through the candle.
    fn seed(&self) -> Bucket {
        self.candle.seed()
    }

    fn merge(&self, bucket: &mut Bucket) {
        self.candle.merge(bucket)
    }
}

/// An output reconstructible from a closed bucket.
pub trait ScanOutput: Sized {
    fn from_bucket(bucket_start: Instant, step: DurationMicros, bucket: &Bucket) -> Self;
}

impl ScanOutput for Candle {
    fn from_bucket(bucket_start: Instant, _step: DurationMicros, bucket: &Bucket) -> Self {
        Candle {
            instant: bucket_start,
            open: bucket.open,
            high: bucket.high,
            low: bucket.low,
            close: bucket.close,
            volume: bucket.volume,
        }
    }
}

impl ScanOutput for Bar {
    fn from_bucket(bucket_start: Instant, step: DurationMicros, bucket: &Bucket) -> Self {
        Bar {
            candle: Candle::from_bucket(bucket_start, step, bucket),
            end: bucket_start + step,
        }
    }
}

// =============================================================================
// Scan Iterator
// =============================================================================

/// Options controlling edge buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Omit the very first bucket (guard against a partial first window).
    pub drop_first: bool,
    /// Omit the trailing bucket unless its first input landed exactly on
    /// the bucket start (interval-valued inputs such as candles do; loose
    /// ticks inside a still-open window do not).
    pub drop_last: bool,
}

/// State of the bucket currently being accumulated.
#[derive(Debug)]
struct OpenBucket {
    start: Instant,
    bucket: Bucket,
    aligned_start: bool,
}

/// Lazy scan from a stream of `T` to aligned outputs `U`.
#[derive(Debug)]
pub struct Scan<I, T, U> {
    source: I,
    step: DurationMicros,
    opts: ScanOptions,
    lookahead: Option<T>,
    current: Option<OpenBucket>,
    first_settled: bool,
    done: bool,
    _out: PhantomData<U>,
}

/// Scan `source` into `step`-aligned outputs.
pub fn scan<T, U, I>(source: I, step: DurationMicros, opts: ScanOptions) -> Scan<I::IntoIter, T, U>
where
    I: IntoIterator<Item = T>,
    T: ScanInput,
    U: ScanOutput,
{
    debug_assert!(step > 0, "scan step must be positive");
    Scan {
        source: source.into_iter(),
        step,
        opts,
        lookahead: None,
        current: None,
        first_settled: false,
        done: false,
        _out: PhantomData,
    }
}

/// Scan with default options, collected into a vector.
pub fn scan_vec<T, U, I>(source: I, step: DurationMicros) -> Vec<U>
where
    I: IntoIterator<Item = T>,
    T: ScanInput,
    U: ScanOutput,
{
    scan(source, step, ScanOptions::default()).collect()
}

impl<I, T, U> Iterator for Scan<I, T, U>
where
    I: Iterator<Item = T>,
    T: ScanInput,
    U: ScanOutput,
{
    type Item = U;

    fn next(&mut self) -> Option<U> {
        loop {
            if self.done {
                return None;
            }

            let item = self.lookahead.take().or_else(|| self.source.next());
            let Some(item) = item else {
                // Source exhausted: close the trailing bucket.
                self.done = true;
                let closed = self.current.take()?;
                if self.opts.drop_first && !self.first_settled {
                    return None;
                }
                if self.opts.drop_last && !closed.aligned_start {
                    return None;
                }
                return Some(U::from_bucket(closed.start, self.step, &closed.bucket));
            };

            let t = item.instant();
            match self.current.take() {
                None => {
                    let start = floor_to(t, self.step);
                    self.current = Some(OpenBucket {
                        start,
                        bucket: item.seed(),
                        aligned_start: t == start,
                    });
                }
                Some(mut open) if t < open.start + self.step => {
                    item.merge(&mut open.bucket);
                    self.current = Some(open);
                }
                Some(closed) => {
                    // The item belongs to a later bucket; it seeds the next
                    // one on the following pass.
                    self.lookahead = Some(item);
                    if self.opts.drop_first && !self.first_settled {
                        self.first_settled = true;
                        continue;
                    }
                    self.first_settled = true;
                    return Some(U::from_bucket(closed.start, self.step, &closed.bucket));
                }
            }
        }
    }
}
