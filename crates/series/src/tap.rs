//! Deterministic synthetic price walk.
//!
//! Emits `(instant, price)` samples over a time range, aligned to a step.
//! Each run is seeded, so a backtest over a tap is exactly reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use types::{floor_to, DurationMicros, Instant, Price, PricePoint, TimeRange, MICROS_PER_DAY};

/// Parameters of the walk.
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Starting price, emitted unchanged as the first sample.
    pub initial_price: f64,
    /// Drift per day; each step applies `drift * step_fraction`.
    pub drift: f64,
    /// Noise amplitude per step; each step applies `volatility * eps`
    /// for `eps` uniform in `[-1, 1]`.
    pub volatility: f64,
    /// RNG seed for reproducible runs.
    pub seed: u64,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            drift: 0.01,
            volatility: 0.002,
            seed: 42,
        }
    }
}

impl TapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_price(mut self, price: f64) -> Self {
        self.initial_price = price;
        self
    }

    pub fn drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Pseudo-random price walk over a range, aligned to `step`.
///
/// Emits exactly `⌊(range.end − floor(range.start, step)) / step⌋` samples
/// at instants `floor(range.start, step) + k·step`.
#[derive(Debug)]
pub struct PriceTap {
    rng: StdRng,
    price: f64,
    next_instant: Instant,
    step: DurationMicros,
    step_fraction: f64,
    remaining: u64,
    started: bool,
    drift: f64,
    volatility: f64,
}

impl PriceTap {
    pub fn new(range: TimeRange, step: DurationMicros, config: TapConfig) -> Self {
        debug_assert!(step > 0, "tap step must be positive");
        let aligned_start = floor_to(range.start, step);
        let remaining = if range.end > aligned_start {
            ((range.end - aligned_start) / step) as u64
        } else {
            0
        };

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            price: config.initial_price,
            next_instant: aligned_start,
            step,
            step_fraction: step as f64 / MICROS_PER_DAY as f64,
            remaining,
            started: false,
            drift: config.drift,
            volatility: config.volatility,
        }
    }

    /// Number of samples left to emit.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for PriceTap {
    type Item = PricePoint;

    fn next(&mut self) -> Option<PricePoint> {
        if self.remaining == 0 {
            return None;
        }

        if self.started {
            let eps: f64 = self.rng.gen_range(-1.0..=1.0);
            self.price *= 1.0 + self.drift * self.step_fraction + self.volatility * eps;
        }
        self.started = true;

        let point = PricePoint::new(self.next_instant, Price::from_float(self.price));
        self.next_instant += self.step;
        self.remaining -= 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}
