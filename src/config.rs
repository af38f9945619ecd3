//! Central configuration for the demo backtest.
//!
//! All run parameters are defined here for easy tuning.

use types::{DurationMicros, MICROS_PER_MINUTE};

/// Master configuration for a demo backtest run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Data
    // ─────────────────────────────────────────────────────────────────────────
    /// Instrument traded.
    pub instrument: String,
    /// Days of synthetic data to generate.
    pub days: i64,
    /// Tap sample step.
    pub step: DurationMicros,
    /// Starting price of the walk.
    pub initial_price: f64,
    /// Drift per day.
    pub drift: f64,
    /// Per-step noise amplitude.
    pub volatility: f64,
    /// RNG seed (same seed, same run).
    pub seed: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Synthetic Quotes
    // ─────────────────────────────────────────────────────────────────────────
    /// Half-spread around each sample, in quote units.
    pub half_spread: f64,
    /// Size quoted on each side.
    pub quote_size: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange
    // ─────────────────────────────────────────────────────────────────────────
    pub maker_fee: f64,
    pub taker_fee: f64,
    /// Starting quote balance.
    pub starting_quote: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Strategy
    // ─────────────────────────────────────────────────────────────────────────
    /// Moving-average window (in mid-price observations).
    pub sma_window: usize,
    /// Clip size per order.
    pub clip: f64,
    /// Absolute position cap.
    pub max_position: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instrument: "btc_usd".to_string(),
            days: 7,
            step: 5 * MICROS_PER_MINUTE,
            initial_price: 30_000.0,
            drift: 0.01,
            volatility: 0.003,
            seed: 42,
            half_spread: 5.0,
            quote_size: 10.0,
            maker_fee: 0.001,
            taker_fee: 0.002,
            starting_quote: 1_000_000.0,
            sma_window: 48,
            clip: 0.25,
            max_position: 2.0,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder-style setters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn days(mut self, days: i64) -> Self {
        self.days = days;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn clip(mut self, clip: f64) -> Self {
        self.clip = clip;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Presets
    // ─────────────────────────────────────────────────────────────────────────

    /// Quick run: two days of data.
    pub fn demo() -> Self {
        Self::default().days(2)
    }

    /// A month of data for longer-horizon behaviour.
    pub fn long_run() -> Self {
        Self::default().days(30)
    }

    /// Noisier walk; trades more often.
    pub fn volatile() -> Self {
        Self::default().volatility(0.01).clip(0.5)
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "demo" => Some(Self::demo()),
            "long" => Some(Self::long_run()),
            "volatile" => Some(Self::volatile()),
            _ => None,
        }
    }
}
