//! tickfold demo binary.
//!
//! Generates a synthetic price walk, turns it into two-sided book deltas,
//! registers them in the in-memory data index, and runs a small
//! moving-average strategy through the deterministic backtest loop:
//!
//! ```text
//! price tap ──► quote deltas ──► data index ──► tick loop ──► strategy
//!                                                  ▲              │
//!                                                  └── fills ◄── simulated exchange
//! ```

mod config;

use std::collections::VecDeque;

use exchange::{
    Exchange, FeeSchedule, SimulatedExchange, SimulatedExchangeConfig,
};
use market::{DataIndex, DataPath, DataSelection, MarketItem, MarketPayload};
use series::{scan_vec, PriceTap, TapConfig};
use session::{Session, SessionContext, SessionError, Strategy};
use tracing::info;
use tracing_subscriber::EnvFilter;
use types::{
    Candle, Cash, Delta, Fill, OrderCommand, Price, PricePoint, Side, Size, TimeRange,
    MICROS_PER_DAY, MICROS_PER_MINUTE,
};

pub use config::AppConfig;

/// Turn a price walk into two-sided quote deltas: each sample replaces
/// the previous synthetic bid/ask pair around the new mid.
fn quote_stream(config: &AppConfig, points: &[PricePoint]) -> Vec<MarketItem> {
    let path: DataPath = format!("sim/{}/book", config.instrument)
        .parse()
        .expect("static path is well-formed");
    let mut items = Vec::with_capacity(points.len() * 4);

    for (k, point) in points.iter().enumerate() {
        let mid = point.price.to_float();
        if k > 0 {
            for id in [format!("b-{}", k - 1), format!("a-{}", k - 1)] {
                items.push(MarketItem::new(
                    path.clone(),
                    point.instant,
                    MarketPayload::Delta(Delta::Done { id }),
                ));
            }
        }
        items.push(MarketItem::new(
            path.clone(),
            point.instant,
            MarketPayload::Delta(Delta::Open {
                id: format!("b-{k}"),
                price: Price::from_float(mid - config.half_spread),
                size: Size::from_float(config.quote_size),
                side: Side::Buy,
            }),
        ));
        items.push(MarketItem::new(
            path.clone(),
            point.instant,
            MarketPayload::Delta(Delta::Open {
                id: format!("a-{k}"),
                price: Price::from_float(mid + config.half_spread),
                size: Size::from_float(config.quote_size),
                side: Side::Sell,
            }),
        ));
    }
    items
}

/// Moving-average crossover on quoted mids.
///
/// Buys a clip when the mid crosses above its moving average, sells one
/// when it crosses below, within a symmetric position cap.
struct SmaCrossover {
    instrument: String,
    window: usize,
    mids: VecDeque<f64>,
    clip: Size,
    max_position: Size,
    position: Size,
    short: Size,
    fills: u64,
    fees_paid: Cash,
}

impl SmaCrossover {
    fn new(config: &AppConfig) -> Self {
        Self {
            instrument: config.instrument.clone(),
            window: config.sma_window,
            mids: VecDeque::with_capacity(config.sma_window + 1),
            clip: Size::from_float(config.clip),
            max_position: Size::from_float(config.max_position),
            position: Size::ZERO,
            short: Size::ZERO,
            fills: 0,
            fees_paid: Cash::ZERO,
        }
    }

    fn observe(&mut self, mid: f64) -> Option<f64> {
        self.mids.push_back(mid);
        if self.mids.len() > self.window {
            self.mids.pop_front();
        }
        if self.mids.len() < self.window {
            return None;
        }
        Some(self.mids.iter().sum::<f64>() / self.mids.len() as f64)
    }
}

impl Strategy for SmaCrossover {
    fn on_data(
        &mut self,
        ctx: &mut SessionContext<'_>,
        item: &MarketItem,
    ) -> Result<(), SessionError> {
        // One observation per sample: trigger on the ask-side quote only.
        let MarketPayload::Delta(Delta::Open { price, side, .. }) = &item.payload else {
            return Ok(());
        };
        if *side != Side::Sell {
            return Ok(());
        }

        let mid = price.to_float();
        let Some(sma) = self.observe(mid) else {
            return Ok(());
        };

        if mid > sma && self.position < self.max_position {
            ctx.submit(OrderCommand::market(
                Side::Buy,
                self.instrument.as_str(),
                self.clip,
            ));
        } else if mid < sma && self.short < self.max_position {
            ctx.submit(OrderCommand::market(
                Side::Sell,
                self.instrument.as_str(),
                self.clip,
            ));
        }
        Ok(())
    }

    fn on_fill(&mut self, _ctx: &mut SessionContext<'_>, fill: &Fill) -> Result<(), SessionError> {
        self.fills += 1;
        self.fees_paid += fill.fee;
        match fill.side {
            Side::Buy => {
                self.position += fill.size;
                self.short = self.short.saturating_sub(fill.size);
            }
            Side::Sell => {
                self.short += fill.size;
                self.position = self.position.saturating_sub(fill.size);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sma-crossover"
    }
}

fn run(config: AppConfig) -> Result<(), SessionError> {
    let range = TimeRange::new(0, config.days * MICROS_PER_DAY);
    let tap_config = TapConfig::new()
        .initial_price(config.initial_price)
        .drift(config.drift)
        .volatility(config.volatility)
        .seed(config.seed);
    let points: Vec<PricePoint> = PriceTap::new(range, config.step, tap_config).collect();

    // Downsample once for the log line; the strategy works off raw quotes.
    let candles: Vec<Candle> = scan_vec(points.clone(), 30 * MICROS_PER_MINUTE);
    info!(
        samples = points.len(),
        candles = candles.len(),
        first_close = candles.first().map(|c| c.close.to_float()),
        last_close = candles.last().map(|c| c.close.to_float()),
        "generated synthetic walk"
    );

    // Register the quote stream and pull it back through a selection, the
    // same path a recorded data set would take.
    let mut index = DataIndex::new();
    for item in quote_stream(&config, &points) {
        index.push(item);
    }
    let selection = DataSelection::new(format!("sim/{}/*", config.instrument).parse()?);
    let items = index.select(&selection)?;

    let sim_config = SimulatedExchangeConfig::new(config.instrument.clone())
        .fees(FeeSchedule::new(config.maker_fee, config.taker_fee))
        .starting_quote(config.starting_quote);
    let mut exchange = SimulatedExchange::new(sim_config);
    let portfolio_before = exchange.fetch_portfolio().wait().unwrap_or_default();

    let strategy = SmaCrossover::new(&config);
    let mut session = Session::backtest(strategy, Box::new(exchange), items);
    let stats = session.run()?;

    let strategy = session.strategy();
    info!(
        items = stats.items_dispatched,
        orders = stats.orders_submitted,
        fills = stats.fills,
        errors = stats.errors,
        fees_paid = strategy.fees_paid.to_float(),
        net_position = strategy.position.to_float() - strategy.short.to_float(),
        starting_quote = portfolio_before
            .balances
            .get("usd")
            .copied()
            .unwrap_or(Cash::ZERO)
            .to_float(),
        "backtest finished"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().expect("static directive parses")),
        )
        .init();

    let preset = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());
    let config = match AppConfig::preset(&preset) {
        Some(config) => config,
        None => {
            eprintln!("unknown preset '{preset}' (expected: demo, long, volatile)");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config) {
        eprintln!("backtest failed: {err}");
        std::process::exit(1);
    }
}
