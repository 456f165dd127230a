// Demo market data - used whenever no provider key is configured
use crate::application::market_provider::{MarketDataProvider, ProviderResult};
use crate::domain::market::{Quote, SeriesPoint};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use std::time::Duration;

const BASE_PRICE: f64 = 150.0;
const SERIES_DAYS: u64 = 120;

/// Prices hover around a per-symbol level that drifts slowly with wall-clock
/// time, plus a little noise.
#[derive(Debug, Clone)]
pub struct MockMarketProvider {
    latency: Duration,
}

impl MockMarketProvider {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn symbol_phase(symbol: &str) -> f64 {
    symbol.bytes().map(f64::from).sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn current_price<R: Rng>(symbol: &str, rng: &mut R) -> f64 {
    let phase = Utc::now().timestamp_millis() as f64 / 10_000.0 + symbol_phase(symbol);
    let variation = phase.sin() * 0.1 + rng.gen_range(-0.025..0.025);
    BASE_PRICE + BASE_PRICE * variation
}

fn series<R: Rng>(symbol: &str, today: NaiveDate, rng: &mut R) -> Vec<SeriesPoint> {
    let base = current_price(symbol, rng);
    (0..=SERIES_DAYS)
        .rev()
        .filter_map(|days_back| {
            let date = today.checked_sub_days(Days::new(days_back))?;
            let daily = rng.gen_range(-0.05..0.05);
            let close = base + base * daily * (days_back as f64 / SERIES_DAYS as f64);
            let volume = rng.gen_range(500_000..1_500_000);
            Some(SeriesPoint::new(date, round2(close), Some(volume)))
        })
        .collect()
}

fn quote<R: Rng>(symbol: &str, rng: &mut R) -> Quote {
    let price = current_price(symbol, rng);
    let previous_close = price * (1.0 + rng.gen_range(-0.05..0.05));
    let change = price - previous_close;

    Quote {
        symbol: symbol.to_string(),
        price: round2(price),
        change: round2(change),
        change_percent: round2(change / previous_close * 100.0),
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketProvider {
    async fn fetch_series(&self, symbol: &str) -> ProviderResult<Vec<SeriesPoint>> {
        self.simulate_latency().await;
        Ok(series(symbol, Utc::now().date_naive(), &mut rand::thread_rng()))
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        self.simulate_latency().await;
        Ok(quote(symbol, &mut rand::thread_rng()))
    }
}
