use crate::{
    model::{Ticker, round2},
    seed::{SeedMode, seeded_random},
};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Static spot prices used when no live quote is available.
///
/// Tickers missing from the table get a seeded price in `[100, 500)`, so repeated requests
/// for the same unknown ticker agree with each other.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct FallbackPrices {
    prices: FnvHashMap<Ticker, f64>,
    mode: SeedMode,
}

impl FallbackPrices {
    pub fn new<Iter>(prices: Iter, mode: SeedMode) -> Self
    where
        Iter: IntoIterator<Item = (Ticker, f64)>,
    {
        Self {
            prices: prices
                .into_iter()
                .filter(|(_, price)| price.is_finite() && *price > 0.0)
                .collect(),
            mode,
        }
    }

    pub fn with_seed_mode(mut self, mode: SeedMode) -> Self {
        self.mode = mode;
        self
    }

    /// Listed price, if any.
    pub fn listed(&self, ticker: &Ticker) -> Option<f64> {
        self.prices.get(ticker).copied()
    }

    /// Listed price, or the seeded price for unknown tickers.
    pub fn price(&self, ticker: &Ticker) -> f64 {
        self.listed(ticker)
            .unwrap_or_else(|| round2(100.0 + seeded_random(&format!("{ticker}-price"), self.mode) * 400.0))
    }

    pub fn insert(&mut self, ticker: Ticker, price: f64) -> Option<f64> {
        if price.is_finite() && price > 0.0 {
            self.prices.insert(ticker, price)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for FallbackPrices {
    fn default() -> Self {
        const DEFAULT_PRICES: [(&str, f64); 16] = [
            ("SPY", 604.50),
            ("QQQ", 535.20),
            ("IWM", 228.50),
            ("DIA", 442.00),
            ("GLD", 268.00),
            ("SLV", 29.50),
            ("TLT", 86.50),
            ("HYG", 78.20),
            ("AAPL", 232.80),
            ("MSFT", 412.60),
            ("NVDA", 131.50),
            ("AMZN", 228.30),
            ("META", 705.40),
            ("TSLA", 340.00),
            ("GOOGL", 188.20),
            ("AMD", 118.75),
        ];

        Self::new(
            DEFAULT_PRICES
                .into_iter()
                .filter_map(|(ticker, price)| Ticker::new(ticker).ok().map(|t| (t, price))),
            SeedMode::default(),
        )
    }
}
