// src/fetch/market.rs
//! Mock index quotes in the shape of an Alpha Vantage global quote.

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::{iso_now, SectionProvider, SectionRecord};
use crate::clock::SharedClock;

pub const SOURCE: &str = "Alpha Vantage API (mock)";

const SUMMARIES: &[&str] = &[
    "Markets showed mixed performance today as investors digest economic data.",
    "Stocks climbed higher on positive earnings reports and economic optimism.",
    "Markets pulled back amid concerns about inflation and interest rates.",
    "Tech stocks led gains as the broader market advanced.",
    "Major indexes ended mostly flat in cautious trading.",
];

pub struct MarketProvider {
    symbols: Vec<String>,
    seed: Option<u64>,
    api_key_present: bool,
    clock: SharedClock,
}

impl MarketProvider {
    pub fn new(symbols: Vec<String>, seed: Option<u64>, clock: SharedClock) -> Self {
        Self {
            symbols,
            seed,
            api_key_present: false,
            clock,
        }
    }

    pub fn with_api_key_present(mut self, present: bool) -> Self {
        self.api_key_present = present;
        self
    }
}

#[async_trait]
impl SectionProvider for MarketProvider {
    fn name(&self) -> &'static str {
        "market"
    }

    fn source_label(&self) -> &'static str {
        "Market API"
    }

    fn tool(&self) -> &'static str {
        "get_market_data"
    }

    async fn fetch(&self) -> Result<SectionRecord> {
        tracing::info!(indexes = ?self.symbols, "fetching market data");
        if self.api_key_present {
            tracing::warn!("finance api key set but no live client; serving mock data");
        }
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let indexes: Vec<Value> = self
            .symbols
            .iter()
            .map(|s| mock_index(s, &mut rng))
            .collect();
        let summary = SUMMARIES.choose(&mut rng).copied().unwrap_or(SUMMARIES[0]);
        Ok(SectionRecord::new(
            self.name(),
            json!({ "indexes": indexes, "market_summary": summary }),
            iso_now(self.clock.as_ref()),
            SOURCE,
        ))
    }
}

/// Display name and base level for an index symbol.
pub fn index_info(symbol: &str) -> (String, f64) {
    match symbol {
        "^GSPC" => ("S&P 500".into(), 4500.0),
        "^IXIC" => ("NASDAQ".into(), 14000.0),
        "^DJI" => ("DOW JONES".into(), 35000.0),
        other => (other.to_string(), 1000.0),
    }
}

fn mock_index(symbol: &str, rng: &mut StdRng) -> Value {
    let (name, base) = index_info(symbol);
    let value = base + rng.random_range(-50.0..50.0);
    let change: f64 = rng.random_range(-100.0..100.0);
    let change_percent = change / value * 100.0;
    json!({
        "name": name,
        "symbol": symbol,
        "value": round2(value),
        "change": round2(change),
        "change_percent": round2(change_percent),
        "is_positive": change > 0.0,
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
