//! Shared fixtures for the behaviour suites: scripted transport, manual clock,
//! in-memory persistence and canned service payloads.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tickerwatch_core::{
    CacheConfig, ClientConfig, FinanceStore, HttpQuoteService, KeyValueStore, ManualClock,
    MemoryKeyValueStore, QuoteService, StubHttpClient,
};

/// 2023-11-14T22:13:20Z
pub const T0: i64 = 1_700_000_000_000;
pub const BASE_URL: &str = "https://quotes.example.test/api";

pub const SNAPSHOT_TTL: Duration = Duration::from_secs(600);
pub const HISTORY_TTL: Duration = Duration::from_secs(3_600);

pub fn snapshot_json(symbol: &str, price: f64) -> String {
    format!(
        r#"{{"company":{{"symbol":"{symbol}","name":"{symbol} Corp","sector":"Technology"}},"market":{{"currentPrice":{price},"previousClose":100.0,"marketCap":1000000.0}},"performance":{{"trailingPE":25.5}},"analyst":{{"recommendation":"buy"}},"metadata":{{"marketState":"REGULAR"}}}}"#
    )
}

pub fn history_json(symbol: &str, closes: &[f64]) -> String {
    let points = closes
        .iter()
        .enumerate()
        .map(|(day, close)| {
            format!(
                r#"{{"timestamp":"2025-11-{:02}T00:00:00Z","open":{close},"high":{close},"low":{close},"close":{close},"volume":1000}}"#,
                day + 1
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"{symbol}":{{"data":[{points}],"cachedAt":1700000000}}}}"#)
}

pub fn ticker_route(symbol: &str) -> String {
    format!("/ticker?id={symbol}")
}

pub fn tickers_route(csv: &str) -> String {
    format!("/tickers?symbols={csv}")
}

pub fn history_route(symbol: &str, range: &str) -> String {
    format!("/history?id={symbol}&range={range}")
}

pub fn quote_service(http: Arc<StubHttpClient>) -> Arc<dyn QuoteService> {
    let config = ClientConfig::new(BASE_URL).expect("valid base url");
    Arc::new(HttpQuoteService::new(config, http))
}

/// A hydrated finance store wired to a scripted transport and a manual clock.
pub struct Harness {
    pub http: Arc<StubHttpClient>,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<dyn KeyValueStore>,
    pub finance: FinanceStore,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_http(StubHttpClient::new()).await
    }

    pub async fn with_http(http: StubHttpClient) -> Self {
        Self::build(Arc::new(http), Arc::new(MemoryKeyValueStore::new()), T0).await
    }

    pub async fn with_backend(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::build(Arc::new(StubHttpClient::new()), backend, T0).await
    }

    pub async fn build(
        http: Arc<StubHttpClient>,
        backend: Arc<dyn KeyValueStore>,
        start_ms: i64,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(start_ms));
        let finance = FinanceStore::open(
            quote_service(Arc::clone(&http)),
            clock.clone(),
            CacheConfig::default(),
            Arc::clone(&backend),
        );
        finance.wait_ready().await;

        Self {
            http,
            clock,
            backend,
            finance,
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.finance
            .tickers()
            .symbols()
            .into_iter()
            .map(String::from)
            .collect()
    }
}
