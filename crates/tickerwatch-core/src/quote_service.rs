//! Remote quote service contract and its HTTP implementation.
//!
//! # Endpoints
//!
//! | Operation | Request | Success payload |
//! |-----------|---------|-----------------|
//! | [`ticker`](QuoteService::ticker) | `GET /ticker?id=SYM` | snapshot, or `{SYM: snapshot}` |
//! | [`tickers`](QuoteService::tickers) | `GET /tickers?symbols=A,B` | `{A: snapshot, B: {error}}` |
//! | [`history`](QuoteService::history) | `GET /history?id=SYM&range=1M` | `{SYM: {data: [...], cachedAt}}` |
//!
//! Error envelopes are `{error}` or `{message}` with a non-2xx status.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickerwatch_core::{ClientConfig, HttpQuoteService, QuoteService, ReqwestHttpClient, Symbol};
//!
//! async fn print_price() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpQuoteService::new(ClientConfig::from_env()?, Arc::new(ReqwestHttpClient::new()));
//!     let snapshot = service.ticker(&Symbol::parse("AAPL")?).await?;
//!     println!("{:?}", snapshot.market.display_price());
//!     Ok(())
//! }
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::{FetchError, HistoryRange, HistorySeries, Symbol, TickerSnapshot};

/// Outcome for one symbol of a batch response.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    Snapshot(TickerSnapshot),
    /// The service flagged this symbol with an `{error}` marker.
    Error(String),
    /// The value matched neither a snapshot nor an error marker.
    Malformed(String),
}

/// Parsed `/tickers` response keyed by normalized symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerBatch {
    pub entries: HashMap<Symbol, BatchEntry>,
}

impl TickerBatch {
    pub fn get(&self, symbol: &Symbol) -> Option<&BatchEntry> {
        self.entries.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Quote service contract consumed by the cache managers.
///
/// Implementations must be `Send + Sync`; fetches run on spawned tasks.
pub trait QuoteService: Send + Sync {
    /// Fetches the snapshot of a single symbol.
    fn ticker<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<TickerSnapshot, FetchError>> + Send + 'a>>;

    /// Fetches snapshots for several symbols in one request.
    ///
    /// Per-symbol failures are reported inside the batch; only a failure of
    /// the whole request is an `Err`.
    fn tickers<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> Pin<Box<dyn Future<Output = Result<TickerBatch, FetchError>> + Send + 'a>>;

    /// Fetches the price series of one `(symbol, range)` pair.
    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        range: &'a HistoryRange,
    ) -> Pin<Box<dyn Future<Output = Result<HistorySeries, FetchError>> + Send + 'a>>;
}

/// [`QuoteService`] over HTTP+JSON.
#[derive(Clone)]
pub struct HttpQuoteService {
    config: ClientConfig,
    http_client: Arc<dyn HttpClient>,
}

impl HttpQuoteService {
    pub fn new(config: ClientConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get(&self, url: String) -> Result<HttpResponse, FetchError> {
        debug!("GET {url}");
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_header("user-agent", self.config.user_agent.as_str())
            .with_timeout_ms(self.config.timeout_ms);

        self.http_client
            .execute(request)
            .await
            .map_err(|error| FetchError::network(format!("transport error: {}", error.message())))
    }
}

impl QuoteService for HttpQuoteService {
    fn ticker<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<TickerSnapshot, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/ticker?id={}",
                self.config.base_url,
                urlencoding::encode(symbol.as_str())
            );
            let response = self.get(url).await?;
            if !response.is_success() {
                return Err(error_from_response(&response, Some(symbol)));
            }
            parse_ticker_body(symbol, &response.body)
        })
    }

    fn tickers<'a>(
        &'a self,
        symbols: &'a [Symbol],
    ) -> Pin<Box<dyn Future<Output = Result<TickerBatch, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            if symbols.is_empty() {
                return Err(FetchError::invalid_request(
                    "batch request must include at least one symbol",
                ));
            }

            let joined = symbols
                .iter()
                .map(|symbol| urlencoding::encode(symbol.as_str()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            let url = format!("{}/tickers?symbols={joined}", self.config.base_url);
            let response = self.get(url).await?;
            if !response.is_success() {
                return Err(error_from_response(&response, None));
            }
            parse_batch_body(&response.body)
        })
    }

    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        range: &'a HistoryRange,
    ) -> Pin<Box<dyn Future<Output = Result<HistorySeries, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/history?id={}&range={}",
                self.config.base_url,
                urlencoding::encode(symbol.as_str()),
                urlencoding::encode(range.as_str())
            );
            let response = self.get(url).await?;
            if !response.is_success() {
                return Err(error_from_response(&response, Some(symbol)));
            }
            parse_history_body(symbol, &response.body)
        })
    }
}

/// Maps a non-2xx response to the error taxonomy.
pub fn error_from_response(response: &HttpResponse, symbol: Option<&Symbol>) -> FetchError {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|value| value.as_object().and_then(error_message));

    match (message, symbol) {
        (Some(_), Some(symbol)) if response.status == 404 => FetchError::not_found(symbol),
        (Some(message), _) => FetchError::api(message, Some(response.status)),
        (None, _) => FetchError::http_status(response.status),
    }
}

/// Parses a `/ticker` body: either the bare snapshot or `{SYMBOL: snapshot|{error}}`.
pub fn parse_ticker_body(requested: &Symbol, body: &str) -> Result<TickerSnapshot, FetchError> {
    let value = parse_json(body)?;

    if looks_like_snapshot(&value) {
        return serde_json::from_value(value)
            .map_err(|e| FetchError::parse(format!("malformed ticker payload: {e}")));
    }

    let Some(map) = value.as_object() else {
        return Err(FetchError::parse("invalid ticker response format"));
    };

    if let Some(entry) = lookup_symbol(map, requested) {
        return match classify_entry(entry) {
            BatchEntry::Snapshot(snapshot) => Ok(snapshot),
            BatchEntry::Error(message) => Err(FetchError::api(message, None)),
            BatchEntry::Malformed(reason) => Err(FetchError::parse(reason)),
        };
    }

    if let Some(message) = error_message(map) {
        return Err(FetchError::api(message, None));
    }
    if map.values().all(Value::is_object) {
        return Err(FetchError::not_found(requested));
    }
    Err(FetchError::parse("invalid ticker response format"))
}

/// Parses a `/tickers` body into per-symbol entries.
///
/// Only a body that is not JSON at all fails the whole batch; any other
/// unexpected shape yields entries (or none) and leaves the decision to the
/// reconciliation step.
pub fn parse_batch_body(body: &str) -> Result<TickerBatch, FetchError> {
    let value = parse_json(body)?;
    let mut batch = TickerBatch::default();

    if looks_like_snapshot(&value) {
        let entry = classify_entry(&value);
        if let BatchEntry::Snapshot(snapshot) = &entry {
            batch.entries.insert(snapshot.symbol().clone(), entry);
        }
        return Ok(batch);
    }

    let Some(map) = value.as_object() else {
        warn!("batch response is not an object; no symbol will be updated");
        return Ok(batch);
    };

    for (key, entry) in map {
        let symbol = match Symbol::parse(key) {
            Ok(symbol) => symbol,
            Err(error) => {
                warn!("ignoring batch entry with invalid key '{key}': {error}");
                continue;
            }
        };

        // Keys differing only in case collide; the exact-case key wins.
        let exact = key.as_str() == symbol.as_str();
        match batch.entries.entry(symbol) {
            Entry::Vacant(slot) => {
                slot.insert(classify_entry(entry));
            }
            Entry::Occupied(mut slot) if exact => {
                slot.insert(classify_entry(entry));
            }
            Entry::Occupied(slot) => {
                debug!("ignoring batch key '{key}', already answered for {}", slot.key());
            }
        }
    }

    Ok(batch)
}

/// Parses a `/history` body: `{SYMBOL: {data: [...], cachedAt}}`.
pub fn parse_history_body(requested: &Symbol, body: &str) -> Result<HistorySeries, FetchError> {
    let value = parse_json(body)?;
    let Some(map) = value.as_object() else {
        return Err(FetchError::parse("invalid history response format"));
    };

    let Some(entry) = lookup_symbol(map, requested) else {
        if let Some(message) = error_message(map) {
            return Err(FetchError::api(message, None));
        }
        return Err(FetchError::not_found(requested));
    };

    if let Some(message) = entry.as_object().and_then(error_message) {
        return Err(FetchError::api(message, None));
    }

    serde_json::from_value(entry.clone())
        .map_err(|e| FetchError::parse(format!("malformed history payload for {requested}: {e}")))
}

fn parse_json(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("response is not valid JSON: {e}")))
}

fn looks_like_snapshot(value: &Value) -> bool {
    value
        .get("company")
        .and_then(|company| company.get("symbol"))
        .is_some()
}

fn lookup_symbol<'v>(map: &'v Map<String, Value>, symbol: &Symbol) -> Option<&'v Value> {
    map.get(symbol.as_str()).or_else(|| {
        map.iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(symbol.as_str()))
            .map(|(_, value)| value)
    })
}

fn error_message(map: &Map<String, Value>) -> Option<String> {
    ["error", "message"].iter().find_map(|field| {
        map.get(*field).and_then(|value| match value {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
    })
}

fn classify_entry(value: &Value) -> BatchEntry {
    if let Some(message) = value.as_object().and_then(|map| {
        map.get("error").map(|error| match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }) {
        return BatchEntry::Error(message);
    }

    if !looks_like_snapshot(value) {
        return BatchEntry::Malformed(String::from("entry is neither a snapshot nor an error"));
    }

    match serde_json::from_value::<TickerSnapshot>(value.clone()) {
        Ok(snapshot) => BatchEntry::Snapshot(snapshot),
        Err(error) => BatchEntry::Malformed(format!("malformed snapshot: {error}")),
    }
}
