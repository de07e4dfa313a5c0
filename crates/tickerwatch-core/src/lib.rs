//! # TickerWatch Core
//!
//! Client-side data cache and staleness layer for a stock watchlist app.
//!
//! ## Overview
//!
//! - **Watchlist cache** of ticker snapshots with a 10 minute TTL, single-symbol
//!   fetches and partial-failure-tolerant batch refresh
//! - **History cache** of `(symbol, range)` price series with a 1 hour TTL
//! - **Notification feed** with read flags
//! - **Persisted state** that rehydrates asynchronously behind a gate
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache entry model and expiry policy |
//! | [`clock`] | Wall clock and a manual clock for tests |
//! | [`config`] | TTLs, quote service endpoint, state directory |
//! | [`domain`] | Symbols, ranges, snapshots, series, notifications |
//! | [`error`] | Validation, fetch and storage errors |
//! | [`finance`] | The `finance` store (watchlist + history) |
//! | [`history_cache`] | History cache manager |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`hydration`] | Rehydration gate |
//! | [`inflight`] | Coalescing of concurrent same-key fetches |
//! | [`notifications`] | The `notifications` store |
//! | [`persistence`] | Key-value substrate (memory, files) |
//! | [`quote_service`] | Remote quote service client and response parsing |
//! | [`reconcile`] | Batch refresh merge |
//! | [`store`] | Reactive persisted state container |
//! | [`ticker_cache`] | Watchlist cache manager |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickerwatch_core::{
//!     CacheConfig, ClientConfig, FileKeyValueStore, FinanceStore, HttpQuoteService,
//!     ReqwestHttpClient, StorageConfig, SystemClock,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpQuoteService::new(ClientConfig::from_env()?, Arc::new(ReqwestHttpClient::new()));
//!     let backend = FileKeyValueStore::from_config(&StorageConfig::default());
//!     let finance = FinanceStore::open(
//!         Arc::new(service),
//!         Arc::new(SystemClock),
//!         CacheConfig::default(),
//!         Arc::new(backend),
//!     );
//!
//!     finance.wait_ready().await;
//!     finance.tickers().ensure_tracked("aapl").await?;
//!     finance.history().get_history("AAPL", "1M").await?;
//!     finance.tickers().refresh_all().await?;
//!
//!     for row in finance.tickers().watchlist() {
//!         println!("{} {:?}", row.symbol(), row.market.display_price());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ TickerCacheManager   │     │ HistoryCacheManager  │
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            │  freshness check / InFlight │
//!            ▼                             ▼
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ QuoteService         │────▶│ HttpClient           │
//! │ (/ticker /tickers    │     │ (reqwest / stub)     │
//! │  /history)           │     └──────────────────────┘
//! └──────────┬───────────┘
//!            │ merge (reconcile)
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ Store<FinanceState>  │────▶│ KeyValueStore        │
//! │ watch + gate         │     │ (memory / files)     │
//! └──────────────────────┘     └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tickerwatch_core::{FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::NotFound => "no such symbol",
//!         FetchErrorKind::Network if error.retryable() => "offline, pull to retry",
//!         _ => "could not load quotes",
//!     }
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod finance;
pub mod history_cache;
pub mod http_client;
pub mod hydration;
pub mod inflight;
pub mod notifications;
pub mod persistence;
pub mod quote_service;
pub mod reconcile;
pub mod store;
pub mod ticker_cache;

// Cache entries and expiry
pub use cache::{is_expired, CachedValue, ExpiryPolicy, Fetched};

// Clocks
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration
pub use config::{CacheConfig, ClientConfig, StorageConfig};

// Domain models
pub use domain::{
    AnalystInfo, CompanyInfo, HistoryPoint, HistoryRange, HistorySeries, MarketInfo,
    MarketMetadata, NotificationKind, NotificationRecord, PerformanceInfo, Symbol,
    TickerSnapshot, UtcDateTime,
};

// Error types
pub use error::{CoreError, FetchError, FetchErrorKind, StorageError, ValidationError};

// Stores and managers
pub use finance::{FinanceState, FinanceStore};
pub use history_cache::HistoryCacheManager;
pub use notifications::{NotificationState, NotificationStore};
pub use ticker_cache::TickerCacheManager;

// Reactive state and persistence
pub use hydration::HydrationGate;
pub use persistence::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{PersistedState, Store};

// Remote quote service
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, StubHttpClient,
};
pub use quote_service::{BatchEntry, HttpQuoteService, QuoteService, TickerBatch};
